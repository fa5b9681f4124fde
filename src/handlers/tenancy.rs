// src/handlers/tenancy.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{InviteDrivers, ManageCompany, ManageTeam, RequireRole},
        tenancy::TenantContext,
    },
    models::tenancy::{
        AppRole, Company, CompanyOverview, CompanySettings, CompanySettingsPatch, InviteResult, NewCompany, NewInvite,
        TeamMember,
    },
};

// =============================================================================
//  ÁREA 1: ONBOARDING
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(length(min = 1, message = "Company name is required."))]
    #[schema(example = "Acme Freight LLC")]
    pub name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// POST /api/companies
#[utoipa::path(
    post,
    path = "/api/companies",
    tag = "Tenancy",
    request_body = CreateCompanyPayload,
    responses(
        (status = 201, description = "Empresa criada; o chamador vira admin", body = Company),
        (status = 409, description = "Usuário já pertence a uma empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_company(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCompanyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewCompany {
        name: payload.name.trim().to_string(),
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
        first_name: payload.first_name,
        last_name: payload.last_name,
    };

    let company = app_state
        .tenant_service
        .create_company_with_owner(user.0.id, &input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(company)))
}

// Texto em branco limpa a credencial; campo ausente fica como está
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettingsPayload {
    #[validate(length(max = 255, message = "Payment account id is too long."))]
    #[schema(example = "acct_1a2b3c")]
    pub payment_account_id: Option<String>,
    #[validate(length(max = 512, message = "Payment API key is too long."))]
    pub payment_api_key: Option<String>,
    pub esign_enabled: Option<bool>,
}

impl From<CompanySettingsPayload> for CompanySettingsPatch {
    fn from(payload: CompanySettingsPayload) -> Self {
        Self {
            payment_account_id: CompanySettingsPatch::credential(payload.payment_account_id),
            payment_api_key: CompanySettingsPatch::credential(payload.payment_api_key),
            esign_enabled: payload.esign_enabled,
        }
    }
}

// PATCH /api/company/settings
#[utoipa::path(
    patch,
    path = "/api/company/settings",
    tag = "Tenancy",
    request_body = CompanySettingsPayload,
    responses(
        (status = 200, description = "Configurações atualizadas", body = CompanySettings),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas admins")
    ),
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "Empresa (apenas super-admin)")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_company_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageCompany>,
    Json(payload): Json<CompanySettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;
    let tenant_id = tenant.tenant_id().map_err(to_api)?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant).await.map_err(to_api)?;

    let settings = app_state
        .tenant_service
        .update_company_settings(&mut *rls_conn, tenant_id, &CompanySettingsPatch::from(payload))
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(settings)))
}

// =============================================================================
//  ÁREA 2: EQUIPE E CONVITES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteTeamPayload {
    #[validate(email(message = "Invalid email address."))]
    #[schema(example = "dispatch@acmefreight.com")]
    pub email: String,
    #[schema(example = "dispatcher")]
    pub role: AppRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

// POST /api/team/invite
#[utoipa::path(
    post,
    path = "/api/team/invite",
    tag = "Tenancy",
    request_body = InviteTeamPayload,
    responses(
        (status = 201, description = "Convite criado", body = InviteResult),
        (status = 403, description = "Apenas admins"),
        (status = 409, description = "Email já é membro")
    ),
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "Empresa (apenas super-admin)")
    ),
    security(("api_jwt" = []))
)]
pub async fn invite_team_member(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageTeam>,
    Json(payload): Json<InviteTeamPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tenant_id = tenant
        .tenant_id()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let invite = NewInvite {
        email: payload.email.trim().to_lowercase(),
        role: payload.role,
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone: payload.phone,
    };

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .tenant_service
        .invite_team_member(&mut *rls_conn, tenant_id, &invite)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(result)))
}

// GET /api/team
#[utoipa::path(
    get,
    path = "/api/team",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Membros da equipe", body = Vec<TeamMember>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_team(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageTeam>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = tenant
        .tenant_id()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let members = app_state
        .tenant_service
        .list_team(tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(members)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteDriverPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: String,
    pub phone: Option<String>,
    pub carrier_id: Option<Uuid>,
}

// POST /api/drivers/invite
#[utoipa::path(
    post,
    path = "/api/drivers/invite",
    tag = "Fleet",
    request_body = InviteDriverPayload,
    responses(
        (status = 201, description = "Motorista convidado", body = InviteResult),
        (status = 404, description = "Transportadora não encontrada"),
        (status = 409, description = "Email já é membro")
    ),
    security(("api_jwt" = []))
)]
pub async fn invite_driver(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<InviteDrivers>,
    Json(payload): Json<InviteDriverPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;
    let tenant_id = tenant.tenant_id().map_err(to_api)?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant).await.map_err(to_api)?;

    // Transportadora de outra empresa não é aceita
    if let Some(carrier_id) = payload.carrier_id {
        app_state
            .fleet_service
            .get_carrier(&mut *rls_conn, &tenant, carrier_id)
            .await
            .map_err(to_api)?;
    }

    let invite = NewInvite {
        email: payload.email.trim().to_lowercase(),
        role: AppRole::Driver,
        first_name: Some(payload.first_name),
        last_name: Some(payload.last_name),
        phone: payload.phone,
    };

    let result = app_state
        .tenant_service
        .invite_driver(&mut *rls_conn, tenant_id, &invite, payload.carrier_id)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(result)))
}

// =============================================================================
//  ÁREA 3: MASTER ADMIN
// =============================================================================

// GET /api/admin/companies
#[utoipa::path(
    get,
    path = "/api/admin/companies",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Empresas com contagens e receita paga", body = Vec<CompanyOverview>),
        (status = 403, description = "Apenas super-admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_companies(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    if !tenant.is_super_admin {
        return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
    }

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let companies = app_state
        .tenant_service
        .list_company_overviews(&mut *rls_conn)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(companies)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_payload_keeps_absent_fields_and_clears_blank_ones() {
        let payload: CompanySettingsPayload =
            serde_json::from_value(serde_json::json!({ "paymentApiKey": "", "esignEnabled": true })).unwrap();
        assert!(payload.validate().is_ok());

        let patch = CompanySettingsPatch::from(payload);
        assert_eq!(patch.payment_account_id, None);
        assert_eq!(patch.payment_api_key, Some(None));
        assert_eq!(patch.esign_enabled, Some(true));
    }

    #[test]
    fn oversized_account_id_is_rejected() {
        let payload = CompanySettingsPayload {
            payment_account_id: Some("a".repeat(300)),
            payment_api_key: None,
            esign_enabled: None,
        };
        assert!(payload.validate().is_err());
    }
}
