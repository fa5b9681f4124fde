// src/handlers/partners.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{Contracts, ManageLoads, RequireRole, ViewFleet},
        tenancy::TenantContext,
    },
    models::partners::{Broker, BrokerFields, Carrier, CarrierFields, ContractSent, SendContractPayload},
};

// =============================================================================
//  ÁREA 1: BROKERS
// =============================================================================

// POST /api/brokers
#[utoipa::path(
    post,
    path = "/api/brokers",
    tag = "Partners",
    request_body = BrokerFields,
    responses(
        (status = 201, description = "Broker cadastrado", body = Broker),
        (status = 400, description = "Nome obrigatório")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_broker(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageLoads>,
    Json(payload): Json<BrokerFields>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let broker = app_state
        .fleet_service
        .create_broker(&mut *rls_conn, &tenant, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(broker)))
}

// GET /api/brokers
#[utoipa::path(
    get,
    path = "/api/brokers",
    tag = "Partners",
    responses(
        (status = 200, description = "Brokers da empresa", body = Vec<Broker>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_brokers(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewFleet>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let brokers = app_state
        .fleet_service
        .list_brokers(&mut *rls_conn, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(brokers)))
}

// GET /api/brokers/{broker_id}
#[utoipa::path(
    get,
    path = "/api/brokers/{broker_id}",
    tag = "Partners",
    responses(
        (status = 200, description = "Detalhe do broker", body = Broker),
        (status = 404, description = "Broker não encontrado")
    ),
    params(
        ("broker_id" = Uuid, Path, description = "ID do broker")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_broker(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewFleet>,
    Path(broker_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let broker = app_state
        .fleet_service
        .get_broker(&mut *rls_conn, &tenant, broker_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(broker)))
}

// PATCH /api/brokers/{broker_id}
#[utoipa::path(
    patch,
    path = "/api/brokers/{broker_id}",
    tag = "Partners",
    request_body = BrokerFields,
    responses(
        (status = 200, description = "Broker atualizado", body = Broker),
        (status = 404, description = "Broker não encontrado")
    ),
    params(
        ("broker_id" = Uuid, Path, description = "ID do broker")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_broker(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageLoads>,
    Path(broker_id): Path<Uuid>,
    Json(payload): Json<BrokerFields>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let broker = app_state
        .fleet_service
        .update_broker(&mut *rls_conn, &tenant, broker_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(broker)))
}

// =============================================================================
//  ÁREA 2: TRANSPORTADORAS
// =============================================================================

// POST /api/carriers
#[utoipa::path(
    post,
    path = "/api/carriers",
    tag = "Partners",
    request_body = CarrierFields,
    responses(
        (status = 201, description = "Transportadora cadastrada", body = Carrier),
        (status = 400, description = "Nome obrigatório")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_carrier(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageLoads>,
    Json(payload): Json<CarrierFields>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let carrier = app_state
        .fleet_service
        .create_carrier(&mut *rls_conn, &tenant, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(carrier)))
}

// GET /api/carriers
#[utoipa::path(
    get,
    path = "/api/carriers",
    tag = "Partners",
    responses(
        (status = 200, description = "Transportadoras da empresa", body = Vec<Carrier>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_carriers(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewFleet>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let carriers = app_state
        .fleet_service
        .list_carriers(&mut *rls_conn, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(carriers)))
}

// GET /api/carriers/{carrier_id}
#[utoipa::path(
    get,
    path = "/api/carriers/{carrier_id}",
    tag = "Partners",
    responses(
        (status = 200, description = "Detalhe da transportadora", body = Carrier),
        (status = 404, description = "Transportadora não encontrada")
    ),
    params(
        ("carrier_id" = Uuid, Path, description = "ID da transportadora")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_carrier(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewFleet>,
    Path(carrier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let carrier = app_state
        .fleet_service
        .get_carrier(&mut *rls_conn, &tenant, carrier_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(carrier)))
}

// PATCH /api/carriers/{carrier_id}
#[utoipa::path(
    patch,
    path = "/api/carriers/{carrier_id}",
    tag = "Partners",
    request_body = CarrierFields,
    responses(
        (status = 200, description = "Transportadora atualizada", body = Carrier),
        (status = 404, description = "Transportadora não encontrada")
    ),
    params(
        ("carrier_id" = Uuid, Path, description = "ID da transportadora")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_carrier(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageLoads>,
    Path(carrier_id): Path<Uuid>,
    Json(payload): Json<CarrierFields>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let carrier = app_state
        .fleet_service
        .update_carrier(&mut *rls_conn, &tenant, carrier_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(carrier)))
}

// POST /api/carriers/{carrier_id}/contract
#[utoipa::path(
    post,
    path = "/api/carriers/{carrier_id}/contract",
    tag = "Partners",
    request_body = SendContractPayload,
    responses(
        (status = 200, description = "Envelope enviado para assinatura", body = ContractSent),
        (status = 409, description = "Contrato já enviado ou já assinado"),
        (status = 502, description = "Falha no serviço de assinatura")
    ),
    params(
        ("carrier_id" = Uuid, Path, description = "ID da transportadora")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Contracts>,
    Path(carrier_id): Path<Uuid>,
    Json(payload): Json<SendContractPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let sent = app_state
        .contract_service
        .send_contract(&mut *rls_conn, &tenant, carrier_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(sent)))
}
