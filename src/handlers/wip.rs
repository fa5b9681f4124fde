// src/handlers/wip.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{ManageTeam, RequireRole},
        tenancy::TenantContext,
    },
    models::wip::{CreateWipPayload, DecideWipPayload, WipAssignment},
};

// POST /api/wip
#[utoipa::path(
    post,
    path = "/api/wip",
    tag = "WIP",
    request_body = CreateWipPayload,
    responses(
        (status = 201, description = "Pedido de associação criado", body = WipAssignment),
        (status = 400, description = "Nenhum alvo informado"),
        (status = 404, description = "Carga, motorista ou transportadora não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_wip(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<CreateWipPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let wip = app_state
        .wip_service
        .create(&mut *rls_conn, &tenant, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(wip)))
}

// GET /api/wip
#[utoipa::path(
    get,
    path = "/api/wip",
    tag = "WIP",
    responses(
        (status = 200, description = "Admins veem a empresa; demais, os próprios pedidos", body = Vec<WipAssignment>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_wip(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let requests = app_state
        .wip_service
        .list(&mut *rls_conn, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(requests)))
}

async fn decide(
    app_state: &AppState,
    locale: &Locale,
    tenant: &TenantContext,
    wip_id: Uuid,
    approve: bool,
    payload: Option<DecideWipPayload>,
) -> Result<WipAssignment, ApiError> {
    let mut rls_conn = get_rls_connection(app_state, tenant)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    let notes = payload.and_then(|p| p.notes);
    app_state
        .wip_service
        .decide(&mut *rls_conn, tenant, wip_id, approve, notes.as_deref())
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))
}

// POST /api/wip/{wip_id}/approve
#[utoipa::path(
    post,
    path = "/api/wip/{wip_id}/approve",
    tag = "WIP",
    request_body(content = DecideWipPayload, description = "Observações opcionais (corpo pode ser omitido)"),
    responses(
        (status = 200, description = "Pedido aprovado", body = WipAssignment),
        (status = 409, description = "Pedido já decidido")
    ),
    params(
        ("wip_id" = Uuid, Path, description = "ID do pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_wip(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageTeam>,
    Path(wip_id): Path<Uuid>,
    payload: Option<Json<DecideWipPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let wip = decide(&app_state, &locale, &tenant, wip_id, true, payload.map(|Json(p)| p)).await?;
    Ok((StatusCode::OK, Json(wip)))
}

// POST /api/wip/{wip_id}/reject
#[utoipa::path(
    post,
    path = "/api/wip/{wip_id}/reject",
    tag = "WIP",
    request_body(content = DecideWipPayload, description = "Observações opcionais (corpo pode ser omitido)"),
    responses(
        (status = 200, description = "Pedido rejeitado", body = WipAssignment),
        (status = 409, description = "Pedido já decidido")
    ),
    params(
        ("wip_id" = Uuid, Path, description = "ID do pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_wip(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageTeam>,
    Path(wip_id): Path<Uuid>,
    payload: Option<Json<DecideWipPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let wip = decide(&app_state, &locale, &tenant, wip_id, false, payload.map(|Json(p)| p)).await?;
    Ok((StatusCode::OK, Json(wip)))
}
