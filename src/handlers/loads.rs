// src/handlers/loads.rs

use axum::{
    extract::{Path, Query, State},
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
        rbac::{ManageLoads, RequireRole, ViewLoads},
        tenancy::TenantContext,
    },
    models::loads::{Load, LoadFields, LoadFilters, TransitionRequest},
};

// POST /api/loads
#[utoipa::path(
    post,
    path = "/api/loads",
    tag = "Loads",
    request_body = LoadFields,
    responses(
        (status = 201, description = "Carga criada com status pending", body = Load),
        (status = 400, description = "Campos obrigatórios ausentes ou números inválidos"),
        (status = 404, description = "Motorista, broker, agente ou transportadora não encontrado"),
        (status = 409, description = "Número de carga já usado")
    ),
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "Empresa (apenas super-admin)")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_load(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageLoads>,
    Json(payload): Json<LoadFields>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let load = app_state
        .load_service
        .create(&mut *rls_conn, &tenant, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(load)))
}

// GET /api/loads
#[utoipa::path(
    get,
    path = "/api/loads",
    tag = "Loads",
    params(LoadFilters),
    responses(
        (status = 200, description = "Cargas visíveis ao papel atual", body = Vec<Load>),
        (status = 403, description = "Papel sem acesso a cargas")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_loads(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewLoads>,
    Query(filters): Query<LoadFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let loads = app_state
        .load_service
        .list(&mut *rls_conn, &tenant, &filters)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(loads)))
}

// GET /api/loads/{load_id}
#[utoipa::path(
    get,
    path = "/api/loads/{load_id}",
    tag = "Loads",
    responses(
        (status = 200, description = "Detalhe da carga", body = Load),
        (status = 404, description = "Carga não encontrada")
    ),
    params(
        ("load_id" = Uuid, Path, description = "ID da carga")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_load(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewLoads>,
    Path(load_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let load = app_state
        .load_service
        .get(&mut *rls_conn, &tenant, load_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(load)))
}

// PATCH /api/loads/{load_id}
#[utoipa::path(
    patch,
    path = "/api/loads/{load_id}",
    tag = "Loads",
    request_body = LoadFields,
    responses(
        (status = 200, description = "Carga atualizada (status inalterado)", body = Load),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Carga ou vínculo não encontrado")
    ),
    params(
        ("load_id" = Uuid, Path, description = "ID da carga")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_load(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageLoads>,
    Path(load_id): Path<Uuid>,
    Json(payload): Json<LoadFields>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let load = app_state
        .load_service
        .update(&mut *rls_conn, &tenant, load_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(load)))
}

// =============================================================================
//  TRANSIÇÕES DE STATUS
// =============================================================================

// POST /api/loads/{load_id}/status
#[utoipa::path(
    post,
    path = "/api/loads/{load_id}/status",
    tag = "Loads",
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status alterado", body = Load),
        (status = 403, description = "Papel sem permissão ou carga de outro motorista"),
        (status = 409, description = "A carga mudou durante a operação"),
        (status = 422, description = "Transição inválida; details.allowed lista as válidas")
    ),
    params(
        ("load_id" = Uuid, Path, description = "ID da carga")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_load(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(load_id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let load = app_state
        .load_service
        .transition(&mut *rls_conn, &tenant, load_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(load)))
}

// POST /api/loads/{load_id}/accept
#[utoipa::path(
    post,
    path = "/api/loads/{load_id}/accept",
    tag = "Loads",
    responses(
        (status = 200, description = "Carga aceita pelo motorista (pending -> assigned)", body = Load),
        (status = 422, description = "Carga não está pending")
    ),
    params(
        ("load_id" = Uuid, Path, description = "ID da carga")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_load(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(load_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let load = app_state
        .load_service
        .accept(&mut *rls_conn, &tenant, load_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(load)))
}

// POST /api/loads/{load_id}/reject
#[utoipa::path(
    post,
    path = "/api/loads/{load_id}/reject",
    tag = "Loads",
    responses(
        (status = 200, description = "Carga devolvida (assigned -> pending)", body = Load),
        (status = 422, description = "Carga não está assigned")
    ),
    params(
        ("load_id" = Uuid, Path, description = "ID da carga")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_load(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(load_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let load = app_state
        .load_service
        .reject(&mut *rls_conn, &tenant, load_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(load)))
}
