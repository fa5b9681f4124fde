// src/handlers/fleet.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
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
        rbac::{ManageFleet, RequireRole, ViewFleet},
        tenancy::TenantContext,
    },
    models::fleet::{Driver, DriverFields, DriverPosition, LocationAccepted, LocationReport, LocationSample},
};

// =============================================================================
//  ÁREA 1: CADASTRO DE MOTORISTAS
// =============================================================================

// POST /api/drivers
#[utoipa::path(
    post,
    path = "/api/drivers",
    tag = "Fleet",
    request_body = DriverFields,
    responses(
        (status = 201, description = "Motorista cadastrado", body = Driver),
        (status = 404, description = "Transportadora não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_driver(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageFleet>,
    Json(payload): Json<DriverFields>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let driver = app_state
        .fleet_service
        .create_driver(&mut *rls_conn, &tenant, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(driver)))
}

// GET /api/drivers
#[utoipa::path(
    get,
    path = "/api/drivers",
    tag = "Fleet",
    responses(
        (status = 200, description = "Motoristas da empresa", body = Vec<Driver>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_drivers(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewFleet>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let drivers = app_state
        .fleet_service
        .list_drivers(&mut *rls_conn, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(drivers)))
}

// GET /api/drivers/{driver_id}
#[utoipa::path(
    get,
    path = "/api/drivers/{driver_id}",
    tag = "Fleet",
    responses(
        (status = 200, description = "Detalhe do motorista", body = Driver),
        (status = 404, description = "Motorista não encontrado")
    ),
    params(
        ("driver_id" = Uuid, Path, description = "ID do motorista")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_driver(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewFleet>,
    Path(driver_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let driver = app_state
        .fleet_service
        .get_driver(&mut *rls_conn, &tenant, driver_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(driver)))
}

// PATCH /api/drivers/{driver_id}
#[utoipa::path(
    patch,
    path = "/api/drivers/{driver_id}",
    tag = "Fleet",
    request_body = DriverFields,
    responses(
        (status = 200, description = "Motorista atualizado", body = Driver),
        (status = 404, description = "Motorista ou transportadora não encontrado")
    ),
    params(
        ("driver_id" = Uuid, Path, description = "ID do motorista")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_driver(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ManageFleet>,
    Path(driver_id): Path<Uuid>,
    Json(payload): Json<DriverFields>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let driver = app_state
        .fleet_service
        .update_driver(&mut *rls_conn, &tenant, driver_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(driver)))
}

// =============================================================================
//  ÁREA 2: LOCALIZAÇÃO
// =============================================================================

// POST /api/drivers/location
#[utoipa::path(
    post,
    path = "/api/drivers/location",
    tag = "Location",
    request_body = LocationReport,
    responses(
        (status = 200, description = "Posição gravada (atual + histórico)", body = LocationAccepted),
        (status = 400, description = "Coordenadas fora do intervalo"),
        (status = 403, description = "Motorista não pertence ao usuário"),
        (status = 404, description = "Motorista ou carga não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn report_location(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<LocationReport>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let accepted = app_state
        .location_service
        .ingest(&mut *rls_conn, &tenant, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(accepted)))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Padrão 100, máximo 1000
    pub limit: Option<i64>,
}

// GET /api/drivers/{driver_id}/locations
#[utoipa::path(
    get,
    path = "/api/drivers/{driver_id}/locations",
    tag = "Location",
    responses(
        (status = 200, description = "Histórico, mais recente primeiro", body = Vec<LocationSample>),
        (status = 404, description = "Motorista não encontrado")
    ),
    params(
        ("driver_id" = Uuid, Path, description = "ID do motorista"),
        HistoryQuery
    ),
    security(("api_jwt" = []))
)]
pub async fn location_history(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(driver_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let samples = app_state
        .location_service
        .history(&mut *rls_conn, &tenant, driver_id, query.limit)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(samples)))
}

// GET /api/drivers/positions
#[utoipa::path(
    get,
    path = "/api/drivers/positions",
    tag = "Location",
    responses(
        (status = 200, description = "Posição atual e frescor do GPS de cada motorista", body = Vec<DriverPosition>)
    ),
    security(("api_jwt" = []))
)]
pub async fn driver_positions(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewFleet>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let positions = app_state
        .location_service
        .positions(&mut *rls_conn, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(positions)))
}
