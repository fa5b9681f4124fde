// src/handlers/documents.rs

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
        rbac::{RequireRole, ViewLoads},
        tenancy::TenantContext,
    },
    models::documents::{AttachDocumentPayload, Document},
};

// POST /api/loads/{load_id}/documents
#[utoipa::path(
    post,
    path = "/api/loads/{load_id}/documents",
    tag = "Documents",
    request_body = AttachDocumentPayload,
    responses(
        (status = 201, description = "Documento anexado à carga", body = Document),
        (status = 404, description = "Carga não encontrada")
    ),
    params(
        ("load_id" = Uuid, Path, description = "ID da carga")
    ),
    security(("api_jwt" = []))
)]
pub async fn attach_document(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewLoads>,
    Path(load_id): Path<Uuid>,
    Json(payload): Json<AttachDocumentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let document = app_state
        .load_service
        .attach_document(&mut *rls_conn, &tenant, load_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(document)))
}

// GET /api/loads/{load_id}/documents
#[utoipa::path(
    get,
    path = "/api/loads/{load_id}/documents",
    tag = "Documents",
    responses(
        (status = 200, description = "Documentos da carga", body = Vec<Document>)
    ),
    params(
        ("load_id" = Uuid, Path, description = "ID da carga")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<ViewLoads>,
    Path(load_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let documents = app_state
        .load_service
        .list_documents(&mut *rls_conn, &tenant, load_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(documents)))
}
