// src/handlers/invoices.rs

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
        rbac::{RequireRole, Treasury},
        tenancy::TenantContext,
    },
    models::invoices::{CreateInvoicePayload, Invoice, PaymentLinkResponse, UpdateInvoiceStatusPayload},
};

// POST /api/invoices
#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    request_body = CreateInvoicePayload,
    responses(
        (status = 201, description = "Fatura criada como draft", body = Invoice),
        (status = 400, description = "Valor deve ser maior que zero"),
        (status = 409, description = "Número de fatura já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Treasury>,
    Json(payload): Json<CreateInvoicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let invoice = app_state
        .invoice_service
        .create(&mut *rls_conn, &tenant, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

// GET /api/invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    responses(
        (status = 200, description = "Faturas da empresa", body = Vec<Invoice>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Treasury>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let invoices = app_state
        .invoice_service
        .list(&mut *rls_conn, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(invoices)))
}

// GET /api/invoices/{invoice_id}
#[utoipa::path(
    get,
    path = "/api/invoices/{invoice_id}",
    tag = "Invoices",
    responses(
        (status = 200, description = "Detalhe da fatura", body = Invoice),
        (status = 404, description = "Fatura não encontrada")
    ),
    params(
        ("invoice_id" = Uuid, Path, description = "ID da fatura")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Treasury>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let invoice = app_state
        .invoice_service
        .get(&mut *rls_conn, &tenant, invoice_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(invoice)))
}

// PATCH /api/invoices/{invoice_id}/status
#[utoipa::path(
    patch,
    path = "/api/invoices/{invoice_id}/status",
    tag = "Invoices",
    request_body = UpdateInvoiceStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Invoice),
        (status = 404, description = "Fatura não encontrada")
    ),
    params(
        ("invoice_id" = Uuid, Path, description = "ID da fatura")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_invoice_status(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Treasury>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let invoice = app_state
        .invoice_service
        .update_status(&mut *rls_conn, &tenant, invoice_id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices/{invoice_id}/payment-link
#[utoipa::path(
    post,
    path = "/api/invoices/{invoice_id}/payment-link",
    tag = "Invoices",
    responses(
        (status = 200, description = "Link de pagamento (reaproveitado quando ainda válido)", body = PaymentLinkResponse),
        (status = 409, description = "Fatura já paga"),
        (status = 502, description = "Falha no gateway de pagamento"),
        (status = 504, description = "Gateway não respondeu a tempo")
    ),
    params(
        ("invoice_id" = Uuid, Path, description = "ID da fatura")
    ),
    security(("api_jwt" = []))
)]
pub async fn ensure_payment_link(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Treasury>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let link = app_state
        .invoice_service
        .ensure_payment_link(&mut *rls_conn, &tenant, invoice_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(link)))
}
