// src/handlers/assist.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{RequireRole, SendSms},
        tenancy::TenantContext,
    },
    models::assist::{AssistRequest, AssistResponse},
};

// =============================================================================
//  SMS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendSmsPayload {
    #[validate(length(min = 1, message = "Phone number is required."))]
    #[schema(example = "(555) 123-4567")]
    pub to: String,
    #[validate(length(min = 1, max = 1600, message = "Message must have between 1 and 1600 characters."))]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmsSent {
    pub success: bool,
    pub message_sid: String,
}

// POST /api/sms
#[utoipa::path(
    post,
    path = "/api/sms",
    tag = "Messaging",
    request_body = SendSmsPayload,
    responses(
        (status = 200, description = "Mensagem enviada", body = SmsSent),
        (status = 400, description = "Telefone inválido"),
        (status = 502, description = "Falha no provedor de SMS")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_sms(
    State(app_state): State<AppState>,
    locale: Locale,
    _tenant: TenantContext,
    _guard: RequireRole<SendSms>,
    Json(payload): Json<SendSmsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let message_sid = app_state
        .sms_service
        .send(&payload.to, &payload.message)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(SmsSent { success: true, message_sid })))
}

// =============================================================================
//  ASSISTENTE (LLM)
// =============================================================================

// POST /api/assist
#[utoipa::path(
    post,
    path = "/api/assist",
    tag = "Messaging",
    request_body = AssistRequest,
    responses(
        (status = 200, description = "Texto gerado", body = AssistResponse),
        (status = 429, description = "Limite de requisições do provedor"),
        (status = 502, description = "Créditos esgotados ou falha do provedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn assist(
    State(app_state): State<AppState>,
    locale: Locale,
    _tenant: TenantContext,
    Json(payload): Json<AssistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state
        .assist_service
        .assist(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}
