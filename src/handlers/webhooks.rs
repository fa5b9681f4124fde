// src/handlers/webhooks.rs

// Rotas públicas: a autenticação é a assinatura HMAC do corpo bruto.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;

use crate::{
    common::{
        db_utils::get_service_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    integrations::signature::{verify_esign_signature, verify_payment_signature},
    middleware::i18n::Locale,
    models::webhooks::{EsignEvent, PaymentEvent, WebhookAck},
    services::webhook_service::WebhookOutcome,
};

const PAYMENT_TIMESTAMP_HEADER: &str = "x-timestamp";
const PAYMENT_SIGNATURE_HEADER: &str = "x-signature";
const ESIGN_SIGNATURE_HEADER: &str = "x-esign-signature";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_event<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::invalid_field("body", format!("Malformed event: {}", e)))
}

fn ack(outcome: WebhookOutcome) -> WebhookAck {
    WebhookAck {
        received: true,
        already_applied: outcome.already_applied(),
        invoice_id: outcome.invoice_id,
        carrier_id: outcome.carrier_id,
    }
}

// POST /api/webhooks/payments
#[utoipa::path(
    post,
    path = "/api/webhooks/payments",
    tag = "Webhooks",
    request_body = PaymentEvent,
    responses(
        (status = 200, description = "Evento processado (reentregas retornam alreadyApplied)", body = WebhookAck),
        (status = 401, description = "Assinatura inválida"),
        (status = 404, description = "Fatura não encontrada")
    )
)]
pub async fn payment_webhook(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    verify_payment_signature(
        app_state.payment_webhook_secret.as_deref(),
        header(&headers, PAYMENT_TIMESTAMP_HEADER),
        header(&headers, PAYMENT_SIGNATURE_HEADER),
        &body,
    )
    .map_err(|e| {
        tracing::warn!("🚫 Webhook de pagamento com assinatura inválida");
        to_api(e)
    })?;

    let event: PaymentEvent = parse_event(&body).map_err(to_api)?;
    tracing::info!("📨 Webhook de pagamento: {}", event.kind());

    let mut conn = get_service_connection(&app_state.db_pool).await.map_err(to_api)?;
    let outcome = app_state
        .webhook_service
        .handle_payment_event(&mut *conn, &event)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(ack(outcome))))
}

// POST /api/webhooks/esign
#[utoipa::path(
    post,
    path = "/api/webhooks/esign",
    tag = "Webhooks",
    request_body = EsignEvent,
    responses(
        (status = 200, description = "Evento processado (reentregas retornam alreadyApplied)", body = WebhookAck),
        (status = 401, description = "Assinatura inválida"),
        (status = 404, description = "Envelope desconhecido")
    )
)]
pub async fn esign_webhook(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    verify_esign_signature(
        app_state.esign_webhook_secret.as_deref(),
        header(&headers, ESIGN_SIGNATURE_HEADER),
        &body,
    )
    .map_err(|e| {
        tracing::warn!("🚫 Webhook de assinatura eletrônica com assinatura inválida");
        to_api(e)
    })?;

    let event: EsignEvent = parse_event(&body).map_err(to_api)?;
    tracing::info!("📨 Webhook de assinatura: {:?}", event.event);

    let mut conn = get_service_connection(&app_state.db_pool).await.map_err(to_api)?;
    let outcome = app_state
        .webhook_service
        .handle_esign_event(&mut *conn, &event)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(ack(outcome))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_body_is_a_validation_error() {
        let err = parse_event::<PaymentEvent>(b"{not json").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn unknown_event_types_still_parse() {
        let event: PaymentEvent = parse_event(br#"{"event_type":"refund.created","data":{}}"#).unwrap();
        assert_eq!(event.kind(), "refund.created");
    }
}
