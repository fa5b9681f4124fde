// src/integrations.rs

// Clientes dos serviços externos. Cada um fica atrás de um trait para que os
// serviços possam ser testados com implementações falsas.

pub mod esign;
pub mod llm;
pub mod payment;
pub mod signature;
pub mod sms;

use crate::common::error::AppError;

/// Erro de transporte (timeout, DNS, TLS) -> erro de domínio.
pub(crate) fn transport_error(service: &'static str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        tracing::error!("⏱️ {} não respondeu a tempo: {}", service, e);
        AppError::ExternalTimeout(service)
    } else {
        tracing::error!("🔥 Falha de rede ao chamar {}: {}", service, e);
        AppError::ExternalService {
            service,
            message: "connection failed".to_string(),
        }
    }
}

/// Resposta não-2xx -> erro de domínio. O corpo vai só para o log.
pub(crate) async fn status_error(service: &'static str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!("🔥 {} respondeu {}: {}", service, status, body);
    AppError::ExternalService {
        service,
        message: format!("upstream returned {}", status.as_u16()),
    }
}

pub(crate) fn not_configured(service: &'static str) -> AppError {
    AppError::ExternalService {
        service,
        message: "credentials not configured".to_string(),
    }
}
