// src/services/sms_service.rs

use std::sync::Arc;

use crate::{common::error::AppError, integrations::sms::SmsGateway};

#[derive(Clone)]
pub struct SmsService {
    gateway: Arc<dyn SmsGateway>,
}

/// Normaliza para E.164: remove espaços, hífens e parênteses; sem `+`,
/// assume o código de país +1.
pub fn normalize_phone(raw: &str) -> Result<String, AppError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();

    if cleaned.chars().count() < 10 {
        return Err(AppError::invalid_field("to", "Invalid phone number."));
    }

    if cleaned.starts_with('+') {
        Ok(cleaned)
    } else {
        Ok(format!("+1{}", cleaned))
    }
}

impl SmsService {
    pub fn new(gateway: Arc<dyn SmsGateway>) -> Self {
        Self { gateway }
    }

    pub async fn send(&self, to: &str, message: &str) -> Result<String, AppError> {
        let phone = normalize_phone(to)?;
        let sid = self.gateway.send_message(&phone, message).await?;
        tracing::info!("📱 SMS enviado para {} ({})", phone, sid);
        Ok(sid)
    }

    /// Envio acessório (convites): falha vira `false` e um aviso no log.
    pub async fn send_best_effort(&self, to: &str, message: &str) -> bool {
        match self.send(to, message).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("⚠️ SMS para {} não enviado: {}", to, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn strips_formatting_and_prefixes_country_code() {
        assert_eq!(normalize_phone("(555) 123-4567").unwrap(), "+15551234567");
    }

    #[test]
    fn keeps_explicit_international_prefix() {
        assert_eq!(normalize_phone("+44 20 7946 0958").unwrap(), "+442079460958");
    }

    #[test]
    fn short_numbers_are_rejected() {
        assert!(matches!(normalize_phone("555-1234"), Err(AppError::ValidationError(_))));
        assert!(matches!(normalize_phone(""), Err(AppError::ValidationError(_))));
    }

    struct RecordingGateway {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl SmsGateway for RecordingGateway {
        async fn send_message(&self, to: &str, _body: &str) -> Result<String, AppError> {
            if self.fail {
                return Err(AppError::ExternalService { service: "sms", message: "down".into() });
            }
            self.sent.lock().unwrap().push(to.to_string());
            Ok("SM123".into())
        }
    }

    #[tokio::test]
    async fn gateway_receives_the_normalized_number() {
        let gateway = Arc::new(RecordingGateway { sent: Mutex::new(vec![]), fail: false });
        let svc = SmsService::new(gateway.clone());

        assert_eq!(svc.send("555 123 4567", "hi").await.unwrap(), "SM123");
        assert_eq!(gateway.sent.lock().unwrap().as_slice(), ["+15551234567"]);
    }

    #[tokio::test]
    async fn invalid_number_never_reaches_the_gateway() {
        let gateway = Arc::new(RecordingGateway { sent: Mutex::new(vec![]), fail: false });
        let svc = SmsService::new(gateway.clone());

        assert!(svc.send("123", "hi").await.is_err());
        assert!(gateway.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn best_effort_swallows_gateway_failures() {
        let svc = SmsService::new(Arc::new(RecordingGateway { sent: Mutex::new(vec![]), fail: true }));
        assert!(!svc.send_best_effort("5551234567", "hi").await);
    }
}
