// src/integrations/sms.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    common::error::AppError,
    integrations::{not_configured, status_error, transport_error},
};

const SERVICE: &str = "sms";
const API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// `to` já normalizado (E.164). Devolve o id da mensagem.
    async fn send_message(&self, to: &str, body: &str) -> Result<String, AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct SmsSettings {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: String,
}

pub struct HttpSmsGateway {
    client: Client,
    settings: SmsSettings,
}

impl HttpSmsGateway {
    pub fn new(client: Client, settings: SmsSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send_message(&self, to: &str, body: &str) -> Result<String, AppError> {
        let (Some(sid), Some(token), Some(from)) = (
            self.settings.account_sid.as_deref(),
            self.settings.auth_token.as_deref(),
            self.settings.from_number.as_deref(),
        ) else {
            return Err(not_configured(SERVICE));
        };

        let url = format!("{}/Accounts/{}/Messages.json", API_BASE, sid);
        let response = self
            .client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let message: MessageResponse = response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        tracing::info!("📱 SMS enviado para {} (sid {})", to, message.sid);
        Ok(message.sid)
    }
}
