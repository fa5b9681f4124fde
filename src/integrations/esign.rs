// src/integrations/esign.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    common::error::AppError,
    integrations::{not_configured, status_error, transport_error},
};

const SERVICE: &str = "e-signature";

#[derive(Debug, Clone)]
pub struct EnvelopeRequest {
    pub signer_email: String,
    pub signer_name: String,
    pub carrier_name: String,
    pub company_name: String,
}

#[async_trait]
pub trait SignatureGateway: Send + Sync {
    /// Envia o contrato para assinatura e devolve o id do envelope.
    async fn send_envelope(&self, request: &EnvelopeRequest) -> Result<String, AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct EsignSettings {
    pub api_url: Option<String>,
    pub account_id: Option<String>,
    pub access_token: Option<String>,
    pub template_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateRole<'a> {
    email: &'a str,
    name: &'a str,
    role_name: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeBody<'a> {
    template_id: &'a str,
    email_subject: String,
    template_roles: Vec<TemplateRole<'a>>,
    status: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeResponse {
    envelope_id: String,
}

pub struct HttpSignatureGateway {
    client: Client,
    settings: EsignSettings,
}

impl HttpSignatureGateway {
    pub fn new(client: Client, settings: EsignSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl SignatureGateway for HttpSignatureGateway {
    async fn send_envelope(&self, request: &EnvelopeRequest) -> Result<String, AppError> {
        let (Some(api_url), Some(account_id), Some(token), Some(template_id)) = (
            self.settings.api_url.as_deref(),
            self.settings.account_id.as_deref(),
            self.settings.access_token.as_deref(),
            self.settings.template_id.as_deref(),
        ) else {
            return Err(not_configured(SERVICE));
        };

        let url = format!(
            "{}/v2.1/accounts/{}/envelopes",
            api_url.trim_end_matches('/'),
            account_id
        );
        let body = EnvelopeBody {
            template_id,
            email_subject: format!("{}: carrier agreement for {}", request.company_name, request.carrier_name),
            template_roles: vec![TemplateRole {
                email: &request.signer_email,
                name: &request.signer_name,
                role_name: "Carrier",
            }],
            status: "sent",
        };

        tracing::info!("✍️ Enviando contrato para {}", request.carrier_name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let envelope: EnvelopeResponse = response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        Ok(envelope.envelope_id)
    }
}
