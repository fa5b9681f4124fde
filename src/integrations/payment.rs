// src/integrations/payment.rs

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    common::error::AppError,
    integrations::{status_error, transport_error},
    models::invoices::MintedLink,
};

const SERVICE: &str = "payment gateway";

/// Credenciais de uma conta no gateway (da empresa ou globais).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCredentials {
    pub account_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentLinkRequest {
    pub amount: Decimal,
    pub currency: String,
    pub merchant_order_id: String,
    pub description: String,
    pub return_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Troca as credenciais por um token de acesso de curta duração.
    async fn authenticate(&self, credentials: &PaymentCredentials) -> Result<String, AppError>;

    async fn create_payment_link(
        &self,
        access_token: &str,
        request: &PaymentLinkRequest,
    ) -> Result<MintedLink, AppError>;
}

// ---
// Implementação HTTP
// ---

#[derive(Serialize)]
struct LoginBody<'a> {
    account_id: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct PaymentLinkResponse {
    id: String,
    url: String,
}

pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn authenticate(&self, credentials: &PaymentCredentials) -> Result<String, AppError> {
        let url = format!("{}/api/v1/authentication/login", self.base_url);
        tracing::info!("💳 Autenticando no gateway de pagamento (conta {})", credentials.account_id);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &credentials.api_key)
            .json(&LoginBody { account_id: &credentials.account_id })
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let body: LoginResponse = response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        Ok(body.token)
    }

    async fn create_payment_link(
        &self,
        access_token: &str,
        request: &PaymentLinkRequest,
    ) -> Result<MintedLink, AppError> {
        let url = format!("{}/api/v1/pa/payment_links/create", self.base_url);
        tracing::info!("💳 Criando link de pagamento para {}", request.merchant_order_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let body: PaymentLinkResponse = response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        Ok(MintedLink { id: body.id, url: body.url })
    }
}
