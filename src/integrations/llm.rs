// src/integrations/llm.rs

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    common::error::AppError,
    integrations::{not_configured, status_error, transport_error},
};

const SERVICE: &str = "ai assistant";

#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct LlmSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct HttpLlmGateway {
    client: Client,
    settings: LlmSettings,
}

impl HttpLlmGateway {
    pub fn new(client: Client, settings: LlmSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl LlmGateway for HttpLlmGateway {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError> {
        let (Some(api_url), Some(api_key)) = (
            self.settings.api_url.as_deref(),
            self.settings.api_key.as_deref(),
        ) else {
            return Err(not_configured(SERVICE));
        };

        let url = format!("{}/v1/chat/completions", api_url.trim_end_matches('/'));
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(AppError::RateLimited),
            StatusCode::PAYMENT_REQUIRED => {
                return Err(AppError::ExternalService {
                    service: SERVICE,
                    message: "credits exhausted".to_string(),
                });
            }
            s if !s.is_success() => return Err(status_error(SERVICE, response).await),
            _ => {}
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| transport_error(SERVICE, e))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::ExternalService {
                service: SERVICE,
                message: "empty completion".to_string(),
            })
    }
}
