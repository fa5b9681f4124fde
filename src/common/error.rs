// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::loads::LoadStatus;

// Erros de domínio e de infraestrutura. Os handlers convertem para ApiError
// (com a mensagem traduzida) via `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Acesso não autorizado ao recurso")]
    Unauthorized,

    #[error("Papel sem permissão para esta ação")]
    Forbidden,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Usuário sem empresa ou papel atribuído")]
    NotProvisioned,

    #[error("Operação exige uma empresa específica")]
    TenantRequired,

    #[error("Recurso não encontrado: {0}")]
    NotFound(String),

    #[error("Transição inválida: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LoadStatus,
        to: LoadStatus,
        allowed: Vec<LoadStatus>,
    },

    #[error("Registro alterado concorrentemente")]
    ConcurrentModification,

    #[error("Fatura já paga")]
    AlreadyPaid,

    #[error("Contrato já assinado")]
    AlreadySigned,

    #[error("Contrato já enviado")]
    AlreadySent,

    #[error("Usuário já é membro")]
    AlreadyMember,

    #[error("Solicitação já decidida")]
    AlreadyDecided,

    #[error("Falha no serviço externo {service}: {message}")]
    ExternalService { service: &'static str, message: String },

    #[error("Tempo esgotado no serviço externo {0}")]
    ExternalTimeout(&'static str),

    #[error("Limite de requisições excedido")]
    RateLimited,

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Assinatura de webhook inválida")]
    InvalidSignature,

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Erro de validação de um único campo, para regras que o `validator` não expressa.
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = validator::ValidationErrors::new();
        let message: String = message.into();
        let mut error = validator::ValidationError::new("invalid");
        error.message = Some(message.into());
        errors.add(field, error);
        AppError::ValidationError(errors)
    }

    /// Converte o erro de violação de unicidade do Postgres numa mensagem legível.
    pub fn from_unique(e: sqlx::Error, detail: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::UniqueConstraintViolation(detail.to_string());
            }
        }
        e.into()
    }

    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let t = |code: &str, args: &[(&str, &str)]| i18n.translate(lang, code, args);

        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                ApiError::with_details(
                    StatusCode::BAD_REQUEST,
                    t("validation_failed", &[]),
                    Value::Object(details),
                )
            }
            AppError::Unauthorized => ApiError::new(StatusCode::FORBIDDEN, t("unauthorized", &[])),
            AppError::Forbidden => ApiError::new(StatusCode::FORBIDDEN, t("forbidden", &[])),
            AppError::InvalidToken => ApiError::new(StatusCode::UNAUTHORIZED, t("invalid_token", &[])),
            AppError::InvalidCredentials => {
                ApiError::new(StatusCode::UNAUTHORIZED, t("invalid_credentials", &[]))
            }
            AppError::EmailAlreadyExists => ApiError::new(StatusCode::CONFLICT, t("email_exists", &[])),
            AppError::NotProvisioned => ApiError::with_details(
                StatusCode::CONFLICT,
                t("not_provisioned", &[]),
                json!({ "redirect": "/onboarding" }),
            ),
            AppError::TenantRequired => ApiError::new(StatusCode::BAD_REQUEST, t("tenant_required", &[])),
            AppError::NotFound(resource) => {
                ApiError::new(StatusCode::NOT_FOUND, t("not_found", &[("resource", resource.as_str())]))
            }
            AppError::InvalidTransition { from, to, allowed } => ApiError::with_details(
                StatusCode::UNPROCESSABLE_ENTITY,
                t("invalid_transition", &[("from", from.as_str()), ("to", to.as_str())]),
                json!({
                    "from": from,
                    "to": to,
                    "allowed": allowed,
                }),
            ),
            AppError::ConcurrentModification => {
                ApiError::new(StatusCode::CONFLICT, t("concurrent_modification", &[]))
            }
            AppError::AlreadyPaid => ApiError::new(StatusCode::CONFLICT, t("already_paid", &[])),
            AppError::AlreadySigned => ApiError::new(StatusCode::CONFLICT, t("already_signed", &[])),
            AppError::AlreadySent => ApiError::new(StatusCode::CONFLICT, t("already_sent", &[])),
            AppError::AlreadyMember => ApiError::new(StatusCode::CONFLICT, t("already_member", &[])),
            AppError::AlreadyDecided => ApiError::new(StatusCode::CONFLICT, t("already_decided", &[])),
            AppError::ExternalService { service, message } => {
                // O detalhe fica no log; o cliente recebe só o nome do serviço
                tracing::error!("Serviço externo {} falhou: {}", service, message);
                ApiError::new(StatusCode::BAD_GATEWAY, t("external_service", &[("service", service)]))
            }
            AppError::ExternalTimeout(service) => ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                t("external_timeout", &[("service", service)]),
            ),
            AppError::RateLimited => ApiError::new(StatusCode::TOO_MANY_REQUESTS, t("rate_limited", &[])),
            AppError::UniqueConstraintViolation(detail) => {
                ApiError::new(StatusCode::CONFLICT, t("unique_violation", &[("detail", detail.as_str())]))
            }
            AppError::InvalidSignature => {
                ApiError::new(StatusCode::UNAUTHORIZED, t("invalid_signature", &[]))
            }

            // Banco, anyhow, bcrypt, JWT: loga o detalhe e devolve mensagem genérica.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, t("internal", &[]))
            }
        }
    }
}

// Resposta de erro já traduzida, pronta para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }

    pub fn with_details(status: StatusCode, error: impl Into<String>, details: Value) -> Self {
        Self { status, error: error.into(), details: Some(details) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(err: AppError) -> ApiError {
        let store = I18nStore::load().unwrap();
        err.to_api_error(&Locale("en".to_string()), &store)
    }

    #[test]
    fn not_provisioned_carries_onboarding_redirect() {
        let api = render(AppError::NotProvisioned);
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.details.unwrap()["redirect"], "/onboarding");
    }

    #[test]
    fn invalid_transition_lists_allowed_statuses() {
        let api = render(AppError::InvalidTransition {
            from: LoadStatus::Picked,
            to: LoadStatus::Delivered,
            allowed: vec![LoadStatus::InTransit, LoadStatus::Cancelled],
        });
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.details.unwrap()["allowed"], json!(["in_transit", "cancelled"]));
    }

    #[test]
    fn informational_guards_are_conflicts() {
        for err in [AppError::AlreadyPaid, AppError::AlreadySigned, AppError::AlreadySent] {
            assert_eq!(render(err).status, StatusCode::CONFLICT);
        }
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let api = render(AppError::InternalServerError(anyhow::anyhow!("pool exhausted on db-7")));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("db-7"));
    }

    #[test]
    fn external_failures_hide_the_collaborator_message() {
        let api = render(AppError::ExternalService {
            service: "payment gateway",
            message: "upstream returned 500: acct_8812 locked".to_string(),
        });
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert!(api.error.contains("payment gateway"));
        assert!(!api.error.contains("acct_8812"));
        assert!(!api.error.contains("500"));
    }

    #[test]
    fn single_field_errors_render_under_their_field() {
        let api = render(AppError::invalid_field("rate", "Rate must be a number."));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details.unwrap()["rate"][0], "Rate must be a number.");
    }

    #[test]
    fn validation_errors_are_grouped_by_field() {
        let mut errors = validator::ValidationErrors::new();
        let mut e = validator::ValidationError::new("range");
        e.message = Some("Latitude must be between -90 and 90".into());
        errors.add("latitude", e);

        let api = render(AppError::ValidationError(errors));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            api.details.unwrap()["latitude"][0],
            "Latitude must be between -90 and 90"
        );
    }
}
