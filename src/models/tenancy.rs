// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. AppRole (conjunto fechado de papéis)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "app_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    Admin,
    Dispatcher,
    Driver,
    Carrier,
    Broker,
    Sales,
    Treasury,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
            AppRole::Dispatcher => "dispatcher",
            AppRole::Driver => "driver",
            AppRole::Carrier => "carrier",
            AppRole::Broker => "broker",
            AppRole::Sales => "sales",
            AppRole::Treasury => "treasury",
        }
    }

    /// Papel desconhecido vira `None` (o chamador cai no menu padrão).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(AppRole::Admin),
            "dispatcher" => Some(AppRole::Dispatcher),
            "driver" => Some(AppRole::Driver),
            "carrier" => Some(AppRole::Carrier),
            "broker" => Some(AppRole::Broker),
            "sales" => Some(AppRole::Sales),
            "treasury" => Some(AppRole::Treasury),
            _ => None,
        }
    }
}

// ---
// 2. Company (o Tenant)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    #[schema(example = "Acme Freight LLC")]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    // Credenciais próprias do gateway de pagamento (nunca serializadas)
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub payment_account_id: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub payment_api_key: Option<String>,

    pub esign_enabled: bool,
    pub subscription_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 3. Profile (o Principal dentro da plataforma)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub is_super_admin: bool,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: AppRole,
    pub created_at: DateTime<Utc>,
}

// Membro da equipe (join de users + profiles + user_roles)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: AppRole,
    pub invite_pending: bool,
    pub joined_at: DateTime<Utc>,
}

// Visão do super-admin sobre cada empresa
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOverview {
    pub id: Uuid,
    pub name: String,
    pub subscription_status: String,
    pub member_count: i64,
    pub load_count: i64,
    pub paid_revenue: Decimal,
    pub created_at: DateTime<Utc>,
}

// Resultado de um convite (equipe ou motorista)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteResult {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
    pub invite_url: String,
    pub invite_sent: bool,
}

// Dados de entrada já validados pelo handler
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Alteração parcial das configurações da empresa.
/// `None` mantém o valor atual; `Some(None)` limpa a coluna.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanySettingsPatch {
    pub payment_account_id: Option<Option<String>>,
    pub payment_api_key: Option<Option<String>>,
    pub esign_enabled: Option<bool>,
}

impl CompanySettingsPatch {
    /// Texto em branco limpa a credencial; o resto é aparado.
    pub fn credential(value: Option<String>) -> Option<Option<String>> {
        value.map(|v| {
            let trimmed = v.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
    }
}

// A chave da API nunca volta para o cliente, só se está configurada
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettings {
    pub company_id: Uuid,
    #[schema(example = "acct_1a2b3c")]
    pub payment_account_id: Option<String>,
    pub payment_api_key_configured: bool,
    pub esign_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&Company> for CompanySettings {
    fn from(company: &Company) -> Self {
        Self {
            company_id: company.id,
            payment_account_id: company.payment_account_id.clone(),
            payment_api_key_configured: company.payment_api_key.is_some(),
            esign_enabled: company.esign_enabled,
            updated_at: company.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewInvite {
    pub email: String,
    pub role: AppRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles_case_insensitively() {
        assert_eq!(AppRole::parse("Dispatcher"), Some(AppRole::Dispatcher));
        assert_eq!(AppRole::parse(" treasury "), Some(AppRole::Treasury));
    }

    #[test]
    fn unknown_role_is_none() {
        assert_eq!(AppRole::parse("owner"), None);
        assert_eq!(AppRole::parse(""), None);
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(serde_json::to_value(AppRole::Sales).unwrap(), "sales");
    }

    #[test]
    fn blank_credentials_clear_and_missing_ones_are_kept() {
        assert_eq!(CompanySettingsPatch::credential(None), None);
        assert_eq!(CompanySettingsPatch::credential(Some("   ".into())), Some(None));
        assert_eq!(
            CompanySettingsPatch::credential(Some(" acct_42 ".into())),
            Some(Some("acct_42".to_string()))
        );
    }

    #[test]
    fn settings_view_never_exposes_the_api_key() {
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: "Acme Freight LLC".into(),
            email: None,
            phone: None,
            address: None,
            payment_account_id: Some("acct_42".into()),
            payment_api_key: Some("sk_live_secret".into()),
            esign_enabled: true,
            subscription_status: "trial".into(),
            created_at: now,
            updated_at: now,
        };

        let view = CompanySettings::from(&company);
        assert!(view.payment_api_key_configured);

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("acct_42"));
        assert!(!json.contains("sk_live_secret"));
    }
}
