// src/models/partners.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "signature_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    NotSent,
    Sent,
    Completed,
    Declined,
    Voided,
}

// --- Broker (quem contrata o frete) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Broker {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub name: String,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
    pub mc_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrokerFields {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: Option<String>,
    pub company_name: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
    pub mc_number: Option<String>,
    pub notes: Option<String>,
}

// --- Carrier (transportadora que executa o frete) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Carrier {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub mc_number: Option<String>,
    pub dot_number: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub envelope_id: Option<String>,
    pub signature_status: SignatureStatus,
    pub contract_signed: bool,
    pub contract_signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarrierFields {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub mc_number: Option<String>,
    pub dot_number: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendContractPayload {
    #[validate(email(message = "Invalid signer email."))]
    pub signer_email: String,
    #[validate(length(min = 1, message = "Signer name is required."))]
    pub signer_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractSent {
    pub carrier_id: Uuid,
    pub envelope_id: String,
    pub signature_status: SignatureStatus,
}
