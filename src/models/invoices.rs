// src/models/invoices.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub load_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
    #[schema(example = "INV-1042")]
    pub invoice_number: String,
    #[schema(example = "2450.00")]
    pub amount: Decimal,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub payment_link_id: Option<String>,
    pub payment_link_url: Option<String>,
    pub payment_link_created_at: Option<DateTime<Utc>>,
    pub payment_link_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub payment_intent_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must be greater than zero.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoicePayload {
    #[validate(length(min = 1, message = "Invoice number is required."))]
    pub invoice_number: String,
    #[validate(custom(function = "validate_positive"))]
    #[schema(value_type = String, example = "2450.00")]
    pub amount: Decimal,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub load_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceStatusPayload {
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkResponse {
    #[schema(example = "plk_7d2f")]
    pub payment_link_id: String,
    pub payment_link_url: String,
    pub expires_at: DateTime<Utc>,
    pub is_existing: bool,
}

impl PaymentLinkResponse {
    /// Monta a resposta a partir da linha gravada. `None` se a fatura não tem link.
    pub fn from_invoice(invoice: &Invoice, is_existing: bool) -> Option<Self> {
        match (&invoice.payment_link_id, &invoice.payment_link_url, invoice.payment_link_expires_at) {
            (Some(id), Some(url), Some(expires_at)) => Some(Self {
                payment_link_id: id.clone(),
                payment_link_url: url.clone(),
                expires_at,
                is_existing,
            }),
            _ => None,
        }
    }
}

// Link devolvido pelo gateway de pagamento
#[derive(Debug, Clone)]
pub struct MintedLink {
    pub id: String,
    pub url: String,
}
