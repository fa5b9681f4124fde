// src/models/documents.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Bol,
    Pod,
    Contract,
    Insurance,
    RateConfirmation,
    Other,
}

// Metadado informativo: quem o front-end deve exibir o documento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentVisibility {
    #[default]
    Internal,
    Driver,
    Carrier,
    Broker,
    All,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub load_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
    #[schema(example = "bol-4471.pdf")]
    pub file_name: String,
    #[schema(example = "loads/6f1c/bol-4471.pdf")]
    pub file_path: String,
    pub file_size: Option<i64>,
    pub document_type: DocumentType,
    pub visibility: DocumentVisibility,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachDocumentPayload {
    #[validate(length(min = 1, message = "File name is required."))]
    pub file_name: String,
    #[validate(length(min = 1, message = "File path is required."))]
    pub file_path: String,
    #[validate(range(min = 0, message = "File size cannot be negative."))]
    pub file_size: Option<i64>,
    pub document_type: DocumentType,
    #[serde(default)]
    pub visibility: DocumentVisibility,
}
