// src/models/notifications.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Tipos de notificação emitidos pelo sistema
pub const KIND_PAYMENT_RECEIVED: &str = "payment_received";
pub const KIND_CONTRACT_SENT: &str = "contract_sent";
pub const KIND_CONTRACT_SIGNED: &str = "contract_signed";
pub const KIND_LOAD_STATUS: &str = "load_status";
pub const KIND_WIP_REQUEST: &str = "wip_request";

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "payment_received")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

// Mensagem a ser replicada para todos os membros dos papéis alvo
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}
