// src/models/wip.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "wip_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WipStatus {
    Pending,
    Approved,
    Rejected,
}

// Pedido de um usuário para ser associado a uma carga/motorista/transportadora
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WipAssignment {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub load_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
    pub status: WipStatus,
    pub notes: Option<String>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWipPayload {
    pub load_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DecideWipPayload {
    pub notes: Option<String>,
}
