// src/models/loads.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "load_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Pending,
    Assigned,
    Picked,
    InTransit,
    Delivered,
    Cancelled,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Pending => "pending",
            LoadStatus::Assigned => "assigned",
            LoadStatus::Picked => "picked",
            LoadStatus::InTransit => "in_transit",
            LoadStatus::Delivered => "delivered",
            LoadStatus::Cancelled => "cancelled",
        }
    }
}

// Estado comercial da venda (independente do status operacional)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    PendingActivation,
    Active,
}

// --- Entidade ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Load {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "LD-20250301-4F2A9C")]
    pub load_number: String,
    pub reference_number: Option<String>,

    pub pickup_location: String,
    pub pickup_city: String,
    pub pickup_state: String,
    pub pickup_date: Option<DateTime<Utc>>,
    pub pickup_notes: Option<String>,

    pub delivery_location: String,
    pub delivery_city: String,
    pub delivery_state: String,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_notes: Option<String>,

    pub commodity: Option<String>,
    pub weight: Option<Decimal>,
    pub distance: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub notes: Option<String>,

    pub status: LoadStatus,
    pub driver_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
    pub sales_agent_id: Option<Uuid>,
    pub sales_percentage: Option<Decimal>,
    pub factoring: bool,
    pub contract_signed: bool,
    pub sale_status: Option<SaleStatus>,

    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// Entrada numérica tolerante: o cliente pode mandar 1200, 1200.5 ou "1200.50".
// ---
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

// ---
// Campos de uma carga (criação e edição parcial).
// Na edição, campo ausente = inalterado; string vazia = limpar o valor.
// ---
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadFields {
    pub load_number: Option<String>,
    pub reference_number: Option<String>,

    pub pickup_location: Option<String>,
    pub pickup_city: Option<String>,
    pub pickup_state: Option<String>,
    pub pickup_date: Option<DateTime<Utc>>,
    pub pickup_notes: Option<String>,

    pub delivery_location: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_notes: Option<String>,

    pub commodity: Option<String>,
    #[schema(value_type = Option<String>, example = "42000")]
    pub weight: Option<NumericInput>,
    #[schema(value_type = Option<String>, example = "850.5")]
    pub distance: Option<NumericInput>,
    #[schema(value_type = Option<String>, example = "2450.00")]
    pub rate: Option<NumericInput>,
    pub notes: Option<String>,

    // IDs chegam como string: "" significa "sem vínculo"
    pub driver_id: Option<String>,
    pub broker_id: Option<String>,
    pub carrier_id: Option<String>,
    pub sales_agent_id: Option<String>,
    #[schema(value_type = Option<String>, example = "10")]
    pub sales_percentage: Option<NumericInput>,
    pub factoring: Option<bool>,
}

// Filtros da listagem
#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LoadFilters {
    pub status: Option<LoadStatus>,
    pub driver_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
}

// Pedido de transição de status
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub status: LoadStatus,
    /// Quando enviado, a escrita só acontece se a carga não mudou desde então.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

// ---
// Valores já validados, prontos para gravar (criação ou edição)
// ---
#[derive(Debug, Clone, PartialEq)]
pub struct LoadDraft {
    pub load_number: String,
    pub reference_number: Option<String>,
    pub pickup_location: String,
    pub pickup_city: String,
    pub pickup_state: String,
    pub pickup_date: Option<DateTime<Utc>>,
    pub pickup_notes: Option<String>,
    pub delivery_location: String,
    pub delivery_city: String,
    pub delivery_state: String,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_notes: Option<String>,
    pub commodity: Option<String>,
    pub weight: Option<Decimal>,
    pub distance: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub notes: Option<String>,
    pub driver_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
    pub sales_agent_id: Option<Uuid>,
    pub sales_percentage: Option<Decimal>,
    pub factoring: bool,
    pub contract_signed: bool,
    pub sale_status: Option<SaleStatus>,
}

impl From<&Load> for LoadDraft {
    fn from(load: &Load) -> Self {
        Self {
            load_number: load.load_number.clone(),
            reference_number: load.reference_number.clone(),
            pickup_location: load.pickup_location.clone(),
            pickup_city: load.pickup_city.clone(),
            pickup_state: load.pickup_state.clone(),
            pickup_date: load.pickup_date,
            pickup_notes: load.pickup_notes.clone(),
            delivery_location: load.delivery_location.clone(),
            delivery_city: load.delivery_city.clone(),
            delivery_state: load.delivery_state.clone(),
            delivery_date: load.delivery_date,
            delivery_notes: load.delivery_notes.clone(),
            commodity: load.commodity.clone(),
            weight: load.weight,
            distance: load.distance,
            rate: load.rate,
            notes: load.notes.clone(),
            driver_id: load.driver_id,
            broker_id: load.broker_id,
            carrier_id: load.carrier_id,
            sales_agent_id: load.sales_agent_id,
            sales_percentage: load.sales_percentage,
            factoring: load.factoring,
            contract_signed: load.contract_signed,
            sale_status: load.sale_status,
        }
    }
}
