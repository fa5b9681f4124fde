// src/models/fleet.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "driver_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    OnRoute,
    OffDuty,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: DriverStatus,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub last_location_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverFields {
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: Option<DriverStatus>,
    // "" desvincula a transportadora
    pub carrier_id: Option<String>,
}

// ---
// Localização
// ---

/// Amostra de posição. Só existe caminho de INSERT para esta tabela.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub driver_id: Uuid,
    pub load_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
    pub driver_id: Uuid,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90."))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180."))]
    pub longitude: f64,
    #[validate(range(min = 0.0, message = "Accuracy cannot be negative."))]
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub load_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationAccepted {
    pub success: bool,
    pub recorded_at: DateTime<Utc>,
}

// Frescor da posição reportada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GpsStatus {
    Active,
    Idle,
    Offline,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverPosition {
    pub driver_id: Uuid,
    pub name: String,
    pub status: DriverStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_location_at: Option<DateTime<Utc>>,
    pub gps_status: GpsStatus,
}
