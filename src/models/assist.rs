// src/models/assist.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoadSummaryData {
    pub pickup_location: Option<String>,
    pub pickup_city: Option<String>,
    pub pickup_state: Option<String>,
    pub delivery_location: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub commodity: Option<String>,
    // Número ou texto, repassado como veio
    #[schema(value_type = Option<String>)]
    pub weight: Option<Value>,
    pub pickup_date: Option<String>,
    pub delivery_date: Option<String>,
    pub pickup_notes: Option<String>,
    pub delivery_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DraftEmailData {
    pub recipient_type: Option<String>,
    pub recipient_name: Option<String>,
    pub subject: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SmartReminderData {
    pub load_number: Option<String>,
    pub driver_name: Option<String>,
    pub pickup_city: Option<String>,
    pub pickup_state: Option<String>,
    pub pickup_date: Option<String>,
    pub status: Option<String>,
}

/// `{ "type": "...", "data": { ... } }`. Tipo desconhecido falha na desserialização.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AssistRequest {
    LoadSummary(LoadSummaryData),
    DraftEmail(DraftEmailData),
    SmartReminder(SmartReminderData),
}

impl AssistRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            AssistRequest::LoadSummary(_) => "load_summary",
            AssistRequest::DraftEmail(_) => "draft_email",
            AssistRequest::SmartReminder(_) => "smart_reminder",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssistResponse {
    pub success: bool,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}
