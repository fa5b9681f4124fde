// src/models/webhooks.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Gateway de pagamento ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PaymentEventData {
    pub id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub payment_link_id: Option<String>,
}

/// Alguns produtores mandam `event_type`, outros `name`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PaymentEvent {
    pub event_type: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub data: PaymentEventData,
}

impl PaymentEvent {
    pub fn kind(&self) -> &str {
        self.event_type.as_deref().or(self.name.as_deref()).unwrap_or_default()
    }

    /// Ids candidatos, na ordem em que são procurados.
    pub fn references(&self) -> Vec<&str> {
        [&self.data.id, &self.data.payment_intent_id, &self.data.payment_link_id]
            .into_iter()
            .filter_map(|r| r.as_deref())
            .filter(|r| !r.is_empty())
            .collect()
    }

    /// Id do payment intent: o campo explícito ou, em eventos
    /// `payment_intent.*`, o próprio `data.id`.
    pub fn intent_id(&self) -> Option<&str> {
        let from_data = || {
            self.kind()
                .starts_with("payment_intent.")
                .then_some(self.data.id.as_deref())
                .flatten()
        };
        self.data
            .payment_intent_id
            .as_deref()
            .or_else(from_data)
            .filter(|id| !id.is_empty())
    }
}

// --- Assinatura eletrônica ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EsignEventData {
    #[serde(rename = "envelopeId")]
    pub envelope_id_camel: Option<String>,
    pub envelope_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EsignEvent {
    pub event: Option<String>,
    #[serde(default)]
    pub data: EsignEventData,
}

impl EsignEvent {
    pub fn envelope_id(&self) -> Option<&str> {
        self.data
            .envelope_id_camel
            .as_deref()
            .or(self.data.envelope_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

// Resposta padrão dos webhooks
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    pub already_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_event_accepts_either_name_field() {
        let a: PaymentEvent = serde_json::from_str(r#"{"event_type":"payment.succeeded","data":{"id":"p1"}}"#).unwrap();
        let b: PaymentEvent = serde_json::from_str(r#"{"name":"payment.succeeded","data":{"payment_link_id":"p1"}}"#).unwrap();
        assert_eq!(a.kind(), "payment.succeeded");
        assert_eq!(b.kind(), "payment.succeeded");
        assert_eq!(a.references(), vec!["p1"]);
        assert_eq!(b.references(), vec!["p1"]);
    }

    #[test]
    fn envelope_id_accepts_both_spellings() {
        let a: EsignEvent = serde_json::from_str(r#"{"event":"envelope-completed","data":{"envelopeId":"e1"}}"#).unwrap();
        let b: EsignEvent = serde_json::from_str(r#"{"data":{"envelope_id":"e2","status":"completed"}}"#).unwrap();
        assert_eq!(a.envelope_id(), Some("e1"));
        assert_eq!(b.envelope_id(), Some("e2"));
    }

    #[test]
    fn intent_id_comes_from_the_explicit_field_or_intent_events() {
        let explicit: PaymentEvent = serde_json::from_str(
            r#"{"name":"payment.succeeded","data":{"id":"plk_1","payment_intent_id":"int_9"}}"#,
        )
        .unwrap();
        let intent: PaymentEvent =
            serde_json::from_str(r#"{"name":"payment_intent.succeeded","data":{"id":"int_7"}}"#).unwrap();
        let link_only: PaymentEvent =
            serde_json::from_str(r#"{"name":"payment.succeeded","data":{"id":"plk_1"}}"#).unwrap();

        assert_eq!(explicit.intent_id(), Some("int_9"));
        assert_eq!(intent.intent_id(), Some("int_7"));
        assert_eq!(link_only.intent_id(), None);
    }

    #[test]
    fn missing_data_is_tolerated() {
        let e: PaymentEvent = serde_json::from_str(r#"{"event_type":"account.updated"}"#).unwrap();
        assert!(e.references().is_empty());
    }
}
