// src/services/assist_service.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::error::AppError,
    integrations::llm::LlmGateway,
    models::assist::{AssistRequest, AssistResponse, DraftEmailData, LoadSummaryData, SmartReminderData},
};

const LOAD_SUMMARY_SYSTEM: &str = "You are a logistics AI assistant. Generate clear, concise pickup and delivery instructions for truck drivers. Focus on safety, efficiency, and clarity.";
const DRAFT_EMAIL_SYSTEM: &str =
    "You are a professional logistics coordinator. Draft clear, professional emails to brokers or drivers.";
const SMART_REMINDER_SYSTEM: &str =
    "You are a logistics AI assistant. Generate smart, contextual reminders for drivers and dispatchers.";

#[derive(Clone)]
pub struct AssistService {
    gateway: Arc<dyn LlmGateway>,
}

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn load_summary_prompt(d: &LoadSummaryData) -> String {
    let weight = match &d.weight {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | None => "Not specified".to_string(),
        Some(Value::String(_)) => "Not specified".to_string(),
        Some(other) => other.to_string(),
    };
    let commodity = d.commodity.as_deref().filter(|c| !c.is_empty()).unwrap_or("General freight");

    let mut prompt = format!(
        "Generate pickup and delivery instructions for this load:\n\
         - Pickup: {}, {}, {}\n\
         - Delivery: {}, {}, {}\n\
         - Commodity: {}\n\
         - Weight: {}\n\
         - Pickup Date: {}\n\
         - Delivery Date: {}\n",
        show(&d.pickup_location),
        show(&d.pickup_city),
        show(&d.pickup_state),
        show(&d.delivery_location),
        show(&d.delivery_city),
        show(&d.delivery_state),
        commodity,
        weight,
        show(&d.pickup_date),
        show(&d.delivery_date),
    );
    if let Some(notes) = d.pickup_notes.as_deref().filter(|n| !n.is_empty()) {
        prompt.push_str(&format!("- Pickup Notes: {}\n", notes));
    }
    if let Some(notes) = d.delivery_notes.as_deref().filter(|n| !n.is_empty()) {
        prompt.push_str(&format!("- Delivery Notes: {}\n", notes));
    }
    prompt.push_str(
        "\nProvide:\n1. Clear pickup instructions\n2. Safety considerations\n3. Delivery instructions\n4. Any special handling notes",
    );
    prompt
}

fn draft_email_prompt(d: &DraftEmailData) -> String {
    format!(
        "Draft a professional email for the following:\n\
         Recipient: {} ({})\n\
         Subject: {}\n\
         Context: {}\n\n\
         Keep it professional, clear, and action-oriented.",
        show(&d.recipient_type),
        show(&d.recipient_name),
        show(&d.subject),
        show(&d.context),
    )
}

fn smart_reminder_prompt(d: &SmartReminderData) -> String {
    format!(
        "Generate a reminder message for:\n\
         Load: {}\n\
         Driver: {}\n\
         Pickup: {}, {}\n\
         Pickup Time: {}\n\
         Current Status: {}\n\n\
         Create a helpful reminder that includes key details and next steps.",
        show(&d.load_number),
        show(&d.driver_name),
        show(&d.pickup_city),
        show(&d.pickup_state),
        show(&d.pickup_date),
        show(&d.status),
    )
}

/// Par (system, user) enviado ao modelo.
pub fn build_prompts(request: &AssistRequest) -> (&'static str, String) {
    match request {
        AssistRequest::LoadSummary(d) => (LOAD_SUMMARY_SYSTEM, load_summary_prompt(d)),
        AssistRequest::DraftEmail(d) => (DRAFT_EMAIL_SYSTEM, draft_email_prompt(d)),
        AssistRequest::SmartReminder(d) => (SMART_REMINDER_SYSTEM, smart_reminder_prompt(d)),
    }
}

impl AssistService {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    pub async fn assist(&self, request: &AssistRequest) -> Result<AssistResponse, AppError> {
        let (system, user) = build_prompts(request);
        let content = self.gateway.complete(system, &user).await?;

        tracing::info!("🤖 Assistente '{}' respondeu", request.kind());
        Ok(AssistResponse {
            success: true,
            content,
            kind: request.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn parse(json: &str) -> AssistRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn load_summary_fills_defaults() {
        let req = parse(r#"{"type":"load_summary","data":{"pickup_city":"Dallas","pickup_state":"TX"}}"#);
        let (system, user) = build_prompts(&req);
        assert!(system.contains("pickup and delivery instructions"));
        assert!(user.contains("- Commodity: General freight"));
        assert!(user.contains("- Weight: Not specified"));
        assert!(user.contains("Dallas, TX"));
        assert!(!user.contains("Pickup Notes"));
        assert!(user.ends_with("4. Any special handling notes"));
    }

    #[test]
    fn numeric_weight_is_rendered_as_sent() {
        let req = parse(r#"{"type":"load_summary","data":{"weight":42000,"pickup_notes":"Dock 4"}}"#);
        let (_, user) = build_prompts(&req);
        assert!(user.contains("- Weight: 42000"));
        assert!(user.contains("- Pickup Notes: Dock 4"));
    }

    #[test]
    fn draft_email_mentions_recipient() {
        let req = parse(
            r#"{"type":"draft_email","data":{"recipient_type":"broker","recipient_name":"Jo","subject":"Rate","context":"Late"}}"#,
        );
        let (system, user) = build_prompts(&req);
        assert!(system.starts_with("You are a professional logistics coordinator."));
        assert!(user.contains("Recipient: broker (Jo)"));
        assert!(user.ends_with("Keep it professional, clear, and action-oriented."));
    }

    #[test]
    fn smart_reminder_includes_status() {
        let req = parse(r#"{"type":"smart_reminder","data":{"load_number":"LD-1","status":"assigned"}}"#);
        let (_, user) = build_prompts(&req);
        assert!(user.contains("Load: LD-1"));
        assert!(user.contains("Current Status: assigned"));
    }

    #[test]
    fn unknown_type_does_not_parse() {
        assert!(serde_json::from_str::<AssistRequest>(r#"{"type":"poem","data":{}}"#).is_err());
    }

    struct RateLimitedLlm;

    #[async_trait]
    impl LlmGateway for RateLimitedLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, AppError> {
            Err(AppError::RateLimited)
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl LlmGateway for EchoLlm {
        async fn complete(&self, system: &str, _user: &str) -> Result<String, AppError> {
            let head: String = system.chars().take(12).collect();
            Ok(format!("ok: {}", head.trim_end()))
        }
    }

    #[tokio::test]
    async fn upstream_rate_limit_propagates() {
        let svc = AssistService::new(Arc::new(RateLimitedLlm));
        let req = parse(r#"{"type":"smart_reminder","data":{}}"#);
        assert!(matches!(svc.assist(&req).await, Err(AppError::RateLimited)));
    }

    #[tokio::test]
    async fn response_carries_the_request_type() {
        let svc = AssistService::new(Arc::new(EchoLlm));
        let res = svc.assist(&parse(r#"{"type":"draft_email","data":{}}"#)).await.unwrap();
        assert!(res.success);
        assert_eq!(res.kind, "draft_email");
        assert_eq!(res.content, "ok: You are a pr");
    }
}
