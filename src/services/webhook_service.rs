// src/services/webhook_service.rs

// Eventos dos serviços externos. Cada efeito é um UPDATE condicional: a
// primeira entrega aplica, as repetições viram no-op.

use sqlx::{Connection, PgConnection};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InvoiceRepository, LoadRepository, PartnerRepository},
    models::{
        invoices::Invoice,
        notifications::{NotificationMessage, KIND_CONTRACT_SIGNED, KIND_PAYMENT_RECEIVED},
        partners::SignatureStatus,
        tenancy::AppRole,
        webhooks::{EsignEvent, PaymentEvent},
    },
    services::notification_service::NotificationService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventKind {
    Succeeded,
    Failed,
    Other,
}

pub fn classify_payment_event(kind: &str) -> PaymentEventKind {
    match kind {
        "payment_intent.succeeded" | "payment.succeeded" => PaymentEventKind::Succeeded,
        "payment_intent.failed" | "payment.failed" => PaymentEventKind::Failed,
        _ => PaymentEventKind::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EsignEventKind {
    Completed,
    Closed(SignatureStatus),
    Other,
}

pub fn classify_esign_event(event: Option<&str>, status: Option<&str>) -> EsignEventKind {
    match (event, status) {
        (Some("envelope-completed"), _) | (_, Some("completed")) => EsignEventKind::Completed,
        (Some("envelope-voided"), _) | (_, Some("voided")) => EsignEventKind::Closed(SignatureStatus::Voided),
        (Some("envelope-declined"), _) | (_, Some("declined")) => EsignEventKind::Closed(SignatureStatus::Declined),
        _ => EsignEventKind::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    // Evento conhecido e registro encontrado
    pub recognized: bool,
    pub applied: bool,
    pub invoice_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
}

impl WebhookOutcome {
    fn ignored() -> Self {
        Self {
            recognized: false,
            applied: false,
            invoice_id: None,
            carrier_id: None,
        }
    }

    /// Evento conhecido que não mudou nada: reentrega.
    pub fn already_applied(&self) -> bool {
        self.recognized && !self.applied
    }
}

#[derive(Clone)]
pub struct WebhookService {
    invoice_repo: InvoiceRepository,
    partner_repo: PartnerRepository,
    load_repo: LoadRepository,
    notification_service: NotificationService,
}

impl WebhookService {
    pub fn new(
        invoice_repo: InvoiceRepository,
        partner_repo: PartnerRepository,
        load_repo: LoadRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            invoice_repo,
            partner_repo,
            load_repo,
            notification_service,
        }
    }

    async fn find_invoice(&self, conn: &mut PgConnection, event: &PaymentEvent) -> Result<Invoice, AppError> {
        let references = event.references();
        if references.is_empty() {
            return Err(AppError::invalid_field("data", "Missing payment id."));
        }
        for reference in references {
            if let Some(invoice) = self.invoice_repo.find_by_payment_reference(&mut *conn, reference).await? {
                return Ok(invoice);
            }
        }
        Err(AppError::NotFound("Invoice".to_string()))
    }

    /// `conn` é uma conexão de serviço (RLS liberada).
    pub async fn handle_payment_event(&self, conn: &mut PgConnection, event: &PaymentEvent) -> Result<WebhookOutcome, AppError> {
        let kind = classify_payment_event(event.kind());
        if kind == PaymentEventKind::Other {
            tracing::info!("ℹ️ Evento de pagamento '{}' ignorado", event.kind());
            return Ok(WebhookOutcome::ignored());
        }

        let invoice = self.find_invoice(conn, event).await?;

        match kind {
            PaymentEventKind::Succeeded => {
                let Some(paid) = self.invoice_repo.mark_paid(&mut *conn, invoice.id, event.intent_id()).await? else {
                    tracing::info!("🔁 Pagamento da fatura {} já aplicado", invoice.id);
                    return Ok(WebhookOutcome {
                        recognized: true,
                        applied: false,
                        invoice_id: Some(invoice.id),
                        carrier_id: None,
                    });
                };

                tracing::info!("💰 Fatura {} paga", paid.invoice_number);
                let msg = NotificationMessage {
                    kind: KIND_PAYMENT_RECEIVED,
                    title: "Payment Received".to_string(),
                    message: format!("Invoice payment of ${} has been received.", paid.amount),
                    link: Some("/invoices".to_string()),
                };
                self.notification_service
                    .fan_out_best_effort(conn, paid.tenant_id, &[AppRole::Admin, AppRole::Treasury], &msg)
                    .await;

                Ok(WebhookOutcome {
                    recognized: true,
                    applied: true,
                    invoice_id: Some(paid.id),
                    carrier_id: None,
                })
            }
            PaymentEventKind::Failed => {
                let applied = self.invoice_repo.mark_failed(&mut *conn, invoice.id, event.intent_id()).await?;
                tracing::info!("❌ Pagamento da fatura {} falhou (aplicado: {})", invoice.id, applied);
                Ok(WebhookOutcome {
                    recognized: true,
                    applied,
                    invoice_id: Some(invoice.id),
                    carrier_id: None,
                })
            }
            PaymentEventKind::Other => Ok(WebhookOutcome::ignored()),
        }
    }

    pub async fn handle_esign_event(&self, conn: &mut PgConnection, event: &EsignEvent) -> Result<WebhookOutcome, AppError> {
        let envelope_id = event
            .envelope_id()
            .ok_or_else(|| AppError::invalid_field("data", "Missing envelope id."))?;

        let carrier = self
            .partner_repo
            .find_carrier_by_envelope(&mut *conn, envelope_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Carrier".to_string()))?;

        match classify_esign_event(event.event.as_deref(), event.data.status.as_deref()) {
            EsignEventKind::Completed => {
                // Flip do contrato e ativação das cargas juntos
                let mut tx = conn.begin().await?;
                let Some(signed) = self.partner_repo.mark_contract_signed(&mut *tx, carrier.id).await? else {
                    tracing::info!("🔁 Contrato da transportadora {} já estava assinado", carrier.id);
                    return Ok(WebhookOutcome {
                        recognized: true,
                        applied: false,
                        invoice_id: None,
                        carrier_id: Some(carrier.id),
                    });
                };
                let activated = self.load_repo.activate_carrier_loads(&mut *tx, carrier.id).await?;
                tx.commit().await?;

                tracing::info!("✅ Contrato de {} assinado; {} carga(s) ativada(s)", signed.name, activated);
                let msg = NotificationMessage {
                    kind: KIND_CONTRACT_SIGNED,
                    title: "Contract Signed".to_string(),
                    message: format!("{} has signed the contract. Associated loads are now active.", signed.name),
                    link: Some("/carriers".to_string()),
                };
                self.notification_service
                    .fan_out_best_effort(conn, signed.tenant_id, &[AppRole::Admin], &msg)
                    .await;

                Ok(WebhookOutcome {
                    recognized: true,
                    applied: true,
                    invoice_id: None,
                    carrier_id: Some(carrier.id),
                })
            }
            EsignEventKind::Closed(status) => {
                let applied = self.partner_repo.set_signature_status(&mut *conn, carrier.id, status).await?;
                tracing::info!("✍️ Envelope {} encerrado como {:?} (aplicado: {})", envelope_id, status, applied);
                Ok(WebhookOutcome {
                    recognized: true,
                    applied,
                    invoice_id: None,
                    carrier_id: Some(carrier.id),
                })
            }
            EsignEventKind::Other => Ok(WebhookOutcome {
                recognized: false,
                applied: false,
                invoice_id: None,
                carrier_id: Some(carrier.id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recognized_no_ops_count_as_replays() {
        let replay = WebhookOutcome {
            recognized: true,
            applied: false,
            invoice_id: Some(Uuid::new_v4()),
            carrier_id: None,
        };
        assert!(replay.already_applied());
        assert!(!WebhookOutcome::ignored().already_applied());
    }

    #[test]
    fn payment_event_names() {
        assert_eq!(classify_payment_event("payment_intent.succeeded"), PaymentEventKind::Succeeded);
        assert_eq!(classify_payment_event("payment.succeeded"), PaymentEventKind::Succeeded);
        assert_eq!(classify_payment_event("payment_intent.failed"), PaymentEventKind::Failed);
        assert_eq!(classify_payment_event("payment.failed"), PaymentEventKind::Failed);
        assert_eq!(classify_payment_event("refund.created"), PaymentEventKind::Other);
        assert_eq!(classify_payment_event(""), PaymentEventKind::Other);
    }

    #[test]
    fn esign_completion_by_event_or_status() {
        assert_eq!(classify_esign_event(Some("envelope-completed"), None), EsignEventKind::Completed);
        assert_eq!(classify_esign_event(None, Some("completed")), EsignEventKind::Completed);
    }

    #[test]
    fn esign_declines_and_voids_close_the_envelope() {
        assert_eq!(
            classify_esign_event(Some("envelope-declined"), None),
            EsignEventKind::Closed(SignatureStatus::Declined)
        );
        assert_eq!(
            classify_esign_event(Some("envelope-voided"), Some("voided")),
            EsignEventKind::Closed(SignatureStatus::Voided)
        );
        assert_eq!(classify_esign_event(Some("envelope-sent"), Some("sent")), EsignEventKind::Other);
    }

    // ---
    // Com banco
    // ---

    use crate::{
        common::test_support::{count, seed_carrier, seed_company, seed_invoice, seed_load, seed_member, service_conn},
        db::NotificationRepository,
    };
    use sqlx::PgPool;

    fn service() -> WebhookService {
        WebhookService::new(
            InvoiceRepository::new(),
            PartnerRepository::new(),
            LoadRepository::new(),
            NotificationService::new(NotificationRepository::new()),
        )
    }

    fn payment_event(json: &str) -> PaymentEvent {
        serde_json::from_str(json).unwrap()
    }

    const NOTIFICATIONS: &str = "SELECT COUNT(*) FROM notifications WHERE tenant_id = $1";

    #[sqlx::test(migrations = "./migrations")]
    async fn repeated_payment_success_marks_paid_and_notifies_once(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        seed_member(&pool, tenant, AppRole::Admin).await;
        seed_member(&pool, tenant, AppRole::Treasury).await;
        seed_member(&pool, tenant, AppRole::Dispatcher).await;
        let invoice_id = seed_invoice(&pool, tenant, Some("plk_abc")).await;

        let event = payment_event(r#"{"name":"payment_intent.succeeded","data":{"id":"int_1","payment_link_id":"plk_abc"}}"#);
        let svc = service();
        let mut conn = service_conn(&pool).await;

        let first = svc.handle_payment_event(&mut *conn, &event).await.unwrap();
        assert!(first.applied);
        assert_eq!(first.invoice_id, Some(invoice_id));

        let second = svc.handle_payment_event(&mut *conn, &event).await.unwrap();
        assert!(second.already_applied());
        assert_eq!(second.invoice_id, Some(invoice_id));

        // Admin e tesouraria, uma vez cada
        assert_eq!(count(&pool, NOTIFICATIONS, tenant).await, 2);

        let (status, intent): (String, Option<String>) =
            sqlx::query_as("SELECT payment_status::text, payment_intent_id FROM invoices WHERE id = $1")
                .bind(invoice_id)
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(status, "paid");
        assert_eq!(intent.as_deref(), Some("int_1"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn intent_recorded_on_failure_finds_the_invoice_later(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let invoice_id = seed_invoice(&pool, tenant, Some("plk_retry")).await;
        let svc = service();
        let mut conn = service_conn(&pool).await;

        let failed = payment_event(r#"{"name":"payment_intent.failed","data":{"id":"int_2","payment_link_id":"plk_retry"}}"#);
        assert!(svc.handle_payment_event(&mut *conn, &failed).await.unwrap().applied);

        // Sem o id do link: só o intent gravado aponta a fatura
        let succeeded = payment_event(r#"{"name":"payment_intent.succeeded","data":{"id":"int_2"}}"#);
        let outcome = svc.handle_payment_event(&mut *conn, &succeeded).await.unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.invoice_id, Some(invoice_id));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_payment_reference_is_not_found(pool: PgPool) {
        let mut conn = service_conn(&pool).await;
        let event = payment_event(r#"{"name":"payment.succeeded","data":{"id":"plk_nowhere"}}"#);
        assert!(matches!(
            service().handle_payment_event(&mut *conn, &event).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn repeated_signature_completion_activates_loads_once(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        seed_member(&pool, tenant, AppRole::Admin).await;
        let carrier = seed_carrier(&pool, tenant, "env_1").await;
        seed_load(&pool, tenant, Some(carrier), None).await;
        seed_load(&pool, tenant, Some(carrier), None).await;

        let event: EsignEvent =
            serde_json::from_str(r#"{"event":"envelope-completed","data":{"envelopeId":"env_1"}}"#).unwrap();
        let svc = service();
        let mut conn = service_conn(&pool).await;

        let first = svc.handle_esign_event(&mut *conn, &event).await.unwrap();
        assert!(first.applied);
        assert_eq!(first.carrier_id, Some(carrier));

        let second = svc.handle_esign_event(&mut *conn, &event).await.unwrap();
        assert!(second.already_applied());

        let active = count(
            &pool,
            "SELECT COUNT(*) FROM loads WHERE carrier_id = $1 AND sale_status = 'active' AND contract_signed",
            carrier,
        )
        .await;
        assert_eq!(active, 2);
        assert_eq!(count(&pool, NOTIFICATIONS, tenant).await, 1);
    }
}
