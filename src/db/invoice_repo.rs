// src/db/invoice_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::invoices::{CreateInvoicePayload, Invoice, InvoiceStatus},
};

#[derive(Clone, Default)]
pub struct InvoiceRepository;

impl InvoiceRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)",
        )
        .bind(invoice_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(invoice)
    }

    pub async fn list<'e, E>(&self, executor: E, tenant_id: Option<Uuid>) -> Result<Vec<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
            ORDER BY invoice_date DESC, created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(invoices)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        created_by: Uuid,
        payload: &CreateInvoicePayload,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                tenant_id, load_id, broker_id, invoice_number, amount,
                invoice_date, due_date, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, CURRENT_DATE), $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(payload.load_id)
        .bind(payload.broker_id)
        .bind(payload.invoice_number.trim())
        .bind(payload.amount)
        .bind(payload.invoice_date)
        .bind(payload.due_date)
        .bind(&payload.notes)
        .bind(created_by)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            AppError::from_unique(e, &format!("Invoice number '{}' already exists.", payload.invoice_number.trim()))
        })
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        invoice_id: Uuid,
        status: InvoiceStatus,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET status = $3, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(tenant_id)
        .bind(status)
        .fetch_optional(executor)
        .await?;

        invoice.ok_or_else(|| AppError::NotFound("Invoice".into()))
    }

    /// Persiste o link recém-criado. Rascunho passa a "enviada".
    pub async fn store_payment_link<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        link_id: &str,
        link_url: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET
                payment_link_id = $2,
                payment_link_url = $3,
                payment_link_created_at = $4,
                payment_link_expires_at = $5,
                payment_status = CASE WHEN payment_status = 'paid' THEN payment_status ELSE 'pending' END,
                status = CASE WHEN status = 'draft' THEN 'sent' ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(link_id)
        .bind(link_url)
        .bind(created_at)
        .bind(expires_at)
        .fetch_optional(executor)
        .await?;

        invoice.ok_or_else(|| AppError::NotFound("Invoice".into()))
    }

    // --- Webhook de pagamento ---

    /// Procura pela referência externa (id do link ou do pagamento).
    pub async fn find_by_payment_reference<'e, E>(
        &self,
        executor: E,
        reference: &str,
    ) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Link primeiro, depois intent, por último o id da própria fatura
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE payment_link_id = $1 OR payment_intent_id = $1 OR id::text = $1
            ORDER BY (payment_link_id = $1) IS TRUE DESC, (payment_intent_id = $1) IS TRUE DESC
            LIMIT 1
            "#,
        )
        .bind(reference)
        .fetch_optional(executor)
        .await?;
        Ok(invoice)
    }

    /// Update condicional: só a primeira entrega do evento encontra a linha
    /// ainda não paga. `None` = já estava paga (replay).
    pub async fn mark_paid<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        intent_id: Option<&str>,
    ) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET
                payment_status = 'paid',
                payment_date = NOW(),
                status = 'paid',
                payment_intent_id = COALESCE(payment_intent_id, $2),
                updated_at = NOW()
            WHERE id = $1 AND payment_status <> 'paid'
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(intent_id)
        .fetch_optional(executor)
        .await?;
        Ok(invoice)
    }

    pub async fn mark_failed<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        intent_id: Option<&str>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                payment_status = 'failed',
                payment_intent_id = COALESCE(payment_intent_id, $2),
                updated_at = NOW()
            WHERE id = $1 AND payment_status <> 'paid'
            "#,
        )
        .bind(invoice_id)
        .bind(intent_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
