// src/db/partner_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::partners::{Broker, BrokerFields, Carrier, CarrierFields, SignatureStatus},
};

// Brokers e carriers: cadastros simples, sempre filtrados por empresa.
#[derive(Clone, Default)]
pub struct PartnerRepository;

impl PartnerRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  BROKERS
    // =========================================================================

    pub async fn list_brokers<'e, E>(&self, executor: E, tenant_id: Option<Uuid>) -> Result<Vec<Broker>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Broker>(
            "SELECT * FROM brokers WHERE ($1::uuid IS NULL OR tenant_id = $1) ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn find_broker<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        broker_id: Uuid,
    ) -> Result<Option<Broker>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Broker>(
            "SELECT * FROM brokers WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)",
        )
        .bind(broker_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn insert_broker<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        fields: &BrokerFields,
    ) -> Result<Broker, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Broker>(
            r#"
            INSERT INTO brokers (
                tenant_id, name, company_name, email, phone, address, payment_terms, mc_number, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(&fields.company_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.address)
        .bind(&fields.payment_terms)
        .bind(&fields.mc_number)
        .bind(&fields.notes)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    /// Edição parcial: campo ausente mantém o valor atual.
    pub async fn update_broker<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        broker_id: Uuid,
        fields: &BrokerFields,
    ) -> Result<Broker, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Broker>(
            r#"
            UPDATE brokers SET
                name = COALESCE($3, name),
                company_name = COALESCE($4, company_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                payment_terms = COALESCE($8, payment_terms),
                mc_number = COALESCE($9, mc_number),
                notes = COALESCE($10, notes),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(broker_id)
        .bind(tenant_id)
        .bind(&fields.name)
        .bind(&fields.company_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.address)
        .bind(&fields.payment_terms)
        .bind(&fields.mc_number)
        .bind(&fields.notes)
        .fetch_optional(executor)
        .await?;

        row.ok_or_else(|| AppError::NotFound("Broker".into()))
    }

    // =========================================================================
    //  CARRIERS
    // =========================================================================

    pub async fn list_carriers<'e, E>(&self, executor: E, tenant_id: Option<Uuid>) -> Result<Vec<Carrier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Carrier>(
            "SELECT * FROM carriers WHERE ($1::uuid IS NULL OR tenant_id = $1) ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn find_carrier<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        carrier_id: Uuid,
    ) -> Result<Option<Carrier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Carrier>(
            "SELECT * FROM carriers WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)",
        )
        .bind(carrier_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn find_carrier_by_envelope<'e, E>(
        &self,
        executor: E,
        envelope_id: &str,
    ) -> Result<Option<Carrier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Carrier>("SELECT * FROM carriers WHERE envelope_id = $1")
            .bind(envelope_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn insert_carrier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        fields: &CarrierFields,
    ) -> Result<Carrier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Carrier>(
            r#"
            INSERT INTO carriers (
                tenant_id, name, email, phone, address, mc_number, dot_number, insurance_expiry, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.address)
        .bind(&fields.mc_number)
        .bind(&fields.dot_number)
        .bind(fields.insurance_expiry)
        .bind(&fields.notes)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn update_carrier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        carrier_id: Uuid,
        fields: &CarrierFields,
    ) -> Result<Carrier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Carrier>(
            r#"
            UPDATE carriers SET
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                mc_number = COALESCE($7, mc_number),
                dot_number = COALESCE($8, dot_number),
                insurance_expiry = COALESCE($9, insurance_expiry),
                notes = COALESCE($10, notes),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(carrier_id)
        .bind(tenant_id)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.address)
        .bind(&fields.mc_number)
        .bind(&fields.dot_number)
        .bind(fields.insurance_expiry)
        .bind(&fields.notes)
        .fetch_optional(executor)
        .await?;

        row.ok_or_else(|| AppError::NotFound("Carrier".into()))
    }

    pub async fn exists_broker<'e, E>(&self, executor: E, tenant_id: Uuid, broker_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM brokers WHERE id = $1 AND tenant_id = $2)",
        )
        .bind(broker_id)
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    // --- Contrato (assinatura eletrônica) ---

    /// Grava o envelope enviado. Só vale enquanto o contrato não foi enviado nem assinado.
    pub async fn mark_contract_sent<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        carrier_id: Uuid,
        envelope_id: &str,
    ) -> Result<Option<Carrier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Carrier>(
            r#"
            UPDATE carriers
            SET envelope_id = $3, signature_status = 'sent', updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
              AND contract_signed = FALSE
              AND signature_status <> 'sent'
            RETURNING *
            "#,
        )
        .bind(carrier_id)
        .bind(tenant_id)
        .bind(envelope_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    /// Flip condicional false -> true. `None` quando já estava assinado (replay).
    pub async fn mark_contract_signed<'e, E>(&self, executor: E, carrier_id: Uuid) -> Result<Option<Carrier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Carrier>(
            r#"
            UPDATE carriers
            SET contract_signed = TRUE,
                contract_signed_at = NOW(),
                signature_status = 'completed',
                updated_at = NOW()
            WHERE id = $1 AND contract_signed = FALSE
            RETURNING *
            "#,
        )
        .bind(carrier_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    /// Recusa/cancelamento do envelope. Contrato assinado nunca é revertido.
    pub async fn set_signature_status<'e, E>(
        &self,
        executor: E,
        carrier_id: Uuid,
        status: SignatureStatus,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE carriers
            SET signature_status = $2, updated_at = NOW()
            WHERE id = $1 AND contract_signed = FALSE
            "#,
        )
        .bind(carrier_id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
