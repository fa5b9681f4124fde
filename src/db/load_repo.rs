// src/db/load_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::loads::{Load, LoadDraft, LoadFilters, LoadStatus},
};

// Visibilidade da listagem por papel
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadVisibility {
    // Motorista: apenas cargas deste driver
    pub driver_id: Option<Uuid>,
    // Vendas: cargas onde é agente ou criador
    pub sales_user_id: Option<Uuid>,
}

#[derive(Clone, Default)]
pub struct LoadRepository;

impl LoadRepository {
    pub fn new() -> Self {
        Self
    }

    /// `tenant_id = None` só para super-admin em escopo global.
    pub async fn find<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        load_id: Uuid,
    ) -> Result<Option<Load>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let load = sqlx::query_as::<_, Load>(
            "SELECT * FROM loads WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)",
        )
        .bind(load_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(load)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        filters: &LoadFilters,
        visibility: LoadVisibility,
    ) -> Result<Vec<Load>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let loads = sqlx::query_as::<_, Load>(
            r#"
            SELECT * FROM loads
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::load_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR driver_id = $3)
              AND ($4::uuid IS NULL OR carrier_id = $4)
              AND ($5::uuid IS NULL OR driver_id = $5)
              AND ($6::uuid IS NULL OR sales_agent_id = $6 OR created_by = $6)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(filters.status)
        .bind(filters.driver_id)
        .bind(filters.carrier_id)
        .bind(visibility.driver_id)
        .bind(visibility.sales_user_id)
        .fetch_all(executor)
        .await?;
        Ok(loads)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        created_by: Uuid,
        draft: &LoadDraft,
    ) -> Result<Load, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Load>(
            r#"
            INSERT INTO loads (
                tenant_id, load_number, reference_number,
                pickup_location, pickup_city, pickup_state, pickup_date, pickup_notes,
                delivery_location, delivery_city, delivery_state, delivery_date, delivery_notes,
                commodity, weight, distance, rate, notes,
                driver_id, broker_id, carrier_id, sales_agent_id, sales_percentage,
                factoring, contract_signed, sale_status, created_by, status
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27,
                'pending'
            )
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&draft.load_number)
        .bind(&draft.reference_number)
        .bind(&draft.pickup_location)
        .bind(&draft.pickup_city)
        .bind(&draft.pickup_state)
        .bind(draft.pickup_date)
        .bind(&draft.pickup_notes)
        .bind(&draft.delivery_location)
        .bind(&draft.delivery_city)
        .bind(&draft.delivery_state)
        .bind(draft.delivery_date)
        .bind(&draft.delivery_notes)
        .bind(&draft.commodity)
        .bind(draft.weight)
        .bind(draft.distance)
        .bind(draft.rate)
        .bind(&draft.notes)
        .bind(draft.driver_id)
        .bind(draft.broker_id)
        .bind(draft.carrier_id)
        .bind(draft.sales_agent_id)
        .bind(draft.sales_percentage)
        .bind(draft.factoring)
        .bind(draft.contract_signed)
        .bind(draft.sale_status)
        .bind(created_by)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, &format!("Load number '{}' already exists.", draft.load_number)))
    }

    /// Grava todos os campos editáveis. `status` fica de fora: só o motor de
    /// transições escreve nessa coluna.
    pub async fn update_fields<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        load_id: Uuid,
        draft: &LoadDraft,
    ) -> Result<Load, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let load = sqlx::query_as::<_, Load>(
            r#"
            UPDATE loads SET
                load_number = $3, reference_number = $4,
                pickup_location = $5, pickup_city = $6, pickup_state = $7,
                pickup_date = $8, pickup_notes = $9,
                delivery_location = $10, delivery_city = $11, delivery_state = $12,
                delivery_date = $13, delivery_notes = $14,
                commodity = $15, weight = $16, distance = $17, rate = $18, notes = $19,
                driver_id = $20, broker_id = $21, carrier_id = $22,
                sales_agent_id = $23, sales_percentage = $24, factoring = $25,
                contract_signed = $26, sale_status = $27,
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(load_id)
        .bind(tenant_id)
        .bind(&draft.load_number)
        .bind(&draft.reference_number)
        .bind(&draft.pickup_location)
        .bind(&draft.pickup_city)
        .bind(&draft.pickup_state)
        .bind(draft.pickup_date)
        .bind(&draft.pickup_notes)
        .bind(&draft.delivery_location)
        .bind(&draft.delivery_city)
        .bind(&draft.delivery_state)
        .bind(draft.delivery_date)
        .bind(&draft.delivery_notes)
        .bind(&draft.commodity)
        .bind(draft.weight)
        .bind(draft.distance)
        .bind(draft.rate)
        .bind(&draft.notes)
        .bind(draft.driver_id)
        .bind(draft.broker_id)
        .bind(draft.carrier_id)
        .bind(draft.sales_agent_id)
        .bind(draft.sales_percentage)
        .bind(draft.factoring)
        .bind(draft.contract_signed)
        .bind(draft.sale_status)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, &format!("Load number '{}' already exists.", draft.load_number)))?;

        load.ok_or_else(|| AppError::NotFound("Load".into()))
    }

    /// Compare-and-set do status: só escreve se o status atual ainda for `from`
    /// (e, quando informado, se `updated_at` não mudou). `None` = perdeu a corrida.
    #[allow(clippy::too_many_arguments)]
    pub async fn compare_and_set_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        load_id: Uuid,
        from: LoadStatus,
        to: LoadStatus,
        expected_updated_at: Option<DateTime<Utc>>,
        driver_update: DriverUpdate,
    ) -> Result<Option<Load>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (touch_driver, new_driver) = match driver_update {
            DriverUpdate::Keep => (false, None),
            DriverUpdate::Set(id) => (true, Some(id)),
            DriverUpdate::Clear => (true, None),
        };

        let load = sqlx::query_as::<_, Load>(
            r#"
            UPDATE loads SET
                status = $4,
                driver_id = CASE WHEN $6 THEN $7 ELSE driver_id END,
                updated_at = NOW()
            WHERE id = $1
              AND tenant_id = $2
              AND status = $3
              AND ($5::timestamptz IS NULL OR updated_at = $5)
            RETURNING *
            "#,
        )
        .bind(load_id)
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .bind(expected_updated_at)
        .bind(touch_driver)
        .bind(new_driver)
        .fetch_optional(executor)
        .await?;
        Ok(load)
    }

    /// Libera as vendas de uma transportadora que acabou de assinar contrato.
    /// Não toca na coluna `status`.
    pub async fn activate_carrier_loads<'e, E>(&self, executor: E, carrier_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE loads
            SET sale_status = 'active', contract_signed = TRUE, updated_at = NOW()
            WHERE carrier_id = $1 AND sale_status = 'pending_activation'
            "#,
        )
        .bind(carrier_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn exists_in_tenant<'e, E>(&self, executor: E, tenant_id: Uuid, load_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM loads WHERE id = $1 AND tenant_id = $2)",
        )
        .bind(load_id)
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }
}

/// O que a transição faz com o motorista vinculado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverUpdate {
    Keep,
    Set(Uuid),
    Clear,
}
