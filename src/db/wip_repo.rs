// src/db/wip_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::wip::{CreateWipPayload, WipAssignment, WipStatus},
};

#[derive(Clone, Default)]
pub struct WipRepository;

impl WipRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: &CreateWipPayload,
    ) -> Result<WipAssignment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, WipAssignment>(
            r#"
            INSERT INTO wip_assignments (tenant_id, user_id, load_id, driver_id, carrier_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(payload.load_id)
        .bind(payload.driver_id)
        .bind(payload.carrier_id)
        .bind(&payload.notes)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    /// `user_id = None` lista todos os pedidos da empresa (visão do admin).
    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<WipAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, WipAssignment>(
            r#"
            SELECT * FROM wip_assignments
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY requested_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn find<'e, E>(&self, executor: E, tenant_id: Uuid, wip_id: Uuid) -> Result<Option<WipAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, WipAssignment>(
            "SELECT * FROM wip_assignments WHERE id = $1 AND tenant_id = $2",
        )
        .bind(wip_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    /// Decide apenas pedidos pendentes. `None` = já decidido por outra pessoa.
    pub async fn decide<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        wip_id: Uuid,
        status: WipStatus,
        decided_by: Uuid,
        notes: Option<&str>,
    ) -> Result<Option<WipAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, WipAssignment>(
            r#"
            UPDATE wip_assignments SET
                status = $3,
                decided_by = $4,
                decided_at = NOW(),
                notes = COALESCE($5, notes)
            WHERE id = $1 AND tenant_id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(wip_id)
        .bind(tenant_id)
        .bind(status)
        .bind(decided_by)
        .bind(notes)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }
}
