// src/db/notification_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        notifications::{Notification, NotificationMessage},
        tenancy::AppRole,
    },
};

#[derive(Clone, Default)]
pub struct NotificationRepository;

impl NotificationRepository {
    pub fn new() -> Self {
        Self
    }

    /// Uma linha por principal distinto que tenha qualquer um dos papéis na
    /// empresa. Um único INSERT ... SELECT: tudo ou nada.
    pub async fn fan_out<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        roles: &[AppRole],
        msg: &NotificationMessage,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (tenant_id, user_id, kind, title, message, link)
            SELECT DISTINCT $1::uuid, r.user_id, $3, $4, $5, $6
            FROM user_roles r
            WHERE r.tenant_id = $1 AND r.role = ANY($2)
            "#,
        )
        .bind(tenant_id)
        .bind(roles)
        .bind(msg.kind)
        .bind(&msg.title)
        .bind(&msg.message)
        .bind(&msg.link)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_for_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn mark_read<'e, E>(&self, executor: E, user_id: Uuid, notification_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
