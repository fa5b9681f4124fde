// src/services/notification_service.rs

use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::{
        notifications::{Notification, NotificationMessage, NotificationQuery},
        tenancy::AppRole,
    },
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct NotificationService {
    repo: NotificationRepository,
}

impl NotificationService {
    pub fn new(repo: NotificationRepository) -> Self {
        Self { repo }
    }

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
        let count = self.repo.fan_out(executor, tenant_id, roles, msg).await?;
        tracing::info!("🔔 '{}' entregue a {} destinatário(s) na empresa {}", msg.kind, count, tenant_id);
        Ok(count)
    }

    /// Fan-out acessório a uma operação já concluída. Roda num savepoint
    /// (ou transação própria) para que a falha não contamine a conexão.
    pub async fn fan_out_best_effort(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        roles: &[AppRole],
        msg: &NotificationMessage,
    ) -> u64 {
        let attempt = async {
            let mut savepoint = conn.begin().await?;
            let count = self.fan_out(&mut *savepoint, tenant_id, roles, msg).await?;
            savepoint.commit().await?;
            Ok::<u64, AppError>(count)
        };

        match attempt.await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("⚠️ Notificação '{}' não gravada: {}", msg.kind, e);
                0
            }
        }
    }

    pub async fn list<'e, E>(&self, executor: E, user_id: Uuid, query: &NotificationQuery) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let limit = clamp_limit(query.limit);
        self.repo.list_for_user(executor, user_id, query.unread_only, limit).await
    }

    pub async fn mark_read<'e, E>(&self, executor: E, user_id: Uuid, notification_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if self.repo.mark_read(executor, user_id, notification_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Notification".to_string()))
        }
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.mark_all_read(executor, user_id).await
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_is_bounded() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), 200);
        assert_eq!(clamp_limit(Some(20)), 20);
    }
}
