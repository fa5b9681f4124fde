// src/common/db_utils.rs

use sqlx::{pool::PoolConnection, PgConnection, PgPool, Postgres};

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::tenancy::{TenantContext, TenantScope};

// ---
// Helper RLS: a "chave" da conexão
// ---
// As policies de RLS (ver migrations) leem app.tenant_id, app.is_super_admin e
// app.bypass_rls. Toda conexão que toca tabelas de tenant passa por aqui.
// O pool executa RESET ALL ao devolver a conexão (ver config.rs).

async fn apply_session_keys(
    conn: &mut PgConnection,
    tenant_id: Option<uuid::Uuid>,
    user_id: Option<uuid::Uuid>,
    is_super_admin: bool,
    bypass: bool,
) -> Result<(), AppError> {
    let flag = |on: bool| if on { "on" } else { "off" };

    // Sempre define todas as chaves: nada herdado de um uso anterior da conexão.
    sqlx::query(
        r#"
        SELECT
            set_config('app.tenant_id', $1, false),
            set_config('app.user_id', $2, false),
            set_config('app.is_super_admin', $3, false),
            set_config('app.bypass_rls', $4, false)
        "#,
    )
    .bind(tenant_id.map(|id| id.to_string()).unwrap_or_default())
    .bind(user_id.map(|id| id.to_string()).unwrap_or_default())
    .bind(flag(is_super_admin))
    .bind(flag(bypass))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Adquire uma conexão da pool com as variáveis RLS do principal.
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
) -> Result<PoolConnection<Postgres>, AppError> {
    let mut conn = app_state.db_pool.acquire().await?;

    let tenant_id = match tenant_ctx.scope {
        TenantScope::Tenant(id) => Some(id),
        TenantScope::Global => None,
    };

    apply_session_keys(
        &mut conn,
        tenant_id,
        Some(tenant_ctx.principal_id),
        tenant_ctx.is_super_admin,
        false,
    )
    .await?;

    Ok(conn)
}

/// Conexão de serviço para webhooks: não há principal, a RLS é ignorada e o
/// escopo vem do registro encontrado pelo id externo.
pub(crate) async fn get_service_connection(pool: &PgPool) -> Result<PoolConnection<Postgres>, AppError> {
    let mut conn = pool.acquire().await?;
    apply_session_keys(&mut conn, None, None, false, true).await?;
    Ok(conn)
}
