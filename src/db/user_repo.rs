// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::User};

// O repositório de usuários, responsável pela tabela 'users' (sem RLS)
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, invite_token, created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, invite_token, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_invite_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, invite_token, created_at, updated_at
            FROM users
            WHERE invite_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Cria um usuário com senha (cadastro direto)
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES (lower($1), $2)
            RETURNING id, email, password_hash, invite_token, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(executor)
        .await
        .map_err(map_email_conflict)
    }

    /// Cria (ou reaproveita) um usuário convidado. O token só é renovado
    /// enquanto a conta não tem senha; contas ativas voltam intactas.
    pub async fn upsert_invited<'e, E>(
        &self,
        executor: E,
        email: &str,
        invite_token: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, invite_token)
            VALUES (lower($1), $2)
            ON CONFLICT (email) DO UPDATE
                SET invite_token = CASE
                        WHEN users.password_hash IS NULL THEN EXCLUDED.invite_token
                        ELSE users.invite_token
                    END,
                    updated_at = NOW()
            RETURNING id, email, password_hash, invite_token, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(invite_token)
        .fetch_one(executor)
        .await?;
        Ok(user)
    }

    /// Define a senha e consome o token do convite (uso único).
    pub async fn accept_invite(
        &self,
        token: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2, invite_token = NULL, updated_at = NOW()
            WHERE invite_token = $1
            RETURNING id, email, password_hash, invite_token, created_at, updated_at
            "#,
        )
        .bind(token)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

fn map_email_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
            return AppError::EmailAlreadyExists;
        }
    }
    e.into()
}
