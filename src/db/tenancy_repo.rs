// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tenancy::{AppRole, Company, CompanyOverview, CompanySettingsPatch, Profile, TeamMember, UserRole},
};

// Empresas, perfis e papéis. Estas tabelas não têm RLS: o resolver precisa
// lê-las antes de saber o escopo do principal.
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn find_role(&self, user_id: Uuid, tenant_id: Uuid) -> Result<Option<AppRole>, AppError> {
        let role = sqlx::query_scalar::<_, AppRole>(
            "SELECT role FROM user_roles WHERE user_id = $1 AND tenant_id = $2",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    pub async fn company_exists(&self, tenant_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn find_company<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Option<Company>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(company)
    }

    /// Aplica o patch numa única instrução; colunas fora do patch não mudam.
    pub async fn update_company_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        patch: &CompanySettingsPatch,
    ) -> Result<Option<Company>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET payment_account_id = CASE WHEN $2 THEN $3 ELSE payment_account_id END,
                payment_api_key = CASE WHEN $4 THEN $5 ELSE payment_api_key END,
                esign_enabled = COALESCE($6, esign_enabled),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(patch.payment_account_id.is_some())
        .bind(patch.payment_account_id.clone().flatten())
        .bind(patch.payment_api_key.is_some())
        .bind(patch.payment_api_key.clone().flatten())
        .bind(patch.esign_enabled)
        .fetch_optional(executor)
        .await?;
        Ok(company)
    }

    pub async fn create_company<'e, E>(
        &self,
        executor: E,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, email, phone, address)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(address)
        .fetch_one(executor)
        .await?;
        Ok(company)
    }

    /// Cria o perfil ou o liga à empresa. Nunca move um perfil que já tem empresa.
    pub async fn attach_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, tenant_id, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
                SET tenant_id = EXCLUDED.tenant_id,
                    first_name = COALESCE(EXCLUDED.first_name, profiles.first_name),
                    last_name = COALESCE(EXCLUDED.last_name, profiles.last_name),
                    phone = COALESCE(EXCLUDED.phone, profiles.phone),
                    updated_at = NOW()
                WHERE profiles.tenant_id IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .fetch_optional(executor)
        .await?;

        profile.ok_or(AppError::AlreadyMember)
    }

    /// Atribui o papel. A restrição UNIQUE(user_id, tenant_id) impede duplicatas.
    pub async fn assign_role<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
        role: AppRole,
    ) -> Result<UserRole, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, UserRole>(
            r#"
            INSERT INTO user_roles (user_id, tenant_id, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::AlreadyMember,
            _ => e.into(),
        })
    }

    pub async fn list_team(&self, tenant_id: Uuid) -> Result<Vec<TeamMember>, AppError> {
        let members = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT
                u.id AS user_id,
                u.email,
                p.first_name,
                p.last_name,
                p.phone,
                r.role,
                (u.password_hash IS NULL) AS invite_pending,
                r.created_at AS joined_at
            FROM user_roles r
            JOIN users u ON u.id = r.user_id
            LEFT JOIN profiles p ON p.id = r.user_id
            WHERE r.tenant_id = $1
            ORDER BY r.created_at
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    /// Visão geral para o super-admin. Roda numa conexão com RLS liberada
    /// para super-admin (loads e invoices têm RLS).
    pub async fn list_company_overviews<'e, E>(&self, executor: E) -> Result<Vec<CompanyOverview>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, CompanyOverview>(
            r#"
            SELECT
                c.id,
                c.name,
                c.subscription_status,
                (SELECT COUNT(*) FROM user_roles r WHERE r.tenant_id = c.id) AS member_count,
                (SELECT COUNT(*) FROM loads l WHERE l.tenant_id = c.id) AS load_count,
                COALESCE(
                    (SELECT SUM(i.amount) FROM invoices i
                     WHERE i.tenant_id = c.id AND i.payment_status = 'paid'),
                    0
                ) AS paid_revenue,
                c.created_at
            FROM companies c
            ORDER BY c.created_at DESC
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
