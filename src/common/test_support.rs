// src/common/test_support.rs

// Sementes dos testes com banco (`#[sqlx::test]`). As tabelas com RLS são
// escritas por uma conexão de serviço.

use sqlx::{pool::PoolConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::db_utils::get_service_connection,
    middleware::tenancy::{TenantContext, TenantScope},
    models::tenancy::AppRole,
};

pub async fn service_conn(pool: &PgPool) -> PoolConnection<Postgres> {
    get_service_connection(pool).await.unwrap()
}

pub fn member_ctx(user_id: Uuid, tenant_id: Uuid, role: AppRole) -> TenantContext {
    TenantContext {
        principal_id: user_id,
        scope: TenantScope::Tenant(tenant_id),
        role: Some(role),
        is_super_admin: false,
    }
}

pub async fn seed_company(pool: &PgPool) -> Uuid {
    sqlx::query_scalar("INSERT INTO companies (name) VALUES ('Acme Freight LLC') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Usuário com perfil e papel na empresa.
pub async fn seed_member(pool: &PgPool, tenant_id: Uuid, role: AppRole) -> Uuid {
    let email = format!("{}@acmefreight.test", Uuid::new_v4().simple());
    let user_id: Uuid = sqlx::query_scalar("INSERT INTO users (email, password_hash) VALUES ($1, 'x') RETURNING id")
        .bind(&email)
        .fetch_one(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO profiles (id, tenant_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(tenant_id)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO user_roles (user_id, tenant_id, role) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(tenant_id)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();

    user_id
}

pub async fn seed_driver(pool: &PgPool, tenant_id: Uuid, user_id: Option<Uuid>) -> Uuid {
    let mut conn = service_conn(pool).await;
    sqlx::query_scalar(
        "INSERT INTO drivers (tenant_id, user_id, first_name, last_name) VALUES ($1, $2, 'Dana', 'Reyes') RETURNING id",
    )
    .bind(tenant_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
}

/// Transportadora com envelope enviado e contrato pendente.
pub async fn seed_carrier(pool: &PgPool, tenant_id: Uuid, envelope_id: &str) -> Uuid {
    let mut conn = service_conn(pool).await;
    sqlx::query_scalar(
        r#"
        INSERT INTO carriers (tenant_id, name, envelope_id, signature_status)
        VALUES ($1, 'Road Runner LLC', $2, 'sent')
        RETURNING id
        "#,
    )
    .bind(tenant_id)
    .bind(envelope_id)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
}

/// Carga pendente. Com transportadora, a venda aguarda o contrato.
pub async fn seed_load(pool: &PgPool, tenant_id: Uuid, carrier_id: Option<Uuid>, created_by: Option<Uuid>) -> Uuid {
    let mut conn = service_conn(pool).await;
    sqlx::query_scalar(
        r#"
        INSERT INTO loads (
            tenant_id, load_number, pickup_location, pickup_city, pickup_state,
            delivery_location, delivery_city, delivery_state, carrier_id, sale_status, created_by
        )
        VALUES (
            $1, $2, '100 Main St', 'Dallas', 'TX', '9 Harbor Rd', 'Houston', 'TX', $3,
            CASE WHEN $3::uuid IS NULL THEN NULL ELSE 'pending_activation'::sale_status END, $4
        )
        RETURNING id
        "#,
    )
    .bind(tenant_id)
    .bind(format!("LD-{}", &Uuid::new_v4().simple().to_string()[..8]))
    .bind(carrier_id)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
}

pub async fn seed_invoice(pool: &PgPool, tenant_id: Uuid, payment_link_id: Option<&str>) -> Uuid {
    let mut conn = service_conn(pool).await;
    sqlx::query_scalar(
        r#"
        INSERT INTO invoices (tenant_id, invoice_number, amount, due_date, payment_link_id)
        VALUES ($1, $2, 2450.00, CURRENT_DATE + 30, $3)
        RETURNING id
        "#,
    )
    .bind(tenant_id)
    .bind(format!("INV-{}", &Uuid::new_v4().simple().to_string()[..8]))
    .bind(payment_link_id)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
}

pub async fn count(pool: &PgPool, sql: &str, id: Uuid) -> i64 {
    let mut conn = service_conn(pool).await;
    sqlx::query_scalar(sql).bind(id).fetch_one(&mut *conn).await.unwrap()
}
