// src/db/fleet_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::fleet::{Driver, DriverStatus, LocationReport, LocationSample},
};

// Campos gravados de um motorista (já validados)
#[derive(Debug, Clone, PartialEq)]
pub struct DriverRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: DriverStatus,
    pub carrier_id: Option<Uuid>,
}

impl From<&Driver> for DriverRecord {
    fn from(d: &Driver) -> Self {
        Self {
            first_name: d.first_name.clone(),
            last_name: d.last_name.clone(),
            email: d.email.clone(),
            phone: d.phone.clone(),
            license_number: d.license_number.clone(),
            license_expiry: d.license_expiry,
            notes: d.notes.clone(),
            status: d.status,
            carrier_id: d.carrier_id,
        }
    }
}

#[derive(Clone, Default)]
pub struct FleetRepository;

impl FleetRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_driver<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        driver_id: Uuid,
    ) -> Result<Option<Driver>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let driver = sqlx::query_as::<_, Driver>(
            "SELECT * FROM drivers WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)",
        )
        .bind(driver_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(driver)
    }

    /// Registro de motorista do próprio principal (papel `driver`).
    pub async fn find_driver_by_user<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Driver>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let driver = sqlx::query_as::<_, Driver>(
            "SELECT * FROM drivers WHERE tenant_id = $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(driver)
    }

    pub async fn list_drivers<'e, E>(&self, executor: E, tenant_id: Option<Uuid>) -> Result<Vec<Driver>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let drivers = sqlx::query_as::<_, Driver>(
            r#"
            SELECT * FROM drivers
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
            ORDER BY last_name, first_name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(drivers)
    }

    pub async fn insert_driver<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Option<Uuid>,
        record: &DriverRecord,
    ) -> Result<Driver, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let driver = sqlx::query_as::<_, Driver>(
            r#"
            INSERT INTO drivers (
                tenant_id, user_id, carrier_id, first_name, last_name, email, phone,
                license_number, license_expiry, notes, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(record.carrier_id)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.license_number)
        .bind(record.license_expiry)
        .bind(&record.notes)
        .bind(record.status)
        .fetch_one(executor)
        .await?;
        Ok(driver)
    }

    pub async fn update_driver<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        driver_id: Uuid,
        record: &DriverRecord,
    ) -> Result<Driver, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let driver = sqlx::query_as::<_, Driver>(
            r#"
            UPDATE drivers SET
                carrier_id = $3, first_name = $4, last_name = $5, email = $6, phone = $7,
                license_number = $8, license_expiry = $9, notes = $10, status = $11,
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(driver_id)
        .bind(tenant_id)
        .bind(record.carrier_id)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.license_number)
        .bind(record.license_expiry)
        .bind(&record.notes)
        .bind(record.status)
        .fetch_optional(executor)
        .await?;

        driver.ok_or_else(|| AppError::NotFound("Driver".into()))
    }

    pub async fn exists_in_tenant<'e, E>(&self, executor: E, tenant_id: Uuid, driver_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM drivers WHERE id = $1 AND tenant_id = $2)",
        )
        .bind(driver_id)
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    // --- Localização ---

    /// Posição atual (last-write-wins).
    pub async fn update_position<'e, E>(
        &self,
        executor: E,
        driver_id: Uuid,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE drivers
            SET current_lat = $2, current_lng = $3, last_location_at = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(driver_id)
        .bind(latitude)
        .bind(longitude)
        .bind(at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Driver".into()));
        }
        Ok(())
    }

    pub async fn insert_sample<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        report: &LocationReport,
        recorded_at: DateTime<Utc>,
    ) -> Result<LocationSample, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sample = sqlx::query_as::<_, LocationSample>(
            r#"
            INSERT INTO location_samples (
                tenant_id, driver_id, load_id, latitude, longitude, accuracy, heading, speed, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, tenant_id, driver_id, load_id, latitude, longitude, accuracy, heading, speed, recorded_at
            "#,
        )
        .bind(tenant_id)
        .bind(report.driver_id)
        .bind(report.load_id)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(report.accuracy)
        .bind(report.heading)
        .bind(report.speed)
        .bind(recorded_at)
        .fetch_one(executor)
        .await?;
        Ok(sample)
    }

    /// Histórico do mais recente para o mais antigo.
    pub async fn list_samples<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        driver_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LocationSample>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let samples = sqlx::query_as::<_, LocationSample>(
            r#"
            SELECT id, tenant_id, driver_id, load_id, latitude, longitude, accuracy, heading, speed, recorded_at
            FROM location_samples
            WHERE driver_id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)
            ORDER BY recorded_at DESC
            LIMIT $3
            "#,
        )
        .bind(driver_id)
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(samples)
    }
}
