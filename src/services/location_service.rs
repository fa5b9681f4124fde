// src/services/location_service.rs

use chrono::{DateTime, Utc};
use sqlx::{Connection, PgConnection};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{FleetRepository, LoadRepository},
    middleware::tenancy::TenantContext,
    models::{
        fleet::{DriverPosition, GpsStatus, LocationAccepted, LocationReport, LocationSample},
        tenancy::AppRole,
    },
};

const ACTIVE_MINUTES: i64 = 5;
const IDLE_MINUTES: i64 = 30;
const DEFAULT_HISTORY: i64 = 100;
const MAX_HISTORY: i64 = 1000;

/// Frescor da última posição: < 5 min ativo, < 30 min parado, senão offline.
pub fn gps_status(last_update: Option<DateTime<Utc>>, now: DateTime<Utc>) -> GpsStatus {
    let Some(last) = last_update else {
        return GpsStatus::Offline;
    };
    let minutes = (now - last).num_seconds().div_euclid(60);
    if minutes < ACTIVE_MINUTES {
        GpsStatus::Active
    } else if minutes < IDLE_MINUTES {
        GpsStatus::Idle
    } else {
        GpsStatus::Offline
    }
}

#[derive(Clone)]
pub struct LocationService {
    fleet_repo: FleetRepository,
    load_repo: LoadRepository,
}

impl LocationService {
    pub fn new(fleet_repo: FleetRepository, load_repo: LoadRepository) -> Self {
        Self { fleet_repo, load_repo }
    }

    /// Grava posição atual e histórico numa única transação, com o mesmo
    /// carimbo de tempo do servidor.
    pub async fn ingest(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        report: &LocationReport,
    ) -> Result<LocationAccepted, AppError> {
        let driver = self
            .fleet_repo
            .find_driver(&mut *conn, ctx.tenant_filter(), report.driver_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Driver".to_string()))?;

        if driver.user_id != Some(ctx.principal_id) {
            tracing::warn!("⛔ {} tentou reportar posição do motorista {}", ctx.principal_id, driver.id);
            return Err(AppError::Unauthorized);
        }

        if let Some(load_id) = report.load_id {
            if !self.load_repo.exists_in_tenant(&mut *conn, driver.tenant_id, load_id).await? {
                return Err(AppError::NotFound("Load".to_string()));
            }
        }

        let recorded_at = Utc::now();
        let mut tx = conn.begin().await?;

        self.fleet_repo
            .update_position(&mut *tx, driver.id, report.latitude, report.longitude, recorded_at)
            .await?;
        self.fleet_repo
            .insert_sample(&mut *tx, driver.tenant_id, report, recorded_at)
            .await?;

        tx.commit().await?;

        tracing::debug!("📍 Posição do motorista {} registrada", driver.id);
        Ok(LocationAccepted {
            success: true,
            recorded_at,
        })
    }

    pub async fn history(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        driver_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<LocationSample>, AppError> {
        let driver = self
            .fleet_repo
            .find_driver(&mut *conn, ctx.tenant_filter(), driver_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Driver".to_string()))?;

        // Motorista só consulta o próprio histórico
        if ctx.has_role(AppRole::Driver) && !ctx.is_super_admin && driver.user_id != Some(ctx.principal_id) {
            return Err(AppError::Forbidden);
        }

        let limit = limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);
        self.fleet_repo
            .list_samples(&mut *conn, ctx.tenant_filter(), driver.id, limit)
            .await
    }

    pub async fn positions(&self, conn: &mut PgConnection, ctx: &TenantContext) -> Result<Vec<DriverPosition>, AppError> {
        let now = Utc::now();
        let drivers = self.fleet_repo.list_drivers(&mut *conn, ctx.tenant_filter()).await?;

        Ok(drivers
            .into_iter()
            .map(|d| DriverPosition {
                driver_id: d.id,
                name: format!("{} {}", d.first_name, d.last_name).trim().to_string(),
                status: d.status,
                latitude: d.current_lat,
                longitude: d.current_lng,
                last_location_at: d.last_location_at,
                gps_status: gps_status(d.last_location_at, now),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use validator::Validate;

    fn at(now: DateTime<Utc>, seconds_ago: i64) -> Option<DateTime<Utc>> {
        Some(now - Duration::seconds(seconds_ago))
    }

    #[test]
    fn never_reported_is_offline() {
        assert_eq!(gps_status(None, Utc::now()), GpsStatus::Offline);
    }

    #[test]
    fn bucket_boundaries_use_whole_minutes() {
        let now = Utc::now();
        assert_eq!(gps_status(at(now, 0), now), GpsStatus::Active);
        assert_eq!(gps_status(at(now, 4 * 60 + 59), now), GpsStatus::Active);
        assert_eq!(gps_status(at(now, 5 * 60), now), GpsStatus::Idle);
        assert_eq!(gps_status(at(now, 29 * 60 + 59), now), GpsStatus::Idle);
        assert_eq!(gps_status(at(now, 30 * 60), now), GpsStatus::Offline);
        assert_eq!(gps_status(at(now, 3 * 3600), now), GpsStatus::Offline);
    }

    fn report(latitude: f64, longitude: f64) -> LocationReport {
        LocationReport {
            driver_id: Uuid::new_v4(),
            latitude,
            longitude,
            accuracy: None,
            heading: None,
            speed: None,
            load_id: None,
        }
    }

    #[test]
    fn coordinates_outside_the_globe_are_invalid() {
        assert!(report(90.0, -180.0).validate().is_ok());
        assert!(report(90.5, 0.0).validate().is_err());
        assert!(report(0.0, 180.01).validate().is_err());
        assert!(report(-91.0, 0.0).validate().is_err());
    }

    #[test]
    fn negative_accuracy_is_invalid() {
        let mut r = report(10.0, 10.0);
        r.accuracy = Some(-1.0);
        assert!(r.validate().is_err());
    }

    // ---
    // Com banco
    // ---

    use crate::common::test_support::{count, member_ctx, seed_company, seed_driver, seed_member, service_conn};
    use sqlx::PgPool;

    fn service() -> LocationService {
        LocationService::new(FleetRepository::new(), LoadRepository::new())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn every_report_becomes_a_sample_and_moves_the_driver(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let user = seed_member(&pool, tenant, AppRole::Driver).await;
        let driver_id = seed_driver(&pool, tenant, Some(user)).await;
        let ctx = member_ctx(user, tenant, AppRole::Driver);
        let svc = service();
        let mut conn = service_conn(&pool).await;

        for (lat, lng) in [(32.77, -96.79), (31.55, -96.10), (29.76, -95.36)] {
            let report = LocationReport { driver_id, ..report(lat, lng) };
            assert!(svc.ingest(&mut *conn, &ctx, &report).await.unwrap().success);
        }

        let samples = count(&pool, "SELECT COUNT(*) FROM location_samples WHERE driver_id = $1", driver_id).await;
        assert_eq!(samples, 3);

        let positions = svc.positions(&mut *conn, &ctx).await.unwrap();
        let position = positions.iter().find(|p| p.driver_id == driver_id).unwrap();
        assert_eq!(position.latitude, Some(29.76));
        assert_eq!(position.gps_status, GpsStatus::Active);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_the_linked_user_reports_for_a_driver(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let owner = seed_member(&pool, tenant, AppRole::Driver).await;
        let other = seed_member(&pool, tenant, AppRole::Driver).await;
        let driver_id = seed_driver(&pool, tenant, Some(owner)).await;
        let mut conn = service_conn(&pool).await;

        let report = LocationReport { driver_id, ..report(32.77, -96.79) };
        let result = service()
            .ingest(&mut *conn, &member_ctx(other, tenant, AppRole::Driver), &report)
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM location_samples WHERE driver_id = $1", driver_id).await, 0);
    }
}
