// src/services/fleet_service.rs

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{fleet_repo::DriverRecord, FleetRepository, PartnerRepository},
    middleware::tenancy::TenantContext,
    models::{
        fleet::{Driver, DriverFields, DriverStatus},
        partners::{Broker, BrokerFields, Carrier, CarrierFields},
    },
};

#[derive(Clone)]
pub struct FleetService {
    fleet_repo: FleetRepository,
    partner_repo: PartnerRepository,
}

fn text(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Aplica os campos ao registro. Campo ausente mantém; string vazia limpa.
pub fn merge_driver(base: Option<&Driver>, fields: &DriverFields) -> Result<DriverRecord, AppError> {
    let mut record = match base {
        Some(driver) => DriverRecord::from(driver),
        None => DriverRecord {
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            phone: None,
            license_number: None,
            license_expiry: None,
            notes: None,
            status: DriverStatus::Available,
            carrier_id: None,
        },
    };

    if let Some(v) = &fields.first_name {
        record.first_name = v.trim().to_string();
    }
    if let Some(v) = &fields.last_name {
        record.last_name = v.trim().to_string();
    }
    if fields.email.is_some() {
        record.email = text(&fields.email);
    }
    if fields.phone.is_some() {
        record.phone = text(&fields.phone);
    }
    if fields.license_number.is_some() {
        record.license_number = text(&fields.license_number);
    }
    if fields.license_expiry.is_some() {
        record.license_expiry = fields.license_expiry;
    }
    if fields.notes.is_some() {
        record.notes = text(&fields.notes);
    }
    if let Some(status) = fields.status {
        record.status = status;
    }
    if let Some(raw) = &fields.carrier_id {
        record.carrier_id = match raw.trim() {
            "" => None,
            id => Some(Uuid::parse_str(id).map_err(|_| AppError::invalid_field("carrier_id", "Carrier is not a valid id."))?),
        };
    }

    if record.first_name.is_empty() {
        return Err(AppError::invalid_field("first_name", "First name is required."));
    }
    if record.last_name.is_empty() {
        return Err(AppError::invalid_field("last_name", "Last name is required."));
    }
    Ok(record)
}

fn required_name(name: &Option<String>) -> Result<String, AppError> {
    text(name).ok_or_else(|| AppError::invalid_field("name", "Name is required."))
}

impl FleetService {
    pub fn new(fleet_repo: FleetRepository, partner_repo: PartnerRepository) -> Self {
        Self { fleet_repo, partner_repo }
    }

    // ---
    // MOTORISTAS
    // ---

    async fn check_carrier(&self, conn: &mut PgConnection, tenant_id: Uuid, carrier_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(carrier_id) = carrier_id {
            if self.partner_repo.find_carrier(&mut *conn, Some(tenant_id), carrier_id).await?.is_none() {
                return Err(AppError::NotFound("Carrier".to_string()));
            }
        }
        Ok(())
    }

    pub async fn create_driver(&self, conn: &mut PgConnection, ctx: &TenantContext, fields: &DriverFields) -> Result<Driver, AppError> {
        let tenant_id = ctx.tenant_id()?;
        let record = merge_driver(None, fields)?;
        self.check_carrier(conn, tenant_id, record.carrier_id).await?;

        let driver = self.fleet_repo.insert_driver(&mut *conn, tenant_id, None, &record).await?;
        tracing::info!("🧑‍✈️ Motorista {} cadastrado", driver.id);
        Ok(driver)
    }

    pub async fn update_driver(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        driver_id: Uuid,
        fields: &DriverFields,
    ) -> Result<Driver, AppError> {
        let tenant_id = ctx.tenant_id()?;
        let current = self
            .fleet_repo
            .find_driver(&mut *conn, Some(tenant_id), driver_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Driver".to_string()))?;

        let record = merge_driver(Some(&current), fields)?;
        if record.carrier_id != current.carrier_id {
            self.check_carrier(conn, tenant_id, record.carrier_id).await?;
        }
        self.fleet_repo.update_driver(&mut *conn, tenant_id, driver_id, &record).await
    }

    pub async fn get_driver<'e, E>(&self, executor: E, ctx: &TenantContext, driver_id: Uuid) -> Result<Driver, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.fleet_repo
            .find_driver(executor, ctx.tenant_filter(), driver_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Driver".to_string()))
    }

    pub async fn list_drivers<'e, E>(&self, executor: E, ctx: &TenantContext) -> Result<Vec<Driver>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.fleet_repo.list_drivers(executor, ctx.tenant_filter()).await
    }

    // ---
    // BROKERS
    // ---

    pub async fn create_broker<'e, E>(&self, executor: E, ctx: &TenantContext, fields: &BrokerFields) -> Result<Broker, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant_id = ctx.tenant_id()?;
        let name = required_name(&fields.name)?;
        self.partner_repo.insert_broker(executor, tenant_id, &name, fields).await
    }

    pub async fn update_broker<'e, E>(
        &self,
        executor: E,
        ctx: &TenantContext,
        broker_id: Uuid,
        fields: &BrokerFields,
    ) -> Result<Broker, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant_id = ctx.tenant_id()?;
        self.partner_repo.update_broker(executor, tenant_id, broker_id, fields).await
    }

    pub async fn get_broker<'e, E>(&self, executor: E, ctx: &TenantContext, broker_id: Uuid) -> Result<Broker, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.partner_repo
            .find_broker(executor, ctx.tenant_filter(), broker_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Broker".to_string()))
    }

    pub async fn list_brokers<'e, E>(&self, executor: E, ctx: &TenantContext) -> Result<Vec<Broker>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.partner_repo.list_brokers(executor, ctx.tenant_filter()).await
    }

    // ---
    // CARRIERS
    // ---

    pub async fn create_carrier<'e, E>(&self, executor: E, ctx: &TenantContext, fields: &CarrierFields) -> Result<Carrier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant_id = ctx.tenant_id()?;
        let name = required_name(&fields.name)?;
        self.partner_repo.insert_carrier(executor, tenant_id, &name, fields).await
    }

    pub async fn update_carrier<'e, E>(
        &self,
        executor: E,
        ctx: &TenantContext,
        carrier_id: Uuid,
        fields: &CarrierFields,
    ) -> Result<Carrier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant_id = ctx.tenant_id()?;
        self.partner_repo.update_carrier(executor, tenant_id, carrier_id, fields).await
    }

    pub async fn get_carrier<'e, E>(&self, executor: E, ctx: &TenantContext, carrier_id: Uuid) -> Result<Carrier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.partner_repo
            .find_carrier(executor, ctx.tenant_filter(), carrier_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Carrier".to_string()))
    }

    pub async fn list_carriers<'e, E>(&self, executor: E, ctx: &TenantContext) -> Result<Vec<Carrier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.partner_repo.list_carriers(executor, ctx.tenant_filter()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(first: &str, last: &str) -> DriverFields {
        DriverFields {
            first_name: Some(first.into()),
            last_name: Some(last.into()),
            ..Default::default()
        }
    }

    #[test]
    fn new_driver_starts_available() {
        let record = merge_driver(None, &named("Ana", "Silva")).unwrap();
        assert_eq!(record.status, DriverStatus::Available);
        assert_eq!(record.carrier_id, None);
    }

    #[test]
    fn names_are_required() {
        assert!(matches!(merge_driver(None, &named("Ana", " ")), Err(AppError::ValidationError(_))));
        assert!(matches!(merge_driver(None, &DriverFields::default()), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn blank_carrier_unlinks_and_bad_id_is_rejected() {
        let carrier = Uuid::new_v4();
        let linked = merge_driver(
            None,
            &DriverFields { carrier_id: Some(carrier.to_string()), ..named("Ana", "Silva") },
        )
        .unwrap();
        assert_eq!(linked.carrier_id, Some(carrier));

        let cleared = merge_driver(None, &DriverFields { carrier_id: Some("".into()), ..named("Ana", "Silva") }).unwrap();
        assert_eq!(cleared.carrier_id, None);

        assert!(merge_driver(None, &DriverFields { carrier_id: Some("x".into()), ..named("Ana", "Silva") }).is_err());
    }

    #[test]
    fn partner_name_is_required() {
        assert!(required_name(&Some("  ".into())).is_err());
        assert_eq!(required_name(&Some(" Acme ".into())).unwrap(), "Acme");
    }
}
