// src/services/wip_service.rs

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{FleetRepository, LoadRepository, PartnerRepository, WipRepository},
    middleware::tenancy::TenantContext,
    models::{
        notifications::{NotificationMessage, KIND_WIP_REQUEST},
        tenancy::AppRole,
        wip::{CreateWipPayload, WipAssignment, WipStatus},
    },
    services::notification_service::NotificationService,
};

#[derive(Clone)]
pub struct WipService {
    wip_repo: WipRepository,
    load_repo: LoadRepository,
    fleet_repo: FleetRepository,
    partner_repo: PartnerRepository,
    notification_service: NotificationService,
}

pub fn check_request(payload: &CreateWipPayload) -> Result<(), AppError> {
    if payload.load_id.is_none() && payload.driver_id.is_none() && payload.carrier_id.is_none() {
        return Err(AppError::invalid_field("loadId", "Provide a load, driver or carrier."));
    }
    Ok(())
}

/// Admin (ou super-admin) vê os pedidos da empresa; os demais, só os seus.
pub fn list_scope(ctx: &TenantContext) -> Option<Uuid> {
    if ctx.is_super_admin || ctx.has_role(AppRole::Admin) {
        None
    } else {
        Some(ctx.principal_id)
    }
}

impl WipService {
    pub fn new(
        wip_repo: WipRepository,
        load_repo: LoadRepository,
        fleet_repo: FleetRepository,
        partner_repo: PartnerRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            wip_repo,
            load_repo,
            fleet_repo,
            partner_repo,
            notification_service,
        }
    }

    pub async fn create(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        payload: &CreateWipPayload,
    ) -> Result<WipAssignment, AppError> {
        check_request(payload)?;
        let tenant_id = ctx.tenant_id()?;

        if let Some(load_id) = payload.load_id {
            if !self.load_repo.exists_in_tenant(&mut *conn, tenant_id, load_id).await? {
                return Err(AppError::NotFound("Load".to_string()));
            }
        }
        if let Some(driver_id) = payload.driver_id {
            if !self.fleet_repo.exists_in_tenant(&mut *conn, tenant_id, driver_id).await? {
                return Err(AppError::NotFound("Driver".to_string()));
            }
        }
        if let Some(carrier_id) = payload.carrier_id {
            if self.partner_repo.find_carrier(&mut *conn, Some(tenant_id), carrier_id).await?.is_none() {
                return Err(AppError::NotFound("Carrier".to_string()));
            }
        }

        let wip = self
            .wip_repo
            .insert(&mut *conn, tenant_id, ctx.principal_id, payload)
            .await?;

        let msg = NotificationMessage {
            kind: KIND_WIP_REQUEST,
            title: "New Assignment Request".to_string(),
            message: "A team member requested a new assignment.".to_string(),
            link: Some("/wip".to_string()),
        };
        self.notification_service
            .fan_out_best_effort(conn, tenant_id, &[AppRole::Admin], &msg)
            .await;

        Ok(wip)
    }

    pub async fn list<'e, E>(&self, executor: E, ctx: &TenantContext) -> Result<Vec<WipAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.wip_repo.list(executor, ctx.tenant_filter(), list_scope(ctx)).await
    }

    pub async fn decide(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        wip_id: Uuid,
        approve: bool,
        notes: Option<&str>,
    ) -> Result<WipAssignment, AppError> {
        let tenant_id = ctx.tenant_id()?;
        let current = self
            .wip_repo
            .find(&mut *conn, tenant_id, wip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Assignment request".to_string()))?;

        if current.status != WipStatus::Pending {
            return Err(AppError::AlreadyDecided);
        }

        let status = if approve { WipStatus::Approved } else { WipStatus::Rejected };
        let decided = self
            .wip_repo
            .decide(&mut *conn, tenant_id, wip_id, status, ctx.principal_id, notes)
            .await?
            .ok_or(AppError::AlreadyDecided)?;

        tracing::info!("📋 Pedido {} marcado como {:?} por {}", wip_id, status, ctx.principal_id);
        Ok(decided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::tenancy::TenantScope;

    #[test]
    fn empty_request_is_rejected() {
        let payload = CreateWipPayload { load_id: None, driver_id: None, carrier_id: None, notes: None };
        assert!(matches!(check_request(&payload), Err(AppError::ValidationError(_))));

        let payload = CreateWipPayload { load_id: Some(Uuid::new_v4()), ..payload };
        assert!(check_request(&payload).is_ok());
    }

    #[test]
    fn only_admins_see_everyone_s_requests() {
        let mut ctx = TenantContext {
            principal_id: Uuid::new_v4(),
            scope: TenantScope::Tenant(Uuid::new_v4()),
            role: Some(AppRole::Admin),
            is_super_admin: false,
        };
        assert_eq!(list_scope(&ctx), None);

        ctx.role = Some(AppRole::Dispatcher);
        assert_eq!(list_scope(&ctx), Some(ctx.principal_id));
    }
}
