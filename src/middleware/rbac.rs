// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::tenancy::AppRole,
};

/// 1. O Trait que define uma política de acesso por papel
pub trait RolePolicy: Send + Sync + 'static {
    fn allowed() -> &'static [AppRole];
}

/// Super-admin sempre passa; os demais precisam de um papel da lista.
pub fn is_allowed(ctx: &TenantContext, allowed: &[AppRole]) -> bool {
    ctx.is_super_admin || ctx.role.is_some_and(|role| allowed.contains(&role))
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<P>(pub PhantomData<P>);

impl<P, S> FromRequestParts<S> for RequireRole<P>
where
    P: RolePolicy,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_header(
            parts
                .headers
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok()),
        );

        let ctx = parts
            .extensions
            .get::<TenantContext>()
            .ok_or_else(|| AppError::NotProvisioned.to_api_error(&locale, &app_state.i18n_store))?;

        if !is_allowed(ctx, P::allowed()) {
            tracing::warn!(
                "⛔ principal {} com papel {:?} barrado (exige {:?})",
                ctx.principal_id,
                ctx.role,
                P::allowed()
            );
            return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS POLÍTICAS (TIPOS)
// ---

pub struct ManageLoads;
impl RolePolicy for ManageLoads {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin, AppRole::Dispatcher, AppRole::Sales]
    }
}

pub struct ManageTeam;
impl RolePolicy for ManageTeam {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin]
    }
}

pub struct ManageFleet;
impl RolePolicy for ManageFleet {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin, AppRole::Dispatcher]
    }
}

pub struct InviteDrivers;
impl RolePolicy for InviteDrivers {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin, AppRole::Dispatcher, AppRole::Sales]
    }
}

pub struct Treasury;
impl RolePolicy for Treasury {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin, AppRole::Treasury]
    }
}

pub struct Contracts;
impl RolePolicy for Contracts {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin, AppRole::Sales]
    }
}

pub struct SendSms;
impl RolePolicy for SendSms {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin, AppRole::Dispatcher]
    }
}

// Consulta de frota e parceiros (leitura)
pub struct ViewFleet;
impl RolePolicy for ViewFleet {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin, AppRole::Dispatcher, AppRole::Sales, AppRole::Treasury]
    }
}

// Leitura de cargas e documentos (o serviço ainda recorta por papel)
pub struct ViewLoads;
impl RolePolicy for ViewLoads {
    fn allowed() -> &'static [AppRole] {
        &[
            AppRole::Admin,
            AppRole::Dispatcher,
            AppRole::Sales,
            AppRole::Treasury,
            AppRole::Driver,
        ]
    }
}

// Dados e credenciais da empresa
pub struct ManageCompany;
impl RolePolicy for ManageCompany {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::tenancy::TenantScope;
    use uuid::Uuid;

    fn ctx(role: Option<AppRole>, is_super_admin: bool) -> TenantContext {
        TenantContext {
            principal_id: Uuid::new_v4(),
            scope: TenantScope::Tenant(Uuid::new_v4()),
            role,
            is_super_admin,
        }
    }

    #[test]
    fn treasury_cannot_manage_loads() {
        assert!(!is_allowed(&ctx(Some(AppRole::Treasury), false), ManageLoads::allowed()));
        assert!(is_allowed(&ctx(Some(AppRole::Dispatcher), false), ManageLoads::allowed()));
    }

    #[test]
    fn super_admin_passes_every_policy() {
        let admin = ctx(None, true);
        assert!(is_allowed(&admin, ManageTeam::allowed()));
        assert!(is_allowed(&admin, Treasury::allowed()));
    }

    #[test]
    fn carriers_and_brokers_cannot_read_loads() {
        assert!(!is_allowed(&ctx(Some(AppRole::Carrier), false), ViewLoads::allowed()));
        assert!(!is_allowed(&ctx(Some(AppRole::Broker), false), ViewLoads::allowed()));
        assert!(is_allowed(&ctx(Some(AppRole::Driver), false), ViewLoads::allowed()));
    }

    #[test]
    fn only_admins_manage_company_settings() {
        assert!(is_allowed(&ctx(Some(AppRole::Admin), false), ManageCompany::allowed()));
        assert!(!is_allowed(&ctx(Some(AppRole::Treasury), false), ManageCompany::allowed()));
    }

    #[test]
    fn missing_role_is_denied() {
        assert!(!is_allowed(&ctx(None, false), ViewFleet::allowed()));
    }
}
