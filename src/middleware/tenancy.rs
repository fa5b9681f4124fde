// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::tenancy::AppRole,
};

// Cabeçalho usado pelo super-admin para agir dentro de uma empresa
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    Tenant(Uuid),
    // Super-admin sem empresa selecionada: leituras sem filtro
    Global,
}

/// Resultado do Tenant Resolver, anexado à requisição pelo `tenant_guard`.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub principal_id: Uuid,
    pub scope: TenantScope,
    pub role: Option<AppRole>,
    pub is_super_admin: bool,
}

impl TenantContext {
    /// Empresa concreta para escritas. Super-admin em escopo global precisa
    /// escolher uma via X-Tenant-ID.
    pub fn tenant_id(&self) -> Result<Uuid, AppError> {
        match self.scope {
            TenantScope::Tenant(id) => Ok(id),
            TenantScope::Global => Err(AppError::TenantRequired),
        }
    }

    /// Filtro para consultas: `None` = todas as empresas.
    pub fn tenant_filter(&self) -> Option<Uuid> {
        match self.scope {
            TenantScope::Tenant(id) => Some(id),
            TenantScope::Global => None,
        }
    }

    pub fn has_role(&self, role: AppRole) -> bool {
        self.role == Some(role)
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(ctx.clone());
        }

        // Rota montada sem o tenant_guard
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_header(
            parts
                .headers
                .get(axum::http::header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok()),
        );
        Err(AppError::NotProvisioned.to_api_error(&locale, &app_state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(scope: TenantScope) -> TenantContext {
        TenantContext {
            principal_id: Uuid::new_v4(),
            scope,
            role: None,
            is_super_admin: matches!(scope, TenantScope::Global),
        }
    }

    #[test]
    fn global_scope_requires_explicit_tenant_for_writes() {
        assert!(matches!(ctx(TenantScope::Global).tenant_id(), Err(AppError::TenantRequired)));
        assert_eq!(ctx(TenantScope::Global).tenant_filter(), None);
    }

    #[test]
    fn tenant_scope_exposes_its_id() {
        let id = Uuid::new_v4();
        assert_eq!(ctx(TenantScope::Tenant(id)).tenant_id().unwrap(), id);
        assert_eq!(ctx(TenantScope::Tenant(id)).tenant_filter(), Some(id));
    }
}
