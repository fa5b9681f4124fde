// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TENANT_ID_HEADER},
    models::auth::User,
};

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

// O Body não é Sync: o token é copiado antes de qualquer `.await`.
fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

async fn authenticate(app_state: &AppState, token: Option<String>) -> Result<User, AppError> {
    let token = token.ok_or(AppError::InvalidToken)?;
    app_state.auth_service.validate_token(&token).await
}

/// Exige um JWT válido. Usado nas rotas que não dependem de empresa
/// (perfil, onboarding).
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&app_state, bearer_token(&request))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// JWT + Tenant Resolver: anexa o `TenantContext` do principal.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let user = authenticate(&app_state, bearer_token(&request))
        .await
        .map_err(to_api)?;

    let requested_tenant = match request.headers().get(TENANT_ID_HEADER) {
        Some(value) => {
            let parsed = value
                .to_str()
                .ok()
                .and_then(|s| Uuid::parse_str(s.trim()).ok())
                .ok_or_else(|| AppError::NotFound("Company".into()))
                .map_err(to_api)?;
            Some(parsed)
        }
        None => None,
    };

    let ctx = app_state
        .tenant_service
        .resolve(user.id, requested_tenant)
        .await
        .map_err(to_api)?;

    tracing::debug!(
        "👤 principal {} resolvido: escopo {:?}, papel {:?}",
        ctx.principal_id,
        ctx.scope,
        ctx.role
    );

    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        let locale = Locale::from_header(
            parts
                .headers
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok()),
        );
        Err(AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))
    }
}
