// src/handlers/navigation.rs

use axum::Json;

use crate::{
    middleware::tenancy::TenantContext,
    models::navigation::NavigationResponse,
    services::navigation::navigation_for,
};

// GET /api/me/navigation
#[utoipa::path(
    get,
    path = "/api/me/navigation",
    tag = "Users",
    responses(
        (status = 200, description = "Menu e rota inicial do papel atual", body = NavigationResponse),
        (status = 409, description = "Usuário sem empresa (redirecionar para /onboarding)")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_navigation(tenant: TenantContext) -> Json<NavigationResponse> {
    Json(navigation_for(tenant.role, tenant.is_super_admin))
}
