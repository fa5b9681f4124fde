//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod integrations;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/accept-invite", post(handlers::auth::accept_invite));

    // Só JWT: perfil e onboarding (ainda sem empresa)
    let user_routes = Router::new()
        .route("/users/me", get(handlers::auth::get_me))
        .route("/companies", post(handlers::tenancy::create_company))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // JWT + Tenant Resolver
    let tenant_routes = Router::new()
        .route("/me/navigation", get(handlers::navigation::get_navigation))
        .route("/team", get(handlers::tenancy::list_team))
        .route("/team/invite", post(handlers::tenancy::invite_team_member))
        .route("/admin/companies", get(handlers::tenancy::list_companies))
        .route("/company/settings", patch(handlers::tenancy::update_company_settings))
        // Cargas
        .route(
            "/loads",
            post(handlers::loads::create_load).get(handlers::loads::list_loads),
        )
        .route(
            "/loads/{load_id}",
            get(handlers::loads::get_load).patch(handlers::loads::update_load),
        )
        .route("/loads/{load_id}/status", post(handlers::loads::transition_load))
        .route("/loads/{load_id}/accept", post(handlers::loads::accept_load))
        .route("/loads/{load_id}/reject", post(handlers::loads::reject_load))
        .route(
            "/loads/{load_id}/documents",
            post(handlers::documents::attach_document).get(handlers::documents::list_documents),
        )
        // Frota e localização
        .route(
            "/drivers",
            post(handlers::fleet::create_driver).get(handlers::fleet::list_drivers),
        )
        .route("/drivers/invite", post(handlers::tenancy::invite_driver))
        .route("/drivers/location", post(handlers::fleet::report_location))
        .route("/drivers/positions", get(handlers::fleet::driver_positions))
        .route(
            "/drivers/{driver_id}",
            get(handlers::fleet::get_driver).patch(handlers::fleet::update_driver),
        )
        .route("/drivers/{driver_id}/locations", get(handlers::fleet::location_history))
        // Parceiros
        .route(
            "/brokers",
            post(handlers::partners::create_broker).get(handlers::partners::list_brokers),
        )
        .route(
            "/brokers/{broker_id}",
            get(handlers::partners::get_broker).patch(handlers::partners::update_broker),
        )
        .route(
            "/carriers",
            post(handlers::partners::create_carrier).get(handlers::partners::list_carriers),
        )
        .route(
            "/carriers/{carrier_id}",
            get(handlers::partners::get_carrier).patch(handlers::partners::update_carrier),
        )
        .route("/carriers/{carrier_id}/contract", post(handlers::partners::send_contract))
        // Faturas
        .route(
            "/invoices",
            post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
        )
        .route("/invoices/{invoice_id}", get(handlers::invoices::get_invoice))
        .route("/invoices/{invoice_id}/status", patch(handlers::invoices::update_invoice_status))
        .route("/invoices/{invoice_id}/payment-link", post(handlers::invoices::ensure_payment_link))
        // Notificações
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route("/notifications/read-all", post(handlers::notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", post(handlers::notifications::mark_read))
        // WIP
        .route("/wip", post(handlers::wip::create_wip).get(handlers::wip::list_wip))
        .route("/wip/{wip_id}/approve", post(handlers::wip::approve_wip))
        .route("/wip/{wip_id}/reject", post(handlers::wip::reject_wip))
        // Mensagens
        .route("/sms", post(handlers::assist::send_sms))
        .route("/assist", post(handlers::assist::assist))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    // Públicas, verificadas por assinatura
    let webhook_routes = Router::new()
        .route("/payments", post(handlers::webhooks::payment_webhook))
        .route("/esign", post(handlers::webhooks::esign_webhook));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/webhooks", webhook_routes)
        .nest("/api", user_routes.merge(tenant_routes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = build_router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    // Pool preguiçosa: nenhum destes caminhos chega ao banco
    fn app(extra: &[(&str, &str)]) -> Router {
        let mut vars = vec![
            ("DATABASE_URL", "postgres://localhost/dispatch_test"),
            ("JWT_SECRET", "test-secret"),
        ];
        vars.extend_from_slice(extra);
        let settings = Settings::from_lookup(|name| {
            vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
        })
        .unwrap();
        let pool = PgPoolOptions::new().connect_lazy(&settings.database_url).unwrap();
        build_router(AppState::build(&settings, pool).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app(&[])
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tenant_routes_require_a_bearer_token() {
        let response = app(&[])
            .oneshot(Request::get("/api/loads").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_before_any_query() {
        let response = app(&[])
            .oneshot(
                Request::get("/api/users/me")
                    .header("authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsigned_payment_webhook_is_rejected_when_secret_is_set() {
        let response = app(&[("PAYMENT_WEBHOOK_SECRET", "whsec")])
            .oneshot(
                Request::post("/api/webhooks/payments")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"event_type":"payment.succeeded","data":{"id":"p1"}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn esign_webhook_with_wrong_signature_is_rejected() {
        let response = app(&[("ESIGN_WEBHOOK_SECRET", "whsec")])
            .oneshot(
                Request::post("/api/webhooks/esign")
                    .header("x-esign-signature", "bm9wZQ==")
                    .body(Body::from(r#"{"event":"envelope-completed","data":{"envelopeId":"e1"}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_webhook_body_is_a_bad_request() {
        let response = app(&[])
            .oneshot(
                Request::post("/api/webhooks/payments")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["details"]["body"].is_array());
    }

    #[tokio::test]
    async fn register_validates_before_touching_storage() {
        let response = app(&[])
            .oneshot(
                Request::post("/api/auth/register")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"email":"not-an-email","password":"123"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["details"]["email"].is_array());
        assert!(body["details"]["password"].is_array());
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = app(&[])
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/api/loads/{load_id}/status"].is_object());
    }
}
