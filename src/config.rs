// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        DocumentRepository, FleetRepository, InvoiceRepository, LoadRepository, NotificationRepository,
        PartnerRepository, TenantRepository, UserRepository, WipRepository,
    },
    integrations::{
        esign::{EsignSettings, HttpSignatureGateway},
        llm::{HttpLlmGateway, LlmSettings},
        payment::{HttpPaymentGateway, PaymentCredentials},
        sms::{HttpSmsGateway, SmsSettings},
    },
    services::{
        assist_service::AssistService, auth::AuthService, contract_service::ContractService,
        fleet_service::FleetService, invoice_service::InvoiceService, load_service::LoadService,
        location_service::LocationService, notification_service::NotificationService, sms_service::SmsService,
        tenancy_service::TenantService, webhook_service::WebhookService, wip_service::WipService,
    },
};

// ---
// 1. Configurações lidas do ambiente
// ---
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub http_timeout_secs: u64,
    pub app_base_url: String,

    pub payment_api_url: String,
    pub payment_credentials: Option<PaymentCredentials>,
    pub payment_webhook_secret: Option<String>,
    pub payment_currency: String,

    pub esign: EsignSettings,
    pub esign_webhook_secret: Option<String>,
    pub sms: SmsSettings,
    pub llm: LlmSettings,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Monta as configurações a partir de qualquer fonte de variáveis.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        // Valor vazio conta como ausente
        let optional = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &str| optional(name).with_context(|| format!("{} deve ser definida", name));
        let or = |name: &str, default: &str| optional(name).unwrap_or_else(|| default.to_string());

        let payment_credentials = match (optional("PAYMENT_ACCOUNT_ID"), optional("PAYMENT_API_KEY")) {
            (Some(account_id), Some(api_key)) => Some(PaymentCredentials { account_id, api_key }),
            _ => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: or("BIND_ADDR", "0.0.0.0:3000"),
            db_max_connections: parse_or(optional("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            http_timeout_secs: parse_or(optional("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 15)?,
            app_base_url: or("APP_BASE_URL", "http://localhost:5173"),

            payment_api_url: or("PAYMENT_API_URL", "https://api.airwallex.com"),
            payment_credentials,
            payment_webhook_secret: optional("PAYMENT_WEBHOOK_SECRET"),
            payment_currency: or("PAYMENT_CURRENCY", "USD"),

            esign: EsignSettings {
                api_url: optional("ESIGN_API_URL"),
                account_id: optional("ESIGN_ACCOUNT_ID"),
                access_token: optional("ESIGN_ACCESS_TOKEN"),
                template_id: optional("ESIGN_TEMPLATE_ID"),
            },
            esign_webhook_secret: optional("ESIGN_WEBHOOK_SECRET"),
            sms: SmsSettings {
                account_sid: optional("SMS_ACCOUNT_SID"),
                auth_token: optional("SMS_AUTH_TOKEN"),
                from_number: optional("SMS_FROM_NUMBER"),
            },
            llm: LlmSettings {
                api_url: optional("LLM_API_URL"),
                api_key: optional("LLM_API_KEY"),
                model: or("LLM_MODEL", "google/gemini-2.5-flash"),
            },
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &str, default: T) -> anyhow::Result<T> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| anyhow::anyhow!("{} inválida: '{}'", name, value)),
        None => Ok(default),
    }
}

// ---
// 2. O estado compartilhado entre os handlers
// ---
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub load_service: LoadService,
    pub fleet_service: FleetService,
    pub location_service: LocationService,
    pub notification_service: NotificationService,
    pub invoice_service: InvoiceService,
    pub contract_service: ContractService,
    pub webhook_service: WebhookService,
    pub wip_service: WipService,
    pub sms_service: SmsService,
    pub assist_service: AssistService,

    pub payment_webhook_secret: Option<String>,
    pub esign_webhook_secret: Option<String>,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            // Nenhuma variável RLS sobrevive à devolução da conexão
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("RESET ALL").execute(&mut *conn).await?;
                    Ok(true)
                })
            })
            .connect(&settings.database_url)
            .await
            .context("falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::build(settings, db_pool)
    }

    /// Monta o grafo de dependências sobre uma pool já criada.
    pub fn build(settings: &Settings, db_pool: PgPool) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::load()?);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .context("falha ao criar o cliente HTTP")?;

        // --- Gateways externos ---
        let payment_gateway = Arc::new(HttpPaymentGateway::new(
            http_client.clone(),
            settings.payment_api_url.clone(),
        ));
        let signature_gateway = Arc::new(HttpSignatureGateway::new(http_client.clone(), settings.esign.clone()));
        let sms_gateway = Arc::new(HttpSmsGateway::new(http_client.clone(), settings.sms.clone()));
        let llm_gateway = Arc::new(HttpLlmGateway::new(http_client, settings.llm.clone()));

        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let load_repo = LoadRepository::new();
        let fleet_repo = FleetRepository::new();
        let partner_repo = PartnerRepository::new();
        let invoice_repo = InvoiceRepository::new();
        let document_repo = DocumentRepository::new();
        let notification_repo = NotificationRepository::new();
        let wip_repo = WipRepository::new();

        // --- Serviços ---
        let notification_service = NotificationService::new(notification_repo);
        let sms_service = SmsService::new(sms_gateway);

        let auth_service = AuthService::new(user_repo.clone(), settings.jwt_secret.clone(), db_pool.clone());
        let tenant_service = TenantService::new(
            tenant_repo.clone(),
            user_repo,
            fleet_repo.clone(),
            sms_service.clone(),
            settings.app_base_url.clone(),
            db_pool.clone(),
        );
        let load_service = LoadService::new(
            load_repo.clone(),
            fleet_repo.clone(),
            partner_repo.clone(),
            document_repo,
            tenant_repo.clone(),
            notification_service.clone(),
        );
        let fleet_service = FleetService::new(fleet_repo.clone(), partner_repo.clone());
        let location_service = LocationService::new(fleet_repo.clone(), load_repo.clone());
        let invoice_service = InvoiceService::new(
            invoice_repo.clone(),
            load_repo.clone(),
            partner_repo.clone(),
            tenant_repo.clone(),
            payment_gateway,
            settings.payment_credentials.clone(),
            settings.payment_currency.clone(),
            settings.app_base_url.clone(),
        );
        let contract_service = ContractService::new(
            partner_repo.clone(),
            tenant_repo,
            signature_gateway,
            notification_service.clone(),
        );
        let webhook_service = WebhookService::new(
            invoice_repo,
            partner_repo.clone(),
            load_repo.clone(),
            notification_service.clone(),
        );
        let wip_service = WipService::new(
            wip_repo,
            load_repo,
            fleet_repo,
            partner_repo,
            notification_service.clone(),
        );
        let assist_service = AssistService::new(llm_gateway);

        Ok(Self {
            db_pool,
            jwt_secret: settings.jwt_secret.clone(),
            i18n_store,
            auth_service,
            tenant_service,
            load_service,
            fleet_service,
            location_service,
            notification_service,
            invoice_service,
            contract_service,
            webhook_service,
            wip_service,
            sms_service,
            assist_service,
            payment_webhook_secret: settings.payment_webhook_secret.clone(),
            esign_webhook_secret: settings.esign_webhook_secret.clone(),
        })
    }
}
