// src/services/invoice_service.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InvoiceRepository, LoadRepository, PartnerRepository, TenantRepository},
    integrations::{
        not_configured,
        payment::{PaymentCredentials, PaymentGateway, PaymentLinkRequest},
    },
    middleware::tenancy::TenantContext,
    models::{
        invoices::{CreateInvoicePayload, Invoice, InvoiceStatus, MintedLink, PaymentLinkResponse, PaymentStatus},
        tenancy::Company,
    },
};

const LINK_TTL_HOURS: i64 = 24;

// Resultado da decisão sobre o link de pagamento
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    AlreadyPaid,
    Reuse(PaymentLinkResponse),
    Mint,
}

/// Pago -> recusa; link válido -> reaproveita; senão cria um novo.
pub fn payment_link_decision(invoice: &Invoice, now: DateTime<Utc>) -> LinkDecision {
    if invoice.payment_status == PaymentStatus::Paid {
        return LinkDecision::AlreadyPaid;
    }
    match PaymentLinkResponse::from_invoice(invoice, true) {
        Some(link) if link.expires_at > now => LinkDecision::Reuse(link),
        _ => LinkDecision::Mint,
    }
}

/// Credenciais da empresa quando completas; senão as globais.
pub fn resolve_credentials(company: Option<&Company>, global: Option<&PaymentCredentials>) -> Option<PaymentCredentials> {
    let own = company.and_then(|c| match (&c.payment_account_id, &c.payment_api_key) {
        (Some(account_id), Some(api_key)) if !account_id.is_empty() && !api_key.is_empty() => Some(PaymentCredentials {
            account_id: account_id.clone(),
            api_key: api_key.clone(),
        }),
        _ => None,
    });
    own.or_else(|| global.cloned())
}

/// Uma autenticação e uma criação de link. Sem novas tentativas.
pub async fn mint_link(
    gateway: &dyn PaymentGateway,
    credentials: &PaymentCredentials,
    request: &PaymentLinkRequest,
) -> Result<MintedLink, AppError> {
    let access_token = gateway.authenticate(credentials).await?;
    gateway.create_payment_link(&access_token, request).await
}

#[derive(Clone)]
pub struct InvoiceService {
    invoice_repo: InvoiceRepository,
    load_repo: LoadRepository,
    partner_repo: PartnerRepository,
    tenant_repo: TenantRepository,
    gateway: Arc<dyn PaymentGateway>,
    global_credentials: Option<PaymentCredentials>,
    currency: String,
    app_base_url: String,
}

impl InvoiceService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_repo: InvoiceRepository,
        load_repo: LoadRepository,
        partner_repo: PartnerRepository,
        tenant_repo: TenantRepository,
        gateway: Arc<dyn PaymentGateway>,
        global_credentials: Option<PaymentCredentials>,
        currency: String,
        app_base_url: String,
    ) -> Self {
        Self {
            invoice_repo,
            load_repo,
            partner_repo,
            tenant_repo,
            gateway,
            global_credentials,
            currency,
            app_base_url,
        }
    }

    pub async fn create(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        payload: &CreateInvoicePayload,
    ) -> Result<Invoice, AppError> {
        let tenant_id = ctx.tenant_id()?;

        if let Some(load_id) = payload.load_id {
            if !self.load_repo.exists_in_tenant(&mut *conn, tenant_id, load_id).await? {
                return Err(AppError::NotFound("Load".to_string()));
            }
        }
        if let Some(broker_id) = payload.broker_id {
            if !self.partner_repo.exists_broker(&mut *conn, tenant_id, broker_id).await? {
                return Err(AppError::NotFound("Broker".to_string()));
            }
        }

        let invoice = self
            .invoice_repo
            .insert(&mut *conn, tenant_id, ctx.principal_id, payload)
            .await?;
        tracing::info!("🧾 Fatura {} criada ({})", invoice.invoice_number, invoice.id);
        Ok(invoice)
    }

    pub async fn list<'e, E>(&self, executor: E, ctx: &TenantContext) -> Result<Vec<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.invoice_repo.list(executor, ctx.tenant_filter()).await
    }

    pub async fn get<'e, E>(&self, executor: E, ctx: &TenantContext, invoice_id: Uuid) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.invoice_repo
            .find(executor, ctx.tenant_filter(), invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Invoice".to_string()))
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        ctx: &TenantContext,
        invoice_id: Uuid,
        status: InvoiceStatus,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant_id = ctx.tenant_id()?;
        self.invoice_repo.update_status(executor, tenant_id, invoice_id, status).await
    }

    /// Link de pagamento idempotente: nunca cobra uma fatura paga e não cria
    /// um segundo link enquanto o atual vale.
    pub async fn ensure_payment_link(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        invoice_id: Uuid,
    ) -> Result<PaymentLinkResponse, AppError> {
        let tenant_id = ctx.tenant_id()?;
        let invoice = self
            .invoice_repo
            .find(&mut *conn, Some(tenant_id), invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        match payment_link_decision(&invoice, Utc::now()) {
            LinkDecision::AlreadyPaid => Err(AppError::AlreadyPaid),
            LinkDecision::Reuse(link) => Ok(link),
            LinkDecision::Mint => {
                let company = self.tenant_repo.find_company(&mut *conn, tenant_id).await?;
                let credentials = resolve_credentials(company.as_ref(), self.global_credentials.as_ref())
                    .ok_or_else(|| not_configured("payment gateway"))?;

                let request = PaymentLinkRequest {
                    amount: invoice.amount,
                    currency: self.currency.clone(),
                    merchant_order_id: invoice.invoice_number.clone(),
                    description: format!("Invoice {}", invoice.invoice_number),
                    return_url: format!("{}/invoices", self.app_base_url.trim_end_matches('/')),
                };

                tracing::info!("💳 Criando link de pagamento para a fatura {}", invoice.invoice_number);
                let link = mint_link(self.gateway.as_ref(), &credentials, &request).await?;

                let now = Utc::now();
                let expires_at = now + Duration::hours(LINK_TTL_HOURS);
                let stored = self
                    .invoice_repo
                    .store_payment_link(&mut *conn, invoice.id, &link.id, &link.url, now, expires_at)
                    .await?;

                // Devolve o que foi gravado: a próxima chamada lê exatamente isto
                PaymentLinkResponse::from_invoice(&stored, false)
                    .ok_or_else(|| anyhow::anyhow!("link da fatura {} não foi persistido", stored.id).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn invoice() -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            load_id: None,
            broker_id: None,
            invoice_number: "INV-1001".into(),
            amount: Decimal::new(245000, 2),
            invoice_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            status: InvoiceStatus::Draft,
            notes: None,
            payment_link_id: None,
            payment_link_url: None,
            payment_link_created_at: None,
            payment_link_expires_at: None,
            payment_intent_id: None,
            payment_status: PaymentStatus::Unpaid,
            payment_date: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn with_link(expires_at: DateTime<Utc>) -> Invoice {
        Invoice {
            payment_link_id: Some("plk_1".into()),
            payment_link_url: Some("https://pay.example.com/plk_1".into()),
            payment_link_expires_at: Some(expires_at),
            payment_status: PaymentStatus::Pending,
            ..invoice()
        }
    }

    #[test]
    fn paid_invoice_is_never_charged_again() {
        let mut inv = with_link(Utc::now() + Duration::hours(5));
        inv.payment_status = PaymentStatus::Paid;
        assert_eq!(payment_link_decision(&inv, Utc::now()), LinkDecision::AlreadyPaid);
    }

    #[test]
    fn live_link_is_reused() {
        let now = Utc::now();
        let expires_at = now + Duration::hours(3);
        assert_eq!(
            payment_link_decision(&with_link(expires_at), now),
            LinkDecision::Reuse(PaymentLinkResponse {
                payment_link_id: "plk_1".into(),
                payment_link_url: "https://pay.example.com/plk_1".into(),
                expires_at,
                is_existing: true,
            })
        );
    }

    #[test]
    fn expired_or_missing_link_is_minted() {
        let now = Utc::now();
        assert_eq!(payment_link_decision(&with_link(now), now), LinkDecision::Mint);
        assert_eq!(payment_link_decision(&with_link(now - Duration::minutes(1)), now), LinkDecision::Mint);
        assert_eq!(payment_link_decision(&invoice(), now), LinkDecision::Mint);
    }

    fn company(account: Option<&str>, key: Option<&str>) -> Company {
        Company {
            id: Uuid::new_v4(),
            name: "Acme Freight".into(),
            email: None,
            phone: None,
            address: None,
            payment_account_id: account.map(String::from),
            payment_api_key: key.map(String::from),
            esign_enabled: false,
            subscription_status: "active".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn company_credentials_win_only_when_complete() {
        let global = PaymentCredentials { account_id: "global".into(), api_key: "gk".into() };

        let own = resolve_credentials(Some(&company(Some("acct"), Some("key"))), Some(&global)).unwrap();
        assert_eq!(own.account_id, "acct");

        let half = resolve_credentials(Some(&company(Some("acct"), None)), Some(&global)).unwrap();
        assert_eq!(half, global);

        assert!(resolve_credentials(Some(&company(None, None)), None).is_none());
    }

    struct CountingGateway {
        logins: AtomicUsize,
        links: AtomicUsize,
    }

    #[async_trait]
    impl PaymentGateway for CountingGateway {
        async fn authenticate(&self, credentials: &PaymentCredentials) -> Result<String, AppError> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-for-{}", credentials.account_id))
        }

        async fn create_payment_link(&self, access_token: &str, request: &PaymentLinkRequest) -> Result<MintedLink, AppError> {
            self.links.fetch_add(1, Ordering::SeqCst);
            assert_eq!(access_token, "token-for-acct");
            Ok(MintedLink {
                id: format!("plk_{}", request.merchant_order_id),
                url: "https://pay.example.com/new".into(),
            })
        }
    }

    #[tokio::test]
    async fn minting_authenticates_once_and_creates_one_link() {
        let gateway = CountingGateway { logins: AtomicUsize::new(0), links: AtomicUsize::new(0) };
        let credentials = PaymentCredentials { account_id: "acct".into(), api_key: "key".into() };
        let request = PaymentLinkRequest {
            amount: Decimal::new(245000, 2),
            currency: "USD".into(),
            merchant_order_id: "INV-1001".into(),
            description: "Invoice INV-1001".into(),
            return_url: "https://app.example.com/invoices".into(),
        };

        let link = mint_link(&gateway, &credentials, &request).await.unwrap();

        assert_eq!(link.id, "plk_INV-1001");
        assert_eq!(gateway.logins.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.links.load(Ordering::SeqCst), 1);
    }

    // ---
    // Com banco
    // ---

    use crate::{
        common::test_support::{member_ctx, seed_company, seed_invoice, seed_member, service_conn},
        models::tenancy::AppRole,
    };
    use sqlx::PgPool;

    fn service(pool: &PgPool, gateway: Arc<CountingGateway>) -> InvoiceService {
        InvoiceService::new(
            InvoiceRepository::new(),
            LoadRepository::new(),
            PartnerRepository::new(),
            TenantRepository::new(pool.clone()),
            gateway,
            Some(PaymentCredentials { account_id: "acct".into(), api_key: "key".into() }),
            "USD".into(),
            "https://app.example.com".into(),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_request_returns_the_stored_link_without_minting(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let treasury = seed_member(&pool, tenant, AppRole::Treasury).await;
        let invoice_id = seed_invoice(&pool, tenant, None).await;
        let ctx = member_ctx(treasury, tenant, AppRole::Treasury);

        let gateway = Arc::new(CountingGateway { logins: AtomicUsize::new(0), links: AtomicUsize::new(0) });
        let svc = service(&pool, gateway.clone());
        let mut conn = service_conn(&pool).await;

        let minted = svc.ensure_payment_link(&mut *conn, &ctx, invoice_id).await.unwrap();
        let reused = svc.ensure_payment_link(&mut *conn, &ctx, invoice_id).await.unwrap();

        assert!(!minted.is_existing);
        assert!(reused.is_existing);
        assert!(minted.payment_link_id.starts_with("plk_INV-"));
        assert_eq!(reused.payment_link_id, minted.payment_link_id);
        assert_eq!(reused.payment_link_url, minted.payment_link_url);
        assert_eq!(reused.expires_at, minted.expires_at);
        assert_eq!(gateway.links.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.logins.load(Ordering::SeqCst), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn paid_invoice_gets_no_link(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let treasury = seed_member(&pool, tenant, AppRole::Treasury).await;
        let invoice_id = seed_invoice(&pool, tenant, None).await;
        let ctx = member_ctx(treasury, tenant, AppRole::Treasury);
        let mut conn = service_conn(&pool).await;

        InvoiceRepository::new()
            .mark_paid(&mut *conn, invoice_id, None)
            .await
            .unwrap()
            .unwrap();

        let gateway = Arc::new(CountingGateway { logins: AtomicUsize::new(0), links: AtomicUsize::new(0) });
        let result = service(&pool, gateway.clone())
            .ensure_payment_link(&mut *conn, &ctx, invoice_id)
            .await;

        assert!(matches!(result, Err(AppError::AlreadyPaid)));
        assert_eq!(gateway.links.load(Ordering::SeqCst), 0);
    }
}
