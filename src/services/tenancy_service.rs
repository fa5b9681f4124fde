// src/services/tenancy_service.rs

use sqlx::{Acquire, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{fleet_repo::DriverRecord, FleetRepository, TenantRepository, UserRepository},
    middleware::tenancy::{TenantContext, TenantScope},
    models::{
        fleet::DriverStatus,
        tenancy::{
            AppRole, Company, CompanyOverview, CompanySettings, CompanySettingsPatch, InviteResult, NewCompany,
            NewInvite, Profile, TeamMember,
        },
    },
    services::sms_service::SmsService,
};

/// Papéis que um admin pode conceder pelo convite de equipe.
pub const TEAM_INVITE_ROLES: [AppRole; 4] = [AppRole::Admin, AppRole::Dispatcher, AppRole::Sales, AppRole::Treasury];

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    fleet_repo: FleetRepository,
    sms_service: SmsService,
    app_base_url: String,
    pool: PgPool,
}

/// Decide o escopo a partir do perfil, sem tocar no banco.
/// `requested` é o X-Tenant-ID enviado pelo cliente.
pub fn plan_scope(profile: Option<&Profile>, requested: Option<Uuid>) -> Result<TenantScope, AppError> {
    let profile = profile.ok_or(AppError::NotProvisioned)?;

    if profile.is_super_admin {
        return Ok(requested.map(TenantScope::Tenant).unwrap_or(TenantScope::Global));
    }

    let own = profile.tenant_id.ok_or(AppError::NotProvisioned)?;
    match requested {
        Some(other) if other != own => Err(AppError::Forbidden),
        _ => Ok(TenantScope::Tenant(own)),
    }
}

pub fn invite_url(base_url: &str, user_has_password: bool, token: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match (user_has_password, token) {
        (false, Some(token)) => format!("{}/accept-invite?token={}", base, token),
        _ => format!("{}/login", base),
    }
}

fn new_invite_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        fleet_repo: FleetRepository,
        sms_service: SmsService,
        app_base_url: String,
        pool: PgPool,
    ) -> Self {
        Self {
            tenant_repo,
            user_repo,
            fleet_repo,
            sms_service,
            app_base_url,
            pool,
        }
    }

    // ---
    // RESOLVER: quem é o principal e em qual empresa ele atua
    // ---
    pub async fn resolve(&self, user_id: Uuid, requested: Option<Uuid>) -> Result<TenantContext, AppError> {
        let profile = self.tenant_repo.find_profile(user_id).await?;
        let scope = plan_scope(profile.as_ref(), requested)?;
        let is_super_admin = profile.as_ref().is_some_and(|p| p.is_super_admin);

        let role = match scope {
            TenantScope::Tenant(tenant_id) => {
                let role = self.tenant_repo.find_role(user_id, tenant_id).await?;
                if is_super_admin {
                    // Super-admin entrando numa empresa: ela precisa existir
                    if !self.tenant_repo.company_exists(tenant_id).await? {
                        return Err(AppError::NotFound("Company".to_string()));
                    }
                    role
                } else {
                    Some(role.ok_or(AppError::NotProvisioned)?)
                }
            }
            TenantScope::Global => match profile.as_ref().and_then(|p| p.tenant_id) {
                Some(own) => self.tenant_repo.find_role(user_id, own).await?,
                None => None,
            },
        };

        Ok(TenantContext {
            principal_id: user_id,
            scope,
            role,
            is_super_admin,
        })
    }

    // ---
    // ONBOARDING
    // ---

    /// Cria a empresa, liga o perfil do dono e atribui `admin`, tudo ou nada.
    pub async fn create_company_with_owner(&self, owner_id: Uuid, input: &NewCompany) -> Result<Company, AppError> {
        if let Some(profile) = self.tenant_repo.find_profile(owner_id).await? {
            if profile.tenant_id.is_some() {
                return Err(AppError::AlreadyMember);
            }
        }

        let mut tx = self.pool.begin().await?;

        let company = self
            .tenant_repo
            .create_company(
                &mut *tx,
                &input.name,
                input.email.as_deref(),
                input.phone.as_deref(),
                input.address.as_deref(),
            )
            .await?;

        self.tenant_repo
            .attach_profile(
                &mut *tx,
                owner_id,
                company.id,
                input.first_name.as_deref(),
                input.last_name.as_deref(),
                input.phone.as_deref(),
            )
            .await?;

        self.tenant_repo
            .assign_role(&mut *tx, owner_id, company.id, AppRole::Admin)
            .await?;

        tx.commit().await?;

        tracing::info!("🏢 Empresa {} criada por {}", company.id, owner_id);
        Ok(company)
    }

    // ---
    // CONFIGURAÇÕES DA EMPRESA
    // ---

    pub async fn update_company_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        patch: &CompanySettingsPatch,
    ) -> Result<CompanySettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = self
            .tenant_repo
            .update_company_settings(executor, tenant_id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Company".to_string()))?;

        tracing::info!("⚙️ Configurações da empresa {} atualizadas", tenant_id);
        Ok(CompanySettings::from(&company))
    }

    // ---
    // CONVITES
    // ---

    pub async fn invite_team_member<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        invite: &NewInvite,
    ) -> Result<InviteResult, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        if !TEAM_INVITE_ROLES.contains(&invite.role) {
            return Err(AppError::invalid_field("role", "Role cannot be granted by team invite."));
        }
        self.invite(executor, tenant_id, invite, None).await
    }

    /// Convite de motorista: além do usuário, cria a ficha em `drivers`.
    pub async fn invite_driver<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        invite: &NewInvite,
        carrier_id: Option<Uuid>,
    ) -> Result<InviteResult, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let record = DriverRecord {
            first_name: invite.first_name.clone().unwrap_or_default(),
            last_name: invite.last_name.clone().unwrap_or_default(),
            email: Some(invite.email.clone()),
            phone: invite.phone.clone(),
            license_number: None,
            license_expiry: None,
            notes: None,
            status: DriverStatus::Available,
            carrier_id,
        };
        let invite = NewInvite {
            role: AppRole::Driver,
            ..invite.clone()
        };
        self.invite(executor, tenant_id, &invite, Some(record)).await
    }

    async fn invite<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        invite: &NewInvite,
        driver: Option<DriverRecord>,
    ) -> Result<InviteResult, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let user = self
            .user_repo
            .upsert_invited(&mut *tx, &invite.email, &new_invite_token())
            .await?;

        // Perfil em outra empresa ou papel já existente -> AlreadyMember
        self.tenant_repo
            .attach_profile(
                &mut *tx,
                user.id,
                tenant_id,
                invite.first_name.as_deref(),
                invite.last_name.as_deref(),
                invite.phone.as_deref(),
            )
            .await?;
        self.tenant_repo
            .assign_role(&mut *tx, user.id, tenant_id, invite.role)
            .await?;

        let driver_id = match &driver {
            Some(record) => Some(
                self.fleet_repo
                    .insert_driver(&mut *tx, tenant_id, Some(user.id), record)
                    .await?
                    .id,
            ),
            None => None,
        };

        tx.commit().await?;

        let url = invite_url(
            &self.app_base_url,
            user.password_hash.is_some(),
            user.invite_token.as_deref(),
        );
        tracing::info!("✉️ {} convidado como {} na empresa {}", user.id, invite.role.as_str(), tenant_id);

        // SMS só depois do commit; falha não desfaz o convite
        let invite_sent = match invite.phone.as_deref() {
            Some(phone) => {
                let body = format!("You have been invited to join your team's dispatch workspace. Get started: {}", url);
                self.sms_service.send_best_effort(phone, &body).await
            }
            None => false,
        };

        Ok(InviteResult {
            user_id: user.id,
            driver_id,
            invite_url: url,
            invite_sent,
        })
    }

    // ---
    // CONSULTAS
    // ---

    pub async fn list_team(&self, tenant_id: Uuid) -> Result<Vec<TeamMember>, AppError> {
        self.tenant_repo.list_team(tenant_id).await
    }

    pub async fn list_company_overviews<'e, E>(&self, executor: E) -> Result<Vec<CompanyOverview>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.tenant_repo.list_company_overviews(executor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(tenant_id: Option<Uuid>, is_super_admin: bool) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            tenant_id,
            first_name: None,
            last_name: None,
            phone: None,
            is_super_admin,
            email_notifications: true,
            sms_notifications: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_profile_is_not_provisioned() {
        assert!(matches!(plan_scope(None, None), Err(AppError::NotProvisioned)));
    }

    #[test]
    fn profile_without_tenant_is_not_provisioned() {
        let p = profile(None, false);
        assert!(matches!(plan_scope(Some(&p), None), Err(AppError::NotProvisioned)));
    }

    #[test]
    fn member_is_scoped_to_own_tenant() {
        let tenant = Uuid::new_v4();
        let p = profile(Some(tenant), false);
        assert_eq!(plan_scope(Some(&p), None).unwrap(), TenantScope::Tenant(tenant));
        assert_eq!(plan_scope(Some(&p), Some(tenant)).unwrap(), TenantScope::Tenant(tenant));
    }

    #[test]
    fn member_cannot_switch_tenant_by_header() {
        let p = profile(Some(Uuid::new_v4()), false);
        assert!(matches!(plan_scope(Some(&p), Some(Uuid::new_v4())), Err(AppError::Forbidden)));
    }

    #[test]
    fn super_admin_is_global_unless_acting_in_a_tenant() {
        let p = profile(None, true);
        assert_eq!(plan_scope(Some(&p), None).unwrap(), TenantScope::Global);

        let target = Uuid::new_v4();
        assert_eq!(plan_scope(Some(&p), Some(target)).unwrap(), TenantScope::Tenant(target));
    }

    #[test]
    fn invite_url_points_new_users_to_accept_page() {
        assert_eq!(
            invite_url("https://app.example.com/", false, Some("abc")),
            "https://app.example.com/accept-invite?token=abc"
        );
        assert_eq!(invite_url("https://app.example.com", true, None), "https://app.example.com/login");
    }

    #[test]
    fn drivers_and_partners_are_not_team_invite_roles() {
        assert!(!TEAM_INVITE_ROLES.contains(&AppRole::Driver));
        assert!(!TEAM_INVITE_ROLES.contains(&AppRole::Carrier));
        assert!(!TEAM_INVITE_ROLES.contains(&AppRole::Broker));
    }

    #[test]
    fn invite_tokens_are_long_and_unique() {
        let a = new_invite_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, new_invite_token());
    }

    // ---
    // Com banco
    // ---

    use crate::{
        common::test_support::{count, seed_company, service_conn},
        integrations::sms::SmsGateway,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct SilentSms;

    #[async_trait]
    impl SmsGateway for SilentSms {
        async fn send_message(&self, _to: &str, _body: &str) -> Result<String, AppError> {
            Ok("SM0".into())
        }
    }

    fn service(pool: &PgPool) -> TenantService {
        TenantService::new(
            TenantRepository::new(pool.clone()),
            UserRepository::new(pool.clone()),
            FleetRepository::new(),
            SmsService::new(Arc::new(SilentSms)),
            "https://app.example.com".into(),
            pool.clone(),
        )
    }

    fn invite(role: AppRole) -> NewInvite {
        NewInvite {
            email: "dispatch@acmefreight.test".into(),
            role,
            first_name: Some("Sam".into()),
            last_name: None,
            phone: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_invite_for_the_same_email_is_already_member(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let svc = service(&pool);
        let mut conn = service_conn(&pool).await;

        let first = svc
            .invite_team_member(&mut *conn, tenant, &invite(AppRole::Dispatcher))
            .await
            .unwrap();
        assert!(first.invite_url.contains("/accept-invite?token="));

        let second = svc.invite_team_member(&mut *conn, tenant, &invite(AppRole::Sales)).await;
        assert!(matches!(second, Err(AppError::AlreadyMember)));

        let roles = count(&pool, "SELECT COUNT(*) FROM user_roles WHERE user_id = $1", first.user_id).await;
        assert_eq!(roles, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn settings_patch_touches_only_the_fields_sent(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let svc = service(&pool);

        let set = CompanySettingsPatch {
            payment_account_id: Some(Some("acct_42".into())),
            payment_api_key: Some(Some("sk_live_1".into())),
            esign_enabled: Some(true),
        };
        let settings = svc.update_company_settings(&pool, tenant, &set).await.unwrap();
        assert_eq!(settings.payment_account_id.as_deref(), Some("acct_42"));
        assert!(settings.payment_api_key_configured);
        assert!(settings.esign_enabled);

        // Só limpa a chave; conta e e-sign ficam
        let clear_key = CompanySettingsPatch {
            payment_api_key: Some(None),
            ..Default::default()
        };
        let settings = svc.update_company_settings(&pool, tenant, &clear_key).await.unwrap();
        assert_eq!(settings.payment_account_id.as_deref(), Some("acct_42"));
        assert!(!settings.payment_api_key_configured);
        assert!(settings.esign_enabled);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn settings_for_a_missing_company_are_not_found(pool: PgPool) {
        let result = service(&pool)
            .update_company_settings(&pool, Uuid::new_v4(), &CompanySettingsPatch::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
