// src/services/load_service.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{
        load_repo::{DriverUpdate, LoadVisibility},
        DocumentRepository, FleetRepository, LoadRepository, PartnerRepository, TenantRepository,
    },
    middleware::tenancy::TenantContext,
    models::{
        documents::{AttachDocumentPayload, Document},
        loads::{Load, LoadDraft, LoadFields, LoadFilters, LoadStatus, NumericInput, SaleStatus, TransitionRequest},
        notifications::{NotificationMessage, KIND_LOAD_STATUS},
        partners::Carrier,
        tenancy::AppRole,
    },
    services::{notification_service::NotificationService, status_engine},
};

#[derive(Clone)]
pub struct LoadService {
    load_repo: LoadRepository,
    fleet_repo: FleetRepository,
    partner_repo: PartnerRepository,
    document_repo: DocumentRepository,
    tenant_repo: TenantRepository,
    notification_service: NotificationService,
}

// =============================================================================
//  1. REGRAS PURAS (montagem e validação do rascunho)
// =============================================================================

pub fn generate_load_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("LD-{}-{}", now.format("%Y%m%d"), suffix)
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Número ou texto -> Decimal. Vazio limpa; texto inválido, NaN e negativos
/// são rejeitados.
pub fn parse_numeric(label: &str, input: &NumericInput) -> Result<Option<Decimal>, ValidationError> {
    let value = match input {
        NumericInput::Text(text) if text.trim().is_empty() => return Ok(None),
        NumericInput::Text(text) => Decimal::from_str(text.trim())
            .map_err(|_| invalid("numeric", format!("{} must be a number.", label)))?,
        NumericInput::Number(n) => Decimal::try_from(*n)
            .map_err(|_| invalid("numeric", format!("{} must be a number.", label)))?,
    };

    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("range", format!("{} cannot be negative.", label)));
    }
    Ok(Some(value))
}

pub fn parse_id(label: &str, raw: &str) -> Result<Option<Uuid>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(trimmed)
        .map(Some)
        .map_err(|_| invalid("uuid", format!("{} is not a valid id.", label)))
}

fn text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Aplica um patch ao rascunho. Campo ausente fica como está; string vazia
/// limpa o valor. Todos os erros de campo são acumulados.
pub fn apply_fields(draft: &mut LoadDraft, fields: &LoadFields) -> Result<(), AppError> {
    let mut errors = ValidationErrors::new();

    macro_rules! set_text {
        ($($field:ident),*) => {
            $(if let Some(v) = &fields.$field { draft.$field = text(v); })*
        };
    }
    macro_rules! set_required {
        ($($field:ident),*) => {
            $(if let Some(v) = &fields.$field { draft.$field = v.trim().to_string(); })*
        };
    }
    macro_rules! set_numeric {
        ($(($field:ident, $label:literal)),*) => {
            $(if let Some(v) = &fields.$field {
                match parse_numeric($label, v) {
                    Ok(parsed) => draft.$field = parsed,
                    Err(e) => errors.add(stringify!($field), e),
                }
            })*
        };
    }
    macro_rules! set_id {
        ($(($field:ident, $label:literal)),*) => {
            $(if let Some(v) = &fields.$field {
                match parse_id($label, v) {
                    Ok(parsed) => draft.$field = parsed,
                    Err(e) => errors.add(stringify!($field), e),
                }
            })*
        };
    }

    set_required!(
        load_number,
        pickup_location,
        pickup_city,
        pickup_state,
        delivery_location,
        delivery_city,
        delivery_state
    );
    set_text!(reference_number, pickup_notes, delivery_notes, commodity, notes);
    set_numeric!(
        (weight, "Weight"),
        (distance, "Distance"),
        (rate, "Rate"),
        (sales_percentage, "Sales percentage")
    );
    set_id!(
        (driver_id, "Driver"),
        (broker_id, "Broker"),
        (carrier_id, "Carrier"),
        (sales_agent_id, "Sales agent")
    );

    if let Some(date) = fields.pickup_date {
        draft.pickup_date = Some(date);
    }
    if let Some(date) = fields.delivery_date {
        draft.delivery_date = Some(date);
    }
    if let Some(factoring) = fields.factoring {
        draft.factoring = factoring;
    }

    if draft.sales_percentage.is_some_and(|p| p > Decimal::ONE_HUNDRED) {
        errors.add(
            "sales_percentage",
            invalid("range", "Sales percentage must be between 0 and 100.".to_string()),
        );
    }

    for (field, value, label) in [
        ("load_number", &draft.load_number, "Load number"),
        ("pickup_location", &draft.pickup_location, "Pickup address"),
        ("pickup_city", &draft.pickup_city, "Pickup city"),
        ("pickup_state", &draft.pickup_state, "Pickup state"),
        ("delivery_location", &draft.delivery_location, "Delivery address"),
        ("delivery_city", &draft.delivery_city, "Delivery city"),
        ("delivery_state", &draft.delivery_state, "Delivery state"),
    ] {
        if value.is_empty() {
            errors.add(field, invalid("required", format!("{} is required.", label)));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationError(errors))
    }
}

/// Rascunho de criação: número gerado quando o cliente não manda um.
pub fn build_new_draft(fields: &LoadFields, now: DateTime<Utc>) -> Result<LoadDraft, AppError> {
    let mut draft = LoadDraft {
        load_number: generate_load_number(now),
        reference_number: None,
        pickup_location: String::new(),
        pickup_city: String::new(),
        pickup_state: String::new(),
        pickup_date: None,
        pickup_notes: None,
        delivery_location: String::new(),
        delivery_city: String::new(),
        delivery_state: String::new(),
        delivery_date: None,
        delivery_notes: None,
        commodity: None,
        weight: None,
        distance: None,
        rate: None,
        notes: None,
        driver_id: None,
        broker_id: None,
        carrier_id: None,
        sales_agent_id: None,
        sales_percentage: None,
        factoring: false,
        contract_signed: false,
        sale_status: None,
    };

    let mut fields = fields.clone();
    if fields.load_number.as_deref().is_some_and(|n| n.trim().is_empty()) {
        fields.load_number = None;
    }
    apply_fields(&mut draft, &fields)?;
    Ok(draft)
}

/// Estado comercial herdado da transportadora vinculada.
pub fn sale_terms(carrier: Option<&Carrier>) -> (Option<SaleStatus>, bool) {
    match carrier {
        Some(c) if c.contract_signed => (Some(SaleStatus::Active), true),
        Some(_) => (Some(SaleStatus::PendingActivation), false),
        None => (None, false),
    }
}

/// O que cada papel enxerga. `own_driver_id` é a ficha do próprio motorista
/// (já buscada pelo chamador). Transportadora e broker não têm vínculo com
/// cargas da empresa e ficam de fora.
pub fn visibility_for(ctx: &TenantContext, own_driver_id: Option<Uuid>) -> Result<LoadVisibility, AppError> {
    if ctx.is_super_admin {
        return Ok(LoadVisibility::default());
    }
    match ctx.role {
        Some(AppRole::Driver) => Ok(LoadVisibility {
            // Sem ficha: filtro por um id que não existe -> lista vazia
            driver_id: Some(own_driver_id.unwrap_or(Uuid::nil())),
            sales_user_id: None,
        }),
        Some(AppRole::Sales) => Ok(LoadVisibility {
            driver_id: None,
            sales_user_id: Some(ctx.principal_id),
        }),
        Some(AppRole::Admin | AppRole::Dispatcher | AppRole::Treasury) => Ok(LoadVisibility::default()),
        Some(AppRole::Carrier | AppRole::Broker) | None => Err(AppError::Forbidden),
    }
}

pub fn is_visible(load: &Load, visibility: &LoadVisibility) -> bool {
    let driver_ok = visibility.driver_id.is_none_or(|d| load.driver_id == Some(d));
    let sales_ok = visibility
        .sales_user_id
        .is_none_or(|u| load.sales_agent_id == Some(u) || load.created_by == Some(u));
    driver_ok && sales_ok
}

// =============================================================================
//  2. OPERAÇÕES
// =============================================================================

impl LoadService {
    pub fn new(
        load_repo: LoadRepository,
        fleet_repo: FleetRepository,
        partner_repo: PartnerRepository,
        document_repo: DocumentRepository,
        tenant_repo: TenantRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            load_repo,
            fleet_repo,
            partner_repo,
            document_repo,
            tenant_repo,
            notification_service,
        }
    }

    pub async fn create(&self, conn: &mut PgConnection, ctx: &TenantContext, fields: &LoadFields) -> Result<Load, AppError> {
        let tenant_id = ctx.tenant_id()?;
        let mut draft = build_new_draft(fields, Utc::now())?;

        let carrier = self.check_references(conn, tenant_id, &draft, None).await?;
        (draft.sale_status, draft.contract_signed) = sale_terms(carrier.as_ref());

        let load = self
            .load_repo
            .insert(&mut *conn, tenant_id, ctx.principal_id, &draft)
            .await?;

        tracing::info!("📦 Carga {} ({}) criada na empresa {}", load.load_number, load.id, tenant_id);
        Ok(load)
    }

    /// Edição parcial. Nunca mexe no status, nem quando troca o motorista.
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        load_id: Uuid,
        fields: &LoadFields,
    ) -> Result<Load, AppError> {
        let tenant_id = ctx.tenant_id()?;
        let own_driver = self.own_driver_id(conn, ctx).await?;
        let current = self.find_visible(conn, ctx, Some(tenant_id), load_id, own_driver).await?;

        let mut draft = LoadDraft::from(&current);
        apply_fields(&mut draft, fields)?;

        let carrier = self.check_references(conn, tenant_id, &draft, Some(&current)).await?;
        if draft.carrier_id != current.carrier_id {
            (draft.sale_status, draft.contract_signed) = sale_terms(carrier.as_ref());
        }

        self.load_repo.update_fields(&mut *conn, tenant_id, load_id, &draft).await
    }

    /// Todo vínculo informado precisa ser da mesma empresa. Na edição, só
    /// confere o que mudou. Devolve a transportadora quando ela mudou.
    async fn check_references(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        draft: &LoadDraft,
        current: Option<&Load>,
    ) -> Result<Option<Carrier>, AppError> {
        let changed = |new: Option<Uuid>, old: fn(&Load) -> Option<Uuid>| match (new, current) {
            (None, _) => None,
            (Some(id), Some(load)) if old(load) == Some(id) => None,
            (Some(id), _) => Some(id),
        };

        if let Some(driver_id) = changed(draft.driver_id, |l| l.driver_id) {
            if !self.fleet_repo.exists_in_tenant(&mut *conn, tenant_id, driver_id).await? {
                return Err(AppError::NotFound("Driver".to_string()));
            }
        }
        if let Some(broker_id) = changed(draft.broker_id, |l| l.broker_id) {
            if !self.partner_repo.exists_broker(&mut *conn, tenant_id, broker_id).await? {
                return Err(AppError::NotFound("Broker".to_string()));
            }
        }
        if let Some(agent_id) = changed(draft.sales_agent_id, |l| l.sales_agent_id) {
            if self.tenant_repo.find_role(agent_id, tenant_id).await?.is_none() {
                return Err(AppError::NotFound("Sales agent".to_string()));
            }
        }
        match changed(draft.carrier_id, |l| l.carrier_id) {
            Some(carrier_id) => self
                .partner_repo
                .find_carrier(&mut *conn, Some(tenant_id), carrier_id)
                .await?
                .map(Some)
                .ok_or_else(|| AppError::NotFound("Carrier".to_string())),
            None => Ok(None),
        }
    }

    async fn own_driver_id(&self, conn: &mut PgConnection, ctx: &TenantContext) -> Result<Option<Uuid>, AppError> {
        if ctx.role != Some(AppRole::Driver) || ctx.is_super_admin {
            return Ok(None);
        }
        let tenant_id = ctx.tenant_id()?;
        Ok(self
            .fleet_repo
            .find_driver_by_user(&mut *conn, tenant_id, ctx.principal_id)
            .await?
            .map(|d| d.id))
    }

    /// Carga fora do alcance do papel responde como inexistente.
    async fn find_visible(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        tenant_id: Option<Uuid>,
        load_id: Uuid,
        own_driver: Option<Uuid>,
    ) -> Result<Load, AppError> {
        let visibility = visibility_for(ctx, own_driver)?;
        self.load_repo
            .find(&mut *conn, tenant_id, load_id)
            .await?
            .filter(|load| is_visible(load, &visibility))
            .ok_or_else(|| AppError::NotFound("Load".to_string()))
    }

    pub async fn get(&self, conn: &mut PgConnection, ctx: &TenantContext, load_id: Uuid) -> Result<Load, AppError> {
        let own_driver = self.own_driver_id(conn, ctx).await?;
        self.find_visible(conn, ctx, ctx.tenant_filter(), load_id, own_driver).await
    }

    pub async fn list(&self, conn: &mut PgConnection, ctx: &TenantContext, filters: &LoadFilters) -> Result<Vec<Load>, AppError> {
        let visibility = visibility_for(ctx, self.own_driver_id(conn, ctx).await?)?;
        self.load_repo
            .list(&mut *conn, ctx.tenant_filter(), filters, visibility)
            .await
    }

    // ---
    // TRANSIÇÕES
    // ---

    pub async fn transition(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        load_id: Uuid,
        request: &TransitionRequest,
    ) -> Result<Load, AppError> {
        if !status_engine::actor_may_transition(ctx.role, ctx.is_super_admin) {
            return Err(AppError::Forbidden);
        }
        let tenant_id = ctx.tenant_id()?;

        let acting_driver = self.own_driver_id(conn, ctx).await?;
        // Motorista só alcança cargas da própria ficha; vendas, as suas
        let load = self.find_visible(conn, ctx, Some(tenant_id), load_id, acting_driver).await?;

        status_engine::validate(load.status, request.status)?;

        let driver_update = if load.status == LoadStatus::Assigned && request.status == LoadStatus::Pending {
            DriverUpdate::Clear
        } else {
            DriverUpdate::Keep
        };

        let updated = self
            .write_transition(conn, tenant_id, &load, request.status, request.expected_updated_at, driver_update)
            .await?;

        if acting_driver.is_some() {
            self.notify_dispatch(conn, tenant_id, &updated).await;
        }
        Ok(updated)
    }

    /// Motorista aceita uma carga pendente: pending -> assigned, ficando com ela.
    pub async fn accept(&self, conn: &mut PgConnection, ctx: &TenantContext, load_id: Uuid) -> Result<Load, AppError> {
        let (tenant_id, driver_id, load) = self.driver_claim(conn, ctx, load_id).await?;

        if load.driver_id.is_some_and(|d| d != driver_id) {
            return Err(AppError::Forbidden);
        }
        status_engine::validate(load.status, LoadStatus::Assigned)?;

        let updated = self
            .write_transition(conn, tenant_id, &load, LoadStatus::Assigned, None, DriverUpdate::Set(driver_id))
            .await?;
        self.notify_dispatch(conn, tenant_id, &updated).await;
        Ok(updated)
    }

    /// Motorista devolve a carga: assigned -> pending, sem motorista.
    pub async fn reject(&self, conn: &mut PgConnection, ctx: &TenantContext, load_id: Uuid) -> Result<Load, AppError> {
        let (tenant_id, driver_id, load) = self.driver_claim(conn, ctx, load_id).await?;

        if load.driver_id != Some(driver_id) {
            return Err(AppError::Forbidden);
        }
        status_engine::validate(load.status, LoadStatus::Pending)?;

        let updated = self
            .write_transition(conn, tenant_id, &load, LoadStatus::Pending, None, DriverUpdate::Clear)
            .await?;
        self.notify_dispatch(conn, tenant_id, &updated).await;
        Ok(updated)
    }

    async fn driver_claim(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        load_id: Uuid,
    ) -> Result<(Uuid, Uuid, Load), AppError> {
        if ctx.role != Some(AppRole::Driver) {
            return Err(AppError::Forbidden);
        }
        let tenant_id = ctx.tenant_id()?;
        let driver = self
            .fleet_repo
            .find_driver_by_user(&mut *conn, tenant_id, ctx.principal_id)
            .await?
            .ok_or(AppError::Forbidden)?;
        let load = self
            .load_repo
            .find(&mut *conn, Some(tenant_id), load_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Load".to_string()))?;
        Ok((tenant_id, driver.id, load))
    }

    /// Compare-and-set: se outra escrita chegou antes, nada é aplicado.
    async fn write_transition(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        load: &Load,
        to: LoadStatus,
        expected_updated_at: Option<DateTime<Utc>>,
        driver_update: DriverUpdate,
    ) -> Result<Load, AppError> {
        let updated = self
            .load_repo
            .compare_and_set_status(&mut *conn, tenant_id, load.id, load.status, to, expected_updated_at, driver_update)
            .await?
            .ok_or(AppError::ConcurrentModification)?;

        tracing::info!(
            "🚚 Carga {}: {} -> {}",
            updated.load_number,
            load.status.as_str(),
            updated.status.as_str()
        );
        Ok(updated)
    }

    async fn notify_dispatch(&self, conn: &mut PgConnection, tenant_id: Uuid, load: &Load) {
        let msg = NotificationMessage {
            kind: KIND_LOAD_STATUS,
            title: "Load Updated".to_string(),
            message: format!("Load {} is now {}.", load.load_number, load.status.as_str()),
            link: Some("/loads".to_string()),
        };
        self.notification_service
            .fan_out_best_effort(conn, tenant_id, &[AppRole::Admin, AppRole::Dispatcher], &msg)
            .await;
    }

    // ---
    // DOCUMENTOS
    // ---

    pub async fn attach_document(
        &self,
        conn: &mut PgConnection,
        ctx: &TenantContext,
        load_id: Uuid,
        payload: &AttachDocumentPayload,
    ) -> Result<Document, AppError> {
        let tenant_id = ctx.tenant_id()?;
        let load = self.get(conn, ctx, load_id).await?;

        let doc = self
            .document_repo
            .insert_for_load(&mut *conn, tenant_id, load.id, load.driver_id, load.carrier_id, ctx.principal_id, payload)
            .await?;

        tracing::info!("📎 Documento {} anexado à carga {}", doc.id, load.load_number);
        Ok(doc)
    }

    pub async fn list_documents(&self, conn: &mut PgConnection, ctx: &TenantContext, load_id: Uuid) -> Result<Vec<Document>, AppError> {
        let load = self.get(conn, ctx, load_id).await?;
        self.document_repo
            .list_for_load(&mut *conn, ctx.tenant_filter(), load.id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::tenancy::TenantScope;
    use crate::models::partners::SignatureStatus;

    fn required_fields() -> LoadFields {
        LoadFields {
            pickup_location: Some("100 Main St".into()),
            pickup_city: Some("Dallas".into()),
            pickup_state: Some("TX".into()),
            delivery_location: Some("9 Harbor Rd".into()),
            delivery_city: Some("Houston".into()),
            delivery_state: Some("TX".into()),
            ..Default::default()
        }
    }

    fn num(s: &str) -> Option<NumericInput> {
        Some(NumericInput::Text(s.to_string()))
    }

    fn field_errors(err: AppError) -> Vec<String> {
        match err {
            AppError::ValidationError(e) => {
                let mut fields: Vec<String> = e.field_errors().keys().map(|k| k.to_string()).collect();
                fields.sort();
                fields
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn generated_number_has_date_and_six_char_suffix() {
        let now = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let number = generate_load_number(now);
        assert!(number.starts_with("LD-20250301-"));
        let suffix = &number["LD-20250301-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn numeric_accepts_numbers_and_strings() {
        assert_eq!(parse_numeric("Rate", &NumericInput::Number(1200.5)).unwrap(), Some(Decimal::new(12005, 1)));
        assert_eq!(parse_numeric("Rate", &NumericInput::Text(" 2450.00 ".into())).unwrap(), Some(Decimal::new(245000, 2)));
        assert_eq!(parse_numeric("Rate", &NumericInput::Text("".into())).unwrap(), None);
    }

    #[test]
    fn numeric_rejects_garbage_and_negatives() {
        assert!(parse_numeric("Rate", &NumericInput::Text("abc".into())).is_err());
        assert!(parse_numeric("Rate", &NumericInput::Text("-5".into())).is_err());
        assert!(parse_numeric("Rate", &NumericInput::Number(-0.01)).is_err());
        assert!(parse_numeric("Rate", &NumericInput::Number(f64::NAN)).is_err());
        assert_eq!(parse_numeric("Rate", &NumericInput::Number(0.0)).unwrap(), Some(Decimal::ZERO));
    }

    #[test]
    fn create_requires_both_ends_of_the_route() {
        let err = build_new_draft(&LoadFields::default(), Utc::now()).unwrap_err();
        assert_eq!(
            field_errors(err),
            vec![
                "delivery_city",
                "delivery_location",
                "delivery_state",
                "pickup_city",
                "pickup_location",
                "pickup_state"
            ]
        );
    }

    #[test]
    fn create_generates_number_when_missing_or_blank() {
        let draft = build_new_draft(&required_fields(), Utc::now()).unwrap();
        assert!(draft.load_number.starts_with("LD-"));

        let fields = LoadFields { load_number: Some("  ".into()), ..required_fields() };
        assert!(build_new_draft(&fields, Utc::now()).unwrap().load_number.starts_with("LD-"));

        let fields = LoadFields { load_number: Some("ACME-77".into()), ..required_fields() };
        assert_eq!(build_new_draft(&fields, Utc::now()).unwrap().load_number, "ACME-77");
    }

    #[test]
    fn create_collects_every_bad_numeric_before_writing() {
        let fields = LoadFields {
            weight: num("heavy"),
            rate: num("-10"),
            sales_percentage: num("150"),
            ..required_fields()
        };
        let err = build_new_draft(&fields, Utc::now()).unwrap_err();
        assert_eq!(field_errors(err), vec!["rate", "sales_percentage", "weight"]);
    }

    #[test]
    fn blank_ids_become_null_and_bad_ids_are_rejected() {
        let fields = LoadFields {
            driver_id: Some("".into()),
            carrier_id: Some("not-a-uuid".into()),
            ..required_fields()
        };
        let err = build_new_draft(&fields, Utc::now()).unwrap_err();
        assert_eq!(field_errors(err), vec!["carrier_id"]);

        let fields = LoadFields { driver_id: Some(" ".into()), ..required_fields() };
        assert_eq!(build_new_draft(&fields, Utc::now()).unwrap().driver_id, None);
    }

    #[test]
    fn patch_leaves_absent_fields_and_clears_blank_ones() {
        let driver = Uuid::new_v4();
        let mut draft = build_new_draft(
            &LoadFields {
                rate: num("900"),
                commodity: Some("Steel".into()),
                driver_id: Some(driver.to_string()),
                ..required_fields()
            },
            Utc::now(),
        )
        .unwrap();

        apply_fields(
            &mut draft,
            &LoadFields {
                rate: num(""),
                commodity: Some("".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(draft.rate, None);
        assert_eq!(draft.commodity, None);
        assert_eq!(draft.driver_id, Some(driver));
        assert_eq!(draft.pickup_city, "Dallas");
    }

    #[test]
    fn patch_cannot_blank_a_required_field() {
        let mut draft = build_new_draft(&required_fields(), Utc::now()).unwrap();
        let err = apply_fields(
            &mut draft,
            &LoadFields { pickup_city: Some("".into()), ..Default::default() },
        )
        .unwrap_err();
        assert_eq!(field_errors(err), vec!["pickup_city"]);
    }

    fn carrier(signed: bool) -> Carrier {
        Carrier {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Road Runner LLC".into(),
            email: None,
            phone: None,
            address: None,
            mc_number: None,
            dot_number: None,
            insurance_expiry: None,
            notes: None,
            envelope_id: None,
            signature_status: if signed { SignatureStatus::Completed } else { SignatureStatus::NotSent },
            contract_signed: signed,
            contract_signed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn sale_waits_for_carrier_contract() {
        assert_eq!(sale_terms(Some(&carrier(false))), (Some(SaleStatus::PendingActivation), false));
        assert_eq!(sale_terms(Some(&carrier(true))), (Some(SaleStatus::Active), true));
        assert_eq!(sale_terms(None), (None, false));
    }

    fn ctx(role: AppRole) -> TenantContext {
        TenantContext {
            principal_id: Uuid::new_v4(),
            scope: TenantScope::Tenant(Uuid::new_v4()),
            role: Some(role),
            is_super_admin: false,
        }
    }

    #[test]
    fn drivers_without_a_record_see_nothing() {
        let v = visibility_for(&ctx(AppRole::Driver), None).unwrap();
        assert_eq!(v.driver_id, Some(Uuid::nil()));
    }

    #[test]
    fn sales_see_loads_they_sold_or_created() {
        let sales = ctx(AppRole::Sales);
        let v = visibility_for(&sales, None).unwrap();
        assert_eq!(v.sales_user_id, Some(sales.principal_id));
        assert!(visibility_for(&ctx(AppRole::Dispatcher), None).unwrap().sales_user_id.is_none());
    }

    #[test]
    fn carriers_and_brokers_cannot_read_loads() {
        assert!(matches!(visibility_for(&ctx(AppRole::Carrier), None), Err(AppError::Forbidden)));
        assert!(matches!(visibility_for(&ctx(AppRole::Broker), None), Err(AppError::Forbidden)));
        assert!(visibility_for(&ctx(AppRole::Treasury), None).is_ok());
    }

    #[test]
    fn sales_visibility_covers_agent_and_creator_only() {
        let sales = ctx(AppRole::Sales);
        let v = visibility_for(&sales, None).unwrap();
        let mut load = sample_load();
        assert!(!is_visible(&load, &v));
        load.created_by = Some(sales.principal_id);
        assert!(is_visible(&load, &v));
        load.created_by = None;
        load.sales_agent_id = Some(sales.principal_id);
        assert!(is_visible(&load, &v));
    }

    fn sample_load() -> Load {
        let draft = build_new_draft(&required_fields(), Utc::now()).unwrap();
        Load {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            load_number: draft.load_number,
            reference_number: None,
            pickup_location: draft.pickup_location,
            pickup_city: draft.pickup_city,
            pickup_state: draft.pickup_state,
            pickup_date: None,
            pickup_notes: None,
            delivery_location: draft.delivery_location,
            delivery_city: draft.delivery_city,
            delivery_state: draft.delivery_state,
            delivery_date: None,
            delivery_notes: None,
            commodity: None,
            weight: None,
            distance: None,
            rate: None,
            notes: None,
            status: LoadStatus::Pending,
            driver_id: None,
            broker_id: None,
            carrier_id: None,
            sales_agent_id: None,
            sales_percentage: None,
            factoring: false,
            contract_signed: false,
            sale_status: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // ---
    // Com banco
    // ---

    use crate::{
        common::test_support::{member_ctx, seed_company, seed_load, seed_member, service_conn},
        db::NotificationRepository,
    };
    use sqlx::PgPool;

    fn service(pool: &PgPool) -> LoadService {
        LoadService::new(
            LoadRepository::new(),
            FleetRepository::new(),
            PartnerRepository::new(),
            DocumentRepository::new(),
            TenantRepository::new(pool.clone()),
            NotificationService::new(NotificationRepository::new()),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_transitions_from_the_same_snapshot_apply_once(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let dispatcher = seed_member(&pool, tenant, AppRole::Dispatcher).await;
        let load_id = seed_load(&pool, tenant, None, Some(dispatcher)).await;
        let ctx = member_ctx(dispatcher, tenant, AppRole::Dispatcher);
        let svc = service(&pool);

        let mut a = service_conn(&pool).await;
        let mut b = service_conn(&pool).await;
        let snapshot = svc.get(&mut *a, &ctx, load_id).await.unwrap();

        let assign = TransitionRequest {
            status: LoadStatus::Assigned,
            expected_updated_at: Some(snapshot.updated_at),
        };
        let cancel = TransitionRequest {
            status: LoadStatus::Cancelled,
            expected_updated_at: Some(snapshot.updated_at),
        };

        let (first, second) = tokio::join!(
            svc.transition(&mut *a, &ctx, load_id, &assign),
            svc.transition(&mut *b, &ctx, load_id, &cancel),
        );

        let (winner, loser) = match (first, second) {
            (Ok(load), Err(e)) | (Err(e), Ok(load)) => (load, e),
            other => panic!("expected exactly one transition to win, got {:?}", other),
        };
        assert!(matches!(
            loser,
            AppError::ConcurrentModification | AppError::InvalidTransition { .. }
        ));

        let stored = svc.get(&mut *a, &ctx, load_id).await.unwrap();
        assert_eq!(stored.status, winner.status);
        assert_eq!(stored.updated_at, winner.updated_at);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn stale_snapshot_is_rejected(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let dispatcher = seed_member(&pool, tenant, AppRole::Dispatcher).await;
        let load_id = seed_load(&pool, tenant, None, Some(dispatcher)).await;
        let ctx = member_ctx(dispatcher, tenant, AppRole::Dispatcher);
        let svc = service(&pool);
        let mut conn = service_conn(&pool).await;

        let snapshot = svc.get(&mut *conn, &ctx, load_id).await.unwrap();
        let assign = TransitionRequest {
            status: LoadStatus::Assigned,
            expected_updated_at: Some(snapshot.updated_at),
        };
        svc.transition(&mut *conn, &ctx, load_id, &assign).await.unwrap();

        let back = TransitionRequest {
            status: LoadStatus::Pending,
            expected_updated_at: Some(snapshot.updated_at),
        };
        assert!(matches!(
            svc.transition(&mut *conn, &ctx, load_id, &back).await,
            Err(AppError::ConcurrentModification)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn sales_cannot_edit_or_move_loads_they_do_not_own(pool: PgPool) {
        let tenant = seed_company(&pool).await;
        let admin = seed_member(&pool, tenant, AppRole::Admin).await;
        let sales = seed_member(&pool, tenant, AppRole::Sales).await;
        let foreign = seed_load(&pool, tenant, None, Some(admin)).await;
        let own = seed_load(&pool, tenant, None, Some(sales)).await;

        let ctx = member_ctx(sales, tenant, AppRole::Sales);
        let svc = service(&pool);
        let mut conn = service_conn(&pool).await;

        let edit = LoadFields {
            commodity: Some("Lumber".into()),
            ..Default::default()
        };
        let assign = TransitionRequest {
            status: LoadStatus::Assigned,
            expected_updated_at: None,
        };

        assert!(matches!(svc.get(&mut *conn, &ctx, foreign).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.update(&mut *conn, &ctx, foreign, &edit).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            svc.transition(&mut *conn, &ctx, foreign, &assign).await,
            Err(AppError::NotFound(_))
        ));

        let edited = svc.update(&mut *conn, &ctx, own, &edit).await.unwrap();
        assert_eq!(edited.commodity.as_deref(), Some("Lumber"));
        let moved = svc.transition(&mut *conn, &ctx, own, &assign).await.unwrap();
        assert_eq!(moved.status, LoadStatus::Assigned);

        let listed = svc.list(&mut *conn, &ctx, &LoadFilters::default()).await.unwrap();
        assert_eq!(listed.iter().map(|l| l.id).collect::<Vec<_>>(), vec![own]);
    }
}
