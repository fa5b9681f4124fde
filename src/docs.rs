// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::accept_invite,

        // --- Users ---
        handlers::auth::get_me,
        handlers::navigation::get_navigation,

        // --- Tenancy ---
        handlers::tenancy::create_company,
        handlers::tenancy::invite_team_member,
        handlers::tenancy::list_team,
        handlers::tenancy::invite_driver,
        handlers::tenancy::list_companies,
        handlers::tenancy::update_company_settings,

        // --- Loads ---
        handlers::loads::create_load,
        handlers::loads::list_loads,
        handlers::loads::get_load,
        handlers::loads::update_load,
        handlers::loads::transition_load,
        handlers::loads::accept_load,
        handlers::loads::reject_load,
        handlers::documents::attach_document,
        handlers::documents::list_documents,

        // --- Fleet & Location ---
        handlers::fleet::create_driver,
        handlers::fleet::list_drivers,
        handlers::fleet::get_driver,
        handlers::fleet::update_driver,
        handlers::fleet::report_location,
        handlers::fleet::location_history,
        handlers::fleet::driver_positions,

        // --- Partners ---
        handlers::partners::create_broker,
        handlers::partners::list_brokers,
        handlers::partners::get_broker,
        handlers::partners::update_broker,
        handlers::partners::create_carrier,
        handlers::partners::list_carriers,
        handlers::partners::get_carrier,
        handlers::partners::update_carrier,
        handlers::partners::send_contract,

        // --- Invoices ---
        handlers::invoices::create_invoice,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::update_invoice_status,
        handlers::invoices::ensure_payment_link,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,

        // --- WIP ---
        handlers::wip::create_wip,
        handlers::wip::list_wip,
        handlers::wip::approve_wip,
        handlers::wip::reject_wip,

        // --- Messaging ---
        handlers::assist::send_sms,
        handlers::assist::assist,

        // --- Webhooks ---
        handlers::webhooks::payment_webhook,
        handlers::webhooks::esign_webhook,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AcceptInvitePayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::AppRole,
            models::tenancy::Company,
            models::tenancy::TeamMember,
            models::tenancy::CompanyOverview,
            models::tenancy::InviteResult,
            models::tenancy::CompanySettings,
            models::navigation::NavItem,
            models::navigation::NavigationResponse,
            handlers::tenancy::CreateCompanyPayload,
            handlers::tenancy::InviteTeamPayload,
            handlers::tenancy::InviteDriverPayload,
            handlers::tenancy::CompanySettingsPayload,

            // --- Loads ---
            models::loads::LoadStatus,
            models::loads::SaleStatus,
            models::loads::Load,
            models::loads::LoadFields,
            models::loads::TransitionRequest,
            models::documents::DocumentType,
            models::documents::DocumentVisibility,
            models::documents::Document,
            models::documents::AttachDocumentPayload,

            // --- Fleet ---
            models::fleet::DriverStatus,
            models::fleet::Driver,
            models::fleet::DriverFields,
            models::fleet::LocationReport,
            models::fleet::LocationAccepted,
            models::fleet::LocationSample,
            models::fleet::GpsStatus,
            models::fleet::DriverPosition,

            // --- Partners ---
            models::partners::SignatureStatus,
            models::partners::Broker,
            models::partners::BrokerFields,
            models::partners::Carrier,
            models::partners::CarrierFields,
            models::partners::SendContractPayload,
            models::partners::ContractSent,

            // --- Invoices ---
            models::invoices::InvoiceStatus,
            models::invoices::PaymentStatus,
            models::invoices::Invoice,
            models::invoices::CreateInvoicePayload,
            models::invoices::UpdateInvoiceStatusPayload,
            models::invoices::PaymentLinkResponse,

            // --- Notifications & WIP ---
            models::notifications::Notification,
            handlers::notifications::MarkedRead,
            models::wip::WipStatus,
            models::wip::WipAssignment,
            models::wip::CreateWipPayload,
            models::wip::DecideWipPayload,

            // --- Messaging ---
            handlers::assist::SendSmsPayload,
            handlers::assist::SmsSent,
            models::assist::AssistRequest,
            models::assist::AssistResponse,
            models::assist::LoadSummaryData,
            models::assist::DraftEmailData,
            models::assist::SmartReminderData,

            // --- Webhooks ---
            models::webhooks::PaymentEvent,
            models::webhooks::PaymentEventData,
            models::webhooks::EsignEvent,
            models::webhooks::EsignEventData,
            models::webhooks::WebhookAck,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registro, login e aceite de convites"),
        (name = "Users", description = "Usuário autenticado e menu por papel"),
        (name = "Tenancy", description = "Empresas, equipe e convites"),
        (name = "Loads", description = "Cargas e máquina de status"),
        (name = "Documents", description = "Documentos anexados às cargas"),
        (name = "Fleet", description = "Motoristas"),
        (name = "Location", description = "Rastreamento GPS"),
        (name = "Partners", description = "Brokers, transportadoras e contratos"),
        (name = "Invoices", description = "Faturas e links de pagamento"),
        (name = "Notifications", description = "Notificações in-app"),
        (name = "WIP", description = "Pedidos de associação"),
        (name = "Messaging", description = "SMS e assistente"),
        (name = "Webhooks", description = "Eventos dos gateways de pagamento e assinatura")
    )
)]
pub struct ApiDoc;

// Adiciona o esquema de autenticação Bearer (JWT)
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_jwt",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}
