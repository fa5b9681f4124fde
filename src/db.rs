pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod load_repo;
pub use load_repo::LoadRepository;
pub mod fleet_repo;
pub use fleet_repo::FleetRepository;
pub mod partner_repo;
pub use partner_repo::PartnerRepository;
pub mod invoice_repo;
pub use invoice_repo::InvoiceRepository;
pub mod document_repo;
pub use document_repo::DocumentRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod wip_repo;
pub use wip_repo::WipRepository;
