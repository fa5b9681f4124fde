pub mod assist_service;
pub mod auth;
pub mod contract_service;
pub mod fleet_service;
pub mod invoice_service;
pub mod load_service;
pub mod location_service;
pub mod navigation;
pub mod notification_service;
pub mod sms_service;
pub mod status_engine;
pub mod tenancy_service;
pub mod webhook_service;
pub mod wip_service;
