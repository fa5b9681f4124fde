pub mod assist;
pub mod auth;
pub mod documents;
pub mod fleet;
pub mod invoices;
pub mod loads;
pub mod navigation;
pub mod notifications;
pub mod partners;
pub mod tenancy;
pub mod webhooks;
pub mod wip;
