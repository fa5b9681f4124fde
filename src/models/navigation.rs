// src/models/navigation.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::tenancy::AppRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NavItem {
    #[schema(example = "truck")]
    pub icon: &'static str,
    #[schema(example = "Loads")]
    pub label: &'static str,
    #[schema(example = "/loads")]
    pub route: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    pub role: Option<AppRole>,
    pub is_super_admin: bool,
    pub landing_route: &'static str,
    pub items: Vec<NavItem>,
}
