// src/services/navigation.rs

// Registro de papéis: menu e rota inicial de cada papel. O `match` é
// exaustivo de propósito: um papel novo não compila sem menu.

use crate::models::{
    navigation::{NavItem, NavigationResponse},
    tenancy::AppRole,
};

const fn item(icon: &'static str, label: &'static str, route: &'static str) -> NavItem {
    NavItem { icon, label, route }
}

const SETTINGS: NavItem = item("settings", "Settings", "/settings");
const DOCUMENTS: NavItem = item("file-text", "Documents", "/documents");

pub fn landing_route(role: Option<AppRole>, is_super_admin: bool) -> &'static str {
    if is_super_admin {
        return "/master-admin";
    }
    match role {
        Some(AppRole::Admin) => "/admin-dashboard",
        Some(AppRole::Dispatcher) => "/dispatch-dashboard",
        Some(AppRole::Sales) => "/sales-dashboard",
        Some(AppRole::Treasury) => "/treasury-dashboard",
        Some(AppRole::Driver) => "/driver-portal",
        Some(AppRole::Carrier) => "/carrier-portal",
        Some(AppRole::Broker) | None => "/dashboard",
    }
}

pub fn nav_items(role: Option<AppRole>, is_super_admin: bool) -> Vec<NavItem> {
    if is_super_admin {
        return vec![
            item("shield", "Master Admin", "/master-admin"),
            item("building", "Companies", "/master-admin/companies"),
            item("truck", "Loads", "/loads"),
            item("users", "Drivers", "/drivers"),
            item("briefcase", "Brokers", "/brokers"),
            item("container", "Carriers", "/carriers"),
            DOCUMENTS,
            item("receipt", "Invoices", "/invoices"),
            item("bar-chart", "Analytics", "/analytics"),
            SETTINGS,
        ];
    }

    match role {
        Some(AppRole::Admin) => vec![
            item("layout-dashboard", "Dashboard", "/admin-dashboard"),
            item("user-plus", "Team", "/team"),
            item("truck", "Loads", "/loads"),
            item("users", "Drivers", "/drivers"),
            item("briefcase", "Brokers", "/brokers"),
            item("container", "Carriers", "/carriers"),
            DOCUMENTS,
            item("receipt", "Invoices", "/invoices"),
            item("bar-chart", "Analytics", "/analytics"),
            SETTINGS,
        ],
        Some(AppRole::Sales) => vec![
            item("layout-dashboard", "Dashboard", "/sales-dashboard"),
            item("truck", "My Loads", "/loads"),
            item("container", "Carriers", "/carriers"),
            item("users", "Drivers", "/drivers"),
            DOCUMENTS,
            item("trending-up", "My Performance", "/performance"),
            SETTINGS,
        ],
        Some(AppRole::Dispatcher) => vec![
            item("layout-dashboard", "Dashboard", "/dispatch-dashboard"),
            item("truck", "Loads", "/loads"),
            item("users", "Drivers", "/drivers"),
            item("map", "Map", "/map"),
            DOCUMENTS,
            SETTINGS,
        ],
        Some(AppRole::Treasury) => vec![
            item("layout-dashboard", "Dashboard", "/treasury-dashboard"),
            item("receipt", "Invoices", "/invoices"),
            item("file-bar-chart", "Reports", "/reports"),
            SETTINGS,
        ],
        Some(AppRole::Driver) => vec![
            item("steering-wheel", "Driver Portal", "/driver-portal"),
            DOCUMENTS,
            SETTINGS,
        ],
        Some(AppRole::Carrier) => vec![
            item("container", "Carrier Portal", "/carrier-portal"),
            DOCUMENTS,
            SETTINGS,
        ],
        Some(AppRole::Broker) | None => vec![
            item("layout-dashboard", "Dashboard", "/dashboard"),
            item("truck", "Loads", "/loads"),
            DOCUMENTS,
            SETTINGS,
        ],
    }
}

pub fn navigation_for(role: Option<AppRole>, is_super_admin: bool) -> NavigationResponse {
    NavigationResponse {
        role,
        is_super_admin,
        landing_route: landing_route(role, is_super_admin),
        items: nav_items(role, is_super_admin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_routes_per_role() {
        assert_eq!(landing_route(Some(AppRole::Admin), false), "/admin-dashboard");
        assert_eq!(landing_route(Some(AppRole::Dispatcher), false), "/dispatch-dashboard");
        assert_eq!(landing_route(Some(AppRole::Sales), false), "/sales-dashboard");
        assert_eq!(landing_route(Some(AppRole::Treasury), false), "/treasury-dashboard");
        assert_eq!(landing_route(Some(AppRole::Driver), false), "/driver-portal");
        assert_eq!(landing_route(Some(AppRole::Carrier), false), "/carrier-portal");
        assert_eq!(landing_route(Some(AppRole::Broker), false), "/dashboard");
        assert_eq!(landing_route(None, false), "/dashboard");
    }

    #[test]
    fn super_admin_lands_on_master_admin_regardless_of_role() {
        assert_eq!(landing_route(Some(AppRole::Driver), true), "/master-admin");
        assert_eq!(nav_items(Some(AppRole::Driver), true)[0].label, "Master Admin");
    }

    #[test]
    fn unknown_role_gets_the_default_menu() {
        let parsed = AppRole::parse("owner");
        assert_eq!(nav_items(parsed, false), nav_items(Some(AppRole::Broker), false));
        assert_eq!(nav_items(parsed, false)[0].route, "/dashboard");
    }

    #[test]
    fn treasury_menu_has_no_loads() {
        let items = nav_items(Some(AppRole::Treasury), false);
        assert!(items.iter().all(|i| i.route != "/loads"));
        assert!(items.iter().any(|i| i.label == "Invoices"));
    }

    #[test]
    fn first_item_of_each_role_is_its_landing_route() {
        for role in [
            AppRole::Admin,
            AppRole::Dispatcher,
            AppRole::Sales,
            AppRole::Treasury,
            AppRole::Driver,
            AppRole::Carrier,
        ] {
            assert_eq!(nav_items(Some(role), false)[0].route, landing_route(Some(role), false));
        }
    }
}
