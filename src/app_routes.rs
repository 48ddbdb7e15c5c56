use std::sync::Arc;
use std::time::Duration;

use crate::{
    loader::{LoaderRef, StaticViewLoader},
    models::{Capability, ViewDescriptor},
    registry::NavigationEntry,
};

/// Simulated fetch time of the admin chunk.
const ADMIN_CHUNK_LATENCY: Duration = Duration::from_millis(25);

fn page(component: &str) -> LoaderRef {
    StaticViewLoader::component(component)
}

fn admin_page(component: &str) -> LoaderRef {
    Arc::new(StaticViewLoader::new(ViewDescriptor::new(component)).with_latency(ADMIN_CHUNK_LATENCY))
}

/// app_routes
///
/// Route table of the demo application served by the binary:
///
/// - `/`, `/login`, `/users`: public pages;
/// - `/admin/*`: gated behind `logged-in`. `/admin` itself forwards to the dashboard;
/// - anything else falls back to `/`.
pub fn app_routes() -> Vec<NavigationEntry> {
    vec![
        NavigationEntry::view("", page("PublicHome")).titled("Home"),
        NavigationEntry::view("login", page("Login")).titled("Login"),
        NavigationEntry::view("users", page("UsersList")).titled("Users"),
        NavigationEntry::parent(
            "admin",
            vec![
                NavigationEntry::redirect("", "dashboard"),
                NavigationEntry::view("dashboard", admin_page("Dashboard")).titled("Admin Dashboard"),
                NavigationEntry::view("profile", admin_page("Profile")).titled("Admin Profile"),
            ],
        )
        .require(Capability::logged_in()),
        NavigationEntry::wildcard(""),
    ]
}
