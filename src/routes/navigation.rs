use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Navigation Router Module
///
/// Exposes the navigator to the shell: issue a navigation, read back what the outlet
/// shows, and inspect recent attempts.
pub fn navigation_routes() -> Router<AppState> {
    Router::new()
        // POST /navigate
        // Resolves, guards and loads; redirects are followed server-side and listed as hops.
        .route("/navigate", post(handlers::navigate))
        // GET /navigation/current
        .route("/navigation/current", get(handlers::get_current_view))
        // GET /navigation/history
        .route("/navigation/history", get(handlers::get_history))
}
