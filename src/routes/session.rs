use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Session Router Module
///
/// Endpoints around the process-wide session flag. The shell reads `/session` to decide
/// which navigation affordances to show; only `login` and `logout` mutate the flag.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // GET /session
        .route("/session", get(handlers::get_session))
        // POST /session/login
        // Responds with the path to resume at (the saved returnUrl, if any).
        .route("/session/login", post(handlers::login))
        // POST /session/logout
        // Responds with a directive to navigate to the root path.
        .route("/session/logout", post(handlers::logout))
}
