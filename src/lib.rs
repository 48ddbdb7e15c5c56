use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Navigation core: session flag, route table, access decision, navigator.
pub mod auth;
pub mod guard;
pub mod loader;
pub mod navigator;
pub mod registry;

// Supporting pieces.
pub mod app_routes;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod storage;

// HTTP surface of the shell.
pub mod routes;
use routes::{navigation, session};

// --- Public Re-exports ---

pub use auth::{SessionService, SessionState, SessionView};
pub use config::AppConfig;
pub use error::{ConfigurationError, LoaderError, NavError};
pub use guard::AccessGuard;
pub use loader::{MockViewLoader, StaticViewLoader, ViewLoader};
pub use navigator::{Navigator, NavigatorState};
pub use registry::{NavigationEntry, NavigationRegistry};
pub use storage::{FileSessionStore, MemorySessionStore, SessionStore, StoreState};

/// ApiDoc
///
/// OpenAPI document of the shell's HTTP surface, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_session, handlers::login, handlers::logout,
        handlers::navigate, handlers::get_current_view, handlers::get_history
    ),
    components(
        schemas(
            models::SessionSnapshot, models::LoginRequest, models::LoginResponse,
            models::NavigationDirective, models::NavigateRequest, models::NavigationReport,
            models::NavigationOutcome, models::RedirectHop, models::RedirectReason,
            models::ActiveView, models::ViewDescriptor, models::NavigationRecord,
        )
    ),
    tags(
        (name = "guarded-nav", description = "Guarded navigation shell API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler: the navigator, the session
/// service that owns the authentication flag, and the loaded configuration.
/// Each field is cheap to clone; handlers extract only the piece they need through
/// the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    pub navigator: NavigatorState,
    pub session: SessionState,
    pub config: AppConfig,
}

impl FromRef<AppState> for NavigatorState {
    fn from_ref(app_state: &AppState) -> NavigatorState {
        app_state.navigator.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.session.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the shell's routing structure: the OpenAPI document and Swagger UI,
/// the session routes, the navigation routes, and the global middleware stack.
/// Registers the application state last so every merged router shares it.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    // The shell is driven by a separate UI origin during development.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(session::session_routes())
        .merge(navigation::navigation_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    // ServiceBuilder applies these top to bottom, so the id exists before the
    // trace span is opened.
    base_router
        .layer(
            ServiceBuilder::new()
                // Every request gets a UUID correlation id...
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // ...recorded on its tracing span...
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // ...and echoed back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (outermost)
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, keyed by its `x-request-id` so that the navigation spans
/// opened inside handlers nest under it.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
