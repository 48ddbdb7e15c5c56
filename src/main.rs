use guarded_nav::{
    AppState, FileSessionStore, NavigationRegistry, Navigator, SessionService,
    app_routes::app_routes,
    config::{AppConfig, Env},
    create_router,
    storage::StoreState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point. Boots the navigation shell in order: configuration,
/// logging, session restore, route table validation, the navigator and finally the
/// HTTP server. Any step that cannot produce a usable component stops the process
/// before a single request is served.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // .env is read first so AppConfig::load() sees it; production without a
    // session store path panics here.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and request-level HTTP logs.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "guarded_nav=debug,tower_http=info,axum=trace".into());

    // 3. Logging Initialization
    // Pretty output for local development, JSON lines in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Session Restore
    // The persisted `isAuthenticated` record seeds the session flag; an unreadable
    // store starts logged out.
    let store = Arc::new(FileSessionStore::new(&config.session_store_path)) as StoreState;
    let session = Arc::new(SessionService::restore(store));

    // 5. Route Table Registration
    // Validated once at startup. A broken table never serves.
    let registry = match NavigationRegistry::register(app_routes()) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            tracing::error!(error = %e, "Invalid route table");
            std::process::exit(1);
        }
    };
    tracing::info!(views = ?registry.view_paths(), "Route table registered");

    // 6. Navigator
    // Observes the session through its own watch receiver.
    let navigator = Arc::new(Navigator::from_config(registry, session.view(), &config));

    // 7. Unified Application State
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        navigator,
        session,
        config,
    };
    let app = create_router(app_state);

    // 8. Server Startup
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %bind_addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server terminated");
    }
}
