use std::env;

/// AppConfig
///
/// Immutable runtime configuration of the navigation shell, loaded once at startup
/// and shared through the application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and how strict loading is.
    pub env: Env,
    // Address the HTTP shell binds to.
    pub bind_addr: String,
    // JSON file holding the persisted session record.
    pub session_store_path: String,
    // Where the guard sends unauthenticated attempts.
    pub login_path: String,
    // Destination after a login that carried no returnUrl.
    pub post_login_path: String,
    // Upper bound on redirect hops followed by a single navigation.
    pub max_redirects: usize,
}

/// Env
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Test-safe values that do not touch the environment.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:0".to_string(),
            session_store_path: ".session/test-storage.json".to_string(),
            login_path: "/login".to_string(),
            post_login_path: "/admin/dashboard".to_string(),
            max_redirects: 8,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `SESSION_STORE_PATH` is missing, and in any environment
    /// when `MAX_REDIRECTS` is set but not a number. The shell must not start with a
    /// session file location it guessed.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let session_store_path = match env {
            Env::Production => env::var("SESSION_STORE_PATH")
                .expect("FATAL: SESSION_STORE_PATH must be set in production."),
            Env::Local => env::var("SESSION_STORE_PATH")
                .unwrap_or_else(|_| ".session/local-storage.json".to_string()),
        };

        let max_redirects = match env::var("MAX_REDIRECTS") {
            Ok(raw) => raw
                .parse()
                .expect("FATAL: MAX_REDIRECTS must be a non-negative integer."),
            Err(_) => 8,
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            session_store_path,
            login_path: env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string()),
            post_login_path: env::var("POST_LOGIN_PATH")
                .unwrap_or_else(|_| "/admin/dashboard".to_string()),
            max_redirects,
        }
    }
}
