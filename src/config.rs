//! Application configuration loaded from environment variables.

use crate::services::places::DEFAULT_MAX_CONCURRENT_PLACE_QUERIES;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store; data is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", raw.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Collection holding user documents
    pub users_collection: String,
    /// Upper bound on per-place queries in flight during classification
    pub max_concurrent_place_queries: usize,
    /// Interval for re-evaluating live queries; `None` disables polling
    pub refresh_interval: Option<Duration>,
}

impl Config {
    /// Config for tests: in-memory store, no polling.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            users_collection: "users".to_string(),
            max_concurrent_place_queries: DEFAULT_MAX_CONCURRENT_PLACE_QUERIES,
            refresh_interval: None,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StoreBackend::Memory,
        };

        let gcp_project_id = match env::var("GCP_PROJECT_ID") {
            Ok(id) => id,
            Err(_) if store_backend == StoreBackend::Firestore => {
                return Err(ConfigError::Missing("GCP_PROJECT_ID"))
            }
            Err(_) => "local-dev".to_string(),
        };

        let refresh_secs: u64 = parse_var("REFRESH_INTERVAL_SECS", 0)?;

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id,
            port: parse_var("PORT", 8080)?,
            store_backend,
            users_collection: env::var("USERS_COLLECTION")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| "users".to_string()),
            max_concurrent_place_queries: parse_var(
                "MAX_CONCURRENT_PLACE_QUERIES",
                DEFAULT_MAX_CONCURRENT_PLACE_QUERIES,
            )?
            .max(1),
            refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
        })
    }
}

/// Read and parse an optional variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
