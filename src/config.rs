//! Application configuration loaded from environment variables.
//!
//! Both binaries honour a `.env` file in the working directory. Provider
//! credentials are only ever read from the environment.

use std::env;
use std::time::Duration;

use crate::ingest::retry::RetryPolicy;

const DEFAULT_ORIGINS: [&str; 3] = ["http://localhost", "http://127.0.0.1", "null"];

/// Which store backs the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Cloud Firestore in the given project
    Firestore { project_id: String },
    /// Process-local map, lost on restart
    Memory,
}

/// API server configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Origins allowed by CORS in addition to any localhost origin
    pub allowed_origins: Vec<String>,
    pub store: StoreBackend,
}

impl Config {
    /// Config for tests: in-memory store, default origins.
    pub fn test_default() -> Self {
        Self {
            port: 8000,
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            store: StoreBackend::Memory,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "firestore" => StoreBackend::Firestore {
                project_id: env::var("GCP_PROJECT_ID")
                    .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            },
            other => return Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|raw| split_list(&raw))
            .unwrap_or_else(|_| DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect());

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            allowed_origins,
            store,
        })
    }
}

/// Environment variable names holding one provider's Algolia credentials.
#[derive(Debug, Clone, Copy)]
pub struct AlgoliaEnv {
    pub app_id: &'static str,
    pub api_key: &'static str,
    /// Optional endpoint override
    pub url: &'static str,
}

/// Algolia application credentials for one provider.
#[derive(Debug, Clone)]
pub struct AlgoliaCredentials {
    pub app_id: String,
    pub api_key: String,
    /// Full multi-query endpoint; derived from the app id unless overridden
    pub endpoint: String,
}

impl AlgoliaCredentials {
    /// Read credentials from the variables named in `vars`.
    pub fn from_env(vars: &AlgoliaEnv) -> Result<Self, ConfigError> {
        let app_id = env::var(vars.app_id)
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing(vars.app_id))?;
        let api_key = env::var(vars.api_key)
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing(vars.api_key))?;
        let endpoint = env::var(vars.url).unwrap_or_else(|_| default_algolia_endpoint(&app_id));

        Ok(Self {
            app_id,
            api_key,
            endpoint,
        })
    }
}

/// Multi-query endpoint Algolia serves for an application id.
pub fn default_algolia_endpoint(app_id: &str) -> String {
    format!(
        "https://{}-dsn.algolia.net/1/indexes/*/queries",
        app_id.to_lowercase()
    )
}

/// Ingestion CLI configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Base URL of the aggregator API
    pub api_url: String,
    /// Mapo Tapo calendar page
    pub mapo_tapo_url: String,
    /// Pause between consecutive provider requests
    pub request_delay: Duration,
    /// Per-request network timeout
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            mapo_tapo_url: "https://www.mapotapo.com/search?view=calendar".to_string(),
            request_delay: Duration::from_millis(500),
            http_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl IngestConfig {
    /// Load ingestion settings. Provider credentials are resolved separately
    /// so that a run only requires the keys of the provider it scrapes.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let retry = RetryPolicy {
            max_attempts: parse_var("INGEST_RETRY_MAX_ATTEMPTS")?
                .unwrap_or(defaults.retry.max_attempts),
            ..defaults.retry
        };

        Ok(Self {
            api_url: env::var("AGGREGATOR_API_URL").unwrap_or(defaults.api_url),
            mapo_tapo_url: env::var("MAPO_TAPO_CALENDAR_URL").unwrap_or(defaults.mapo_tapo_url),
            request_delay: parse_var("INGEST_REQUEST_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_delay),
            http_timeout: parse_var("INGEST_HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            retry,
        })
    }

    /// HTTP client shared by every request of a run.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("adventure-aggregator/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_algolia_endpoint() {
        assert_eq!(
            default_algolia_endpoint("WYLT2EXVRI"),
            "https://wylt2exvri-dsn.algolia.net/1/indexes/*/queries"
        );
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("http://localhost, null,,https://example.org "),
            vec!["http://localhost", "null", "https://example.org"]
        );
    }

    #[test]
    fn test_algolia_credentials_from_env() {
        let vars = AlgoliaEnv {
            app_id: "CONFIG_TEST_ALGOLIA_APP_ID",
            api_key: "CONFIG_TEST_ALGOLIA_API_KEY",
            url: "CONFIG_TEST_ALGOLIA_URL",
        };
        env::set_var(vars.app_id, "APPID");
        env::set_var(vars.api_key, " key ");

        let creds = AlgoliaCredentials::from_env(&vars).expect("credentials");

        assert_eq!(creds.app_id, "APPID");
        assert_eq!(creds.api_key, "key");
        assert_eq!(
            creds.endpoint,
            "https://appid-dsn.algolia.net/1/indexes/*/queries"
        );
    }

    #[test]
    fn test_missing_credentials_are_reported() {
        let vars = AlgoliaEnv {
            app_id: "CONFIG_TEST_MISSING_APP_ID",
            api_key: "CONFIG_TEST_MISSING_API_KEY",
            url: "CONFIG_TEST_MISSING_URL",
        };
        let err = AlgoliaCredentials::from_env(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CONFIG_TEST_MISSING_APP_ID")));
    }
}
