use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::domain::ports::Credentials;
use crate::errors::AppError;
use crate::infrastructure::dto::Scalar;

pub const FALLBACK_HOST: &str = "127.0.0.1";
pub const FALLBACK_PORT: u16 = 5173;

const DEFAULT_POLL_MS: u64 = 3_000;
const DEFAULT_CATALOG_POLL_MS: u64 = 5_000;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SESSION_FILE: &str = ".stock-requests/session.json";

/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub host: String,
    pub port: u16,
}

impl ApiEndpoint {
    pub fn fallback() -> Self {
        Self {
            host: FALLBACK_HOST.to_string(),
            port: FALLBACK_PORT,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Set when `API_HOST` is given; takes precedence over `CONFIG_URL`.
    pub endpoint: Option<ApiEndpoint>,
    pub config_url: Option<String>,
    pub poll_interval: Duration,
    pub catalog_poll_interval: Duration,
    pub request_timeout: Duration,
    pub session_file: PathBuf,
    pub credentials: Option<Credentials>,
}

impl AppConfig {
    /// Read configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = match var("API_HOST") {
            Some(host) => Some(ApiEndpoint {
                host,
                port: match var("API_PORT") {
                    Some(port) => parse_port("API_PORT", &port)?,
                    None => FALLBACK_PORT,
                },
            }),
            None => None,
        };

        let credentials = match (var("STOCK_USERNAME"), var("STOCK_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        Ok(Self {
            endpoint,
            config_url: var("CONFIG_URL"),
            poll_interval: millis(&var, "POLL_INTERVAL_MS", DEFAULT_POLL_MS)?,
            catalog_poll_interval: millis(&var, "CATALOG_POLL_INTERVAL_MS", DEFAULT_CATALOG_POLL_MS)?,
            request_timeout: millis(&var, "REQUEST_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            session_file: var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
            credentials,
        })
    }
}

fn millis(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, AppError> {
    match var(key) {
        Some(raw) => {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("{key} must be a number of milliseconds, got '{raw}'")))?;
            if ms == 0 {
                return Err(AppError::Config(format!("{key} must be greater than zero")));
            }
            Ok(Duration::from_millis(ms))
        }
        None => Ok(Duration::from_millis(default)),
    }
}

fn parse_port(key: &str, raw: &str) -> Result<u16, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{key} must be a valid port, got '{raw}'")))
}

#[derive(Deserialize)]
struct RemoteConfig {
    #[serde(rename = "API_HOST")]
    api_host: String,
    #[serde(rename = "API_PORT")]
    api_port: Scalar,
}

impl RemoteConfig {
    fn into_endpoint(self) -> Result<ApiEndpoint, AppError> {
        let port = self.api_port.as_u32("API_PORT")?;
        Ok(ApiEndpoint {
            host: self.api_host,
            port: u16::try_from(port)
                .map_err(|_| AppError::Config(format!("API_PORT out of range: {port}")))?,
        })
    }
}

/// Resolves the backend endpoint once and caches it for every later call.
///
/// An explicit endpoint wins. Otherwise the runtime config document is
/// fetched; if that fails the fallback endpoint is used.
pub struct ConfigResolver {
    client: Client,
    explicit: Option<ApiEndpoint>,
    config_url: Option<String>,
    resolved: OnceCell<ApiEndpoint>,
}

impl ConfigResolver {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            explicit: config.endpoint.clone(),
            config_url: config.config_url.clone(),
            resolved: OnceCell::new(),
        })
    }

    pub async fn resolve(&self) -> ApiEndpoint {
        self.resolved
            .get_or_init(|| async {
                if let Some(endpoint) = &self.explicit {
                    return endpoint.clone();
                }
                let Some(url) = &self.config_url else {
                    return ApiEndpoint::fallback();
                };
                match self.fetch(url).await {
                    Ok(endpoint) => {
                        log::info!("Loaded backend endpoint {} from {url}", endpoint.base_url());
                        endpoint
                    }
                    Err(e) => {
                        log::warn!("Could not load {url} ({e}), using {FALLBACK_HOST}:{FALLBACK_PORT}");
                        ApiEndpoint::fallback()
                    }
                }
            })
            .await
            .clone()
    }

    async fn fetch(&self, url: &str) -> Result<ApiEndpoint, AppError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Config(format!("HTTP {}", response.status().as_u16())));
        }
        let remote: RemoteConfig = response.json().await?;
        remote.into_endpoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.endpoint, None);
        assert_eq!(cfg.poll_interval, Duration::from_secs(3));
        assert_eq!(cfg.catalog_poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.session_file, PathBuf::from(DEFAULT_SESSION_FILE));
        assert!(cfg.credentials.is_none());
    }

    #[test]
    fn explicit_endpoint_and_credentials() {
        let cfg = config(&[
            ("API_HOST", "10.1.1.20"),
            ("API_PORT", "3008"),
            ("STOCK_USERNAME", "admin"),
            ("STOCK_PASSWORD", "pw"),
            ("POLL_INTERVAL_MS", "1500"),
        ])
        .unwrap();
        assert_eq!(cfg.endpoint.unwrap().base_url(), "http://10.1.1.20:3008");
        assert_eq!(cfg.credentials.unwrap().username, "admin");
        assert_eq!(cfg.poll_interval, Duration::from_millis(1500));
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        assert!(matches!(
            config(&[("API_HOST", "h"), ("API_PORT", "http")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config(&[("POLL_INTERVAL_MS", "0")]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn remote_port_may_be_a_string() {
        let remote: RemoteConfig =
            serde_json::from_str(r#"{"API_HOST": "192.168.0.4", "API_PORT": "3008"}"#).unwrap();
        assert_eq!(
            remote.into_endpoint().unwrap(),
            ApiEndpoint {
                host: "192.168.0.4".into(),
                port: 3008
            }
        );
    }

    #[tokio::test]
    async fn unreachable_config_falls_back() {
        let mut cfg = config(&[]).unwrap();
        cfg.config_url = Some("http://127.0.0.1:9/config.json".into());
        cfg.request_timeout = Duration::from_millis(500);
        let resolver = ConfigResolver::new(&cfg).unwrap();
        assert_eq!(resolver.resolve().await, ApiEndpoint::fallback());
    }
}
