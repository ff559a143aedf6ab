/*
 * Responsibility
 * - 環境変数の読み込み (PORT, TOKEN_CIPHER_KEY, KEY_SERVICE_BASE_URL など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;
use url::Url;

use crate::services::assertion::parse_bindings;
use crate::services::policy::RoutePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// What happens to routes that have no policy registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisteredRoutes {
    Exempt,
    Deny,
}

impl UnregisteredRoutes {
    pub fn policy(&self) -> RoutePolicy {
        match self {
            Self::Exempt => RoutePolicy::Exempt,
            Self::Deny => RoutePolicy::deny(),
        }
    }
}

impl FromStr for UnregisteredRoutes {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exempt" => Ok(Self::Exempt),
            "deny" => Ok(Self::Deny),
            _ => Err(ConfigError::Invalid("UNREGISTERED_ROUTES")),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // never logged
    pub token_cipher_key: String,

    pub key_service_base_url: Option<Url>,
    pub key_fetch_timeout: Duration,

    pub unregistered_routes: UnregisteredRoutes,

    /// (assertion, path param) pairs
    pub assertion_path_bindings: Vec<(String, String)>,
    /// (assertion, header name) pairs
    pub assertion_header_bindings: Vec<(String, String)>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("token_cipher_key", &"<redacted>")
            .field("key_service_base_url", &self.key_service_base_url)
            .field("key_fetch_timeout", &self.key_fetch_timeout)
            .field("unregistered_routes", &self.unregistered_routes)
            .field("assertion_path_bindings", &self.assertion_path_bindings)
            .field("assertion_header_bindings", &self.assertion_header_bindings)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = match var("PORT") {
            Some(s) => s.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = var("APP_ENV")
            .map(|raw| AppEnv::parse(&raw))
            .unwrap_or(AppEnv::Development);

        let token_cipher_key = var("TOKEN_CIPHER_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("TOKEN_CIPHER_KEY"))?;

        let key_service_base_url = var("KEY_SERVICE_BASE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|s| Url::parse(&s).map_err(|_| ConfigError::Invalid("KEY_SERVICE_BASE_URL")))
            .transpose()?;

        let key_fetch_timeout = match var("KEY_FETCH_TIMEOUT_MS") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or(ConfigError::Invalid("KEY_FETCH_TIMEOUT_MS"))?,
            None => Duration::from_millis(2000),
        };

        let unregistered_routes = match var("UNREGISTERED_ROUTES") {
            Some(s) => s.parse()?,
            None => UnregisteredRoutes::Exempt,
        };

        let assertion_path_bindings = parse_bindings(&var("ASSERTION_PATH_BINDINGS").unwrap_or_default())
            .map_err(|_| ConfigError::Invalid("ASSERTION_PATH_BINDINGS"))?;

        let assertion_header_bindings =
            parse_bindings(&var("ASSERTION_HEADER_BINDINGS").unwrap_or_default())
                .ok()
                .filter(|pairs| {
                    pairs
                        .iter()
                        .all(|(_, header)| HeaderName::from_bytes(header.as_bytes()).is_ok())
                })
                .ok_or(ConfigError::Invalid("ASSERTION_HEADER_BINDINGS"))?;

        Ok(Self {
            addr,
            app_env,
            token_cipher_key,
            key_service_base_url,
            key_fetch_timeout,
            unregistered_routes,
            assertion_path_bindings,
            assertion_header_bindings,
        })
    }
}
