use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_GEOCODING_API_URL: &str = "https://maps.googleapis.com";
const DEFAULT_SUPPORTED_COUNTRY: &str = "ua";
const DEFAULT_GEOCODING_LANGUAGE: &str = "uk";
const DEFAULT_CURRENCY: &str = "UAH";
const DEFAULT_ROLL_CATEGORY: &str = "rolls";
const DEFAULT_ORDER_TTL_SECS: u64 = 86_400;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Long-lived credential shared with the chat provider; the mini-app
    /// authentication key is derived from it
    #[validate(length(min = 16))]
    pub bot_credential: String,

    /// Base URL of the external order-management backend
    #[validate(url)]
    pub backend_api_url: String,

    /// API key sent as x-api-key on every backend call
    #[validate(length(min = 1))]
    pub backend_api_key: String,

    /// Private key of the payment signature scheme, shared with the backend
    #[validate(length(min = 1))]
    pub payment_signing_key: String,

    /// Base URL of the geocoding API
    #[serde(default = "default_geocoding_api_url")]
    #[validate(url)]
    pub geocoding_api_url: String,

    /// Geocoding API key
    #[serde(default)]
    pub geocoding_api_key: String,

    /// Lowercase ISO country code deliveries are restricted to
    #[serde(default = "default_supported_country")]
    #[validate(length(min = 2, max = 2))]
    pub supported_country: String,

    /// Language for geocoding results
    #[serde(default = "default_geocoding_language")]
    pub geocoding_language: String,

    /// Currency code used on invoices and checkout payloads
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Category tag whose quantities count toward the 4+1 promotion
    #[serde(default = "default_roll_category")]
    pub roll_category_id: String,

    /// Lifetime of a stored order in seconds; expired entries are swept
    /// lazily at insert time
    #[serde(default = "default_order_ttl_secs")]
    pub order_ttl_secs: u64,

    /// Timeout applied to every outbound call in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Skip checkout signature verification and rewrite sandbox result URLs
    #[serde(default)]
    pub test_mode: bool,

    /// Success page substituted into sandbox result URLs in test mode
    #[serde(default)]
    pub test_result_url: Option<String>,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_geocoding_api_url() -> String {
    DEFAULT_GEOCODING_API_URL.to_string()
}
fn default_supported_country() -> String {
    DEFAULT_SUPPORTED_COUNTRY.to_string()
}
fn default_geocoding_language() -> String {
    DEFAULT_GEOCODING_LANGUAGE.to_string()
}
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
fn default_roll_category() -> String {
    DEFAULT_ROLL_CATEGORY.to_string()
}
fn default_order_ttl_secs() -> u64 {
    DEFAULT_ORDER_TTL_SECS
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level {
        "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
        _ => Err(ValidationError::new("unknown_log_level")),
    }
}

impl AppConfig {
    /// Programmatic constructor used by tests and embedding callers; every
    /// optional field takes its default.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
        bot_credential: impl Into<String>,
        backend_api_url: impl Into<String>,
        backend_api_key: impl Into<String>,
        payment_signing_key: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            bot_credential: bot_credential.into(),
            backend_api_url: backend_api_url.into(),
            backend_api_key: backend_api_key.into(),
            payment_signing_key: payment_signing_key.into(),
            geocoding_api_url: default_geocoding_api_url(),
            geocoding_api_key: String::new(),
            supported_country: default_supported_country(),
            geocoding_language: default_geocoding_language(),
            currency: default_currency(),
            roll_category_id: default_roll_category(),
            order_ttl_secs: default_order_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            test_mode: false,
            test_result_url: None,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.cors_allow_any_origin || self.is_development()
    }

    pub fn order_ttl(&self) -> Duration {
        Duration::from_secs(self.order_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("order_gateway={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Secrets have no defaults on purpose; fail early with a clear message
    // instead of deserializing into a half-configured service.
    for key in [
        "bot_credential",
        "backend_api_url",
        "backend_api_key",
        "payment_signing_key",
    ] {
        if config.get_string(key).is_err() {
            error!(
                "{} is not configured. Set APP__{} or add it to {}/default.toml",
                key,
                key.to_uppercase(),
                CONFIG_DIR
            );
            return Err(AppConfigError::Load(ConfigError::NotFound(format!(
                "{key} is required but not configured"
            ))));
        }
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
