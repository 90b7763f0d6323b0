use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// PostgreSQL pool, required when `store.backend = "postgres"`
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub otel: OtelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Webhook API key; `None` disables the check
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Run the Pub/Sub change-feed subscriber
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Channels or glob patterns carrying change events
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// `memory` or `postgres`
    #[serde(default = "default_store_backend")]
    pub backend: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// `log` or `fcm`
    #[serde(default = "default_push_backend")]
    pub backend: String,
    #[serde(default = "default_push_endpoint")]
    pub endpoint: String,
    pub project_id: Option<String>,
    pub access_token: Option<String>,
    #[serde(default = "default_push_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_true() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_channels() -> Vec<String> {
    vec!["documents:*".to_string()]
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    300 // 5 minutes
}

fn default_push_backend() -> String {
    "log".to_string()
}

fn default_push_endpoint() -> String {
    "https://fcm.googleapis.com".to_string()
}

fn default_push_timeout() -> u64 {
    10
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "transition-notifier".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("redis.enabled", true)?
            .set_default("redis.url", default_redis_url())?
            .set_default("redis.channels", default_channels())?
            .set_default("store.backend", default_store_backend())?
            .set_default("push.backend", default_push_backend())?
            .set_default("push.endpoint", default_push_endpoint())?
            .set_default("push.timeout_seconds", default_push_timeout() as i64)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER__PORT, REDIS__CHANNELS, PUSH__ACCESS_TOKEN, DATABASE__URL, etc.
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("redis.channels")
                    .with_list_parse_key("server.cors_origins"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_redis_url(),
            channels: default_channels(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            backend: default_push_backend(),
            endpoint: default_push_endpoint(),
            project_id: None,
            access_token: None,
            timeout_seconds: default_push_timeout(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}
