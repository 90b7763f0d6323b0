mod settings;

pub use settings::{
    ApiConfig, DatabaseConfig, LoggingConfig, OtelConfig, PushConfig, RedisConfig, ServerConfig,
    Settings, StoreConfig,
};
