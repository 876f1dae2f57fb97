use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

pub use persistence::db::DatabaseConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Location sampling while a session is active
    pub sharing: SharingConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    pub identity: IdentityConfig,
    pub location: LocationConfig,
    pub records: RecordsConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SharingConfig {
    /// Milliseconds between location fixes while sharing
    pub sampling_interval_ms: u64,

    /// How long stop waits for an in-flight sample before deactivating
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

impl SharingConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Platform identifier written to new records
    #[serde(default = "default_device_type")]
    pub device_type: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
        }
    }
}

/// Upper bound for `identity.expires_secs`: one hundred years.
pub const MAX_IDENTITY_EXPIRES_SECS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Key/value file holding the device id
    #[serde(default = "default_identity_path")]
    pub path: String,

    /// Seconds until the stored id expires; unset never expires
    #[serde(default)]
    pub expires_secs: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationProviderKind {
    Fixed,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_location_provider")]
    pub provider: LocationProviderKind,

    /// Coordinates reported by the fixed provider
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,

    /// Position endpoint for the http provider
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_location_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordsBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    #[serde(default = "default_records_backend")]
    pub backend: RecordsBackend,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_stop_grace_ms() -> u64 {
    2000
}
fn default_device_type() -> String {
    std::env::consts::OS.to_string()
}
fn default_identity_path() -> String {
    "data/storage.json".to_string()
}
fn default_location_provider() -> LocationProviderKind {
    LocationProviderKind::Fixed
}
fn default_location_timeout_ms() -> u64 {
    5000
}
fn default_records_backend() -> RecordsBackend {
    RecordsBackend::Postgres
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SL__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SL").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// This method creates a config entirely from defaults and overrides,
    /// without relying on config files (which may not be accessible during tests).
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30

            [logging]
            level = "info"
            format = "json"

            [sharing]
            sampling_interval_ms = 5000
            stop_grace_ms = 2000

            [device]
            device_type = "android"

            [identity]
            path = "data/storage.json"

            [location]
            provider = "fixed"
            latitude = 13.7563
            longitude = 100.5018
            url = ""
            timeout_ms = 5000

            [records]
            backend = "memory"

            [database]
            url = ""
            max_connections = 5
            min_connections = 1
            connect_timeout_secs = 10
            idle_timeout_secs = 600
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.sharing.sampling_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "sharing.sampling_interval_ms must be a positive number of milliseconds"
                    .to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if let Some(secs) = self.identity.expires_secs {
            if !(1..=MAX_IDENTITY_EXPIRES_SECS).contains(&secs) {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "identity.expires_secs must be between 1 and {MAX_IDENTITY_EXPIRES_SECS}, or unset to never expire"
                )));
            }
        }

        match self.location.provider {
            LocationProviderKind::Fixed => {
                let (Some(latitude), Some(longitude)) =
                    (self.location.latitude, self.location.longitude)
                else {
                    return Err(ConfigValidationError::MissingRequired(
                        "location.latitude and location.longitude are required for the fixed provider"
                            .to_string(),
                    ));
                };
                domain::models::Position::new(latitude, longitude)
                    .check_range()
                    .map_err(|e| ConfigValidationError::InvalidValue(e.to_string()))?;
            }
            LocationProviderKind::Http => {
                if self.location.url.is_empty() {
                    return Err(ConfigValidationError::MissingRequired(
                        "SL__LOCATION__URL must be set for the http provider".to_string(),
                    ));
                }
            }
        }

        if self.records.backend == RecordsBackend::Postgres {
            if self.database.url.is_empty() {
                return Err(ConfigValidationError::MissingRequired(
                    "SL__DATABASE__URL environment variable must be set".to_string(),
                ));
            }
            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigValidationError::InvalidValue(
                    "min_connections cannot exceed max_connections".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
