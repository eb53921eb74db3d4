use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ACTIVE_APPLICATIONS: usize = 3;
pub const DEFAULT_MAX_POSTINGS_PER_REP: usize = 5;
pub const DEFAULT_MAX_CAPACITY: u8 = 10;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the placement service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub limits: PlacementLimits,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let limits = PlacementLimits {
            max_active_applications: limit_from_env(
                "PLACEMENT_MAX_ACTIVE_APPLICATIONS",
                DEFAULT_MAX_ACTIVE_APPLICATIONS,
            )?,
            max_postings_per_rep: limit_from_env(
                "PLACEMENT_MAX_POSTINGS_PER_REP",
                DEFAULT_MAX_POSTINGS_PER_REP,
            )?,
            max_capacity: limit_from_env("PLACEMENT_MAX_CAPACITY", DEFAULT_MAX_CAPACITY)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            limits,
        })
    }
}

fn limit_from_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::InvalidLimit { name, value: raw }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Fixed caps enforced by the ledger and the posting workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementLimits {
    /// Applications a student may hold in PENDING or SUCCESSFUL at once.
    pub max_active_applications: usize,
    /// Live (non-rejected) postings a representative may own.
    pub max_postings_per_rep: usize,
    /// Upper bound on a posting's capacity.
    pub max_capacity: u8,
}

impl Default for PlacementLimits {
    fn default() -> Self {
        Self {
            max_active_applications: DEFAULT_MAX_ACTIVE_APPLICATIONS,
            max_postings_per_rep: DEFAULT_MAX_POSTINGS_PER_REP,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLimit { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLimit { name, value } => {
                write!(f, "{name} must be a positive integer (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidLimit { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
