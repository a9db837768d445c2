use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub screening: ScreeningConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            screening: ScreeningConfig::from_env()?,
        })
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Whether polling a slot removes the buffered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollMode {
    /// A read leaves the result in place for subsequent polls.
    #[default]
    Retain,
    /// Single delivery: a read removes the result it returns.
    Consume,
}

impl PollMode {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "consume" => Ok(Self::Consume),
            _ => Err(ConfigError::InvalidPollMode {
                value: value.to_string(),
            }),
        }
    }

    pub fn consumes(self) -> bool {
        matches!(self, Self::Consume)
    }
}

/// Lookup table from a selectable provider option to its submission endpoint.
///
/// Populated from `SCREENING_ENDPOINT_<PROVIDER>` environment entries; names
/// are matched case-insensitively. A selected provider without an entry is a
/// reported configuration failure at submission time.
#[derive(Debug, Clone, Default)]
pub struct ProviderDirectory {
    endpoints: BTreeMap<String, String>,
}

impl ProviderDirectory {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let endpoints = entries
            .into_iter()
            .map(|(name, endpoint)| (name.as_ref().trim().to_ascii_lowercase(), endpoint.into()))
            .collect();
        Self { endpoints }
    }

    pub fn endpoint_for(&self, provider: &str) -> Option<&str> {
        self.endpoints
            .get(&provider.trim().to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

const ENDPOINT_ENV_PREFIX: &str = "SCREENING_ENDPOINT_";

/// Settings for the screening workflow: provider endpoints, the callback URL
/// base handed to providers, and polling behavior.
#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    pub providers: ProviderDirectory,
    pub callback_base_url: String,
    pub poll_mode: PollMode,
    pub poll_interval_secs: u64,
}

impl ScreeningConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let entries = env::vars().filter_map(|(key, value)| {
            let name = key.strip_prefix(ENDPOINT_ENV_PREFIX)?;
            if name.is_empty() || value.trim().is_empty() {
                return None;
            }
            Some((name.to_string(), value))
        });
        let providers = ProviderDirectory::from_entries(entries);

        let callback_base_url = env::var("CALLBACK_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let poll_mode = match env::var("POLL_MODE") {
            Ok(value) => PollMode::from_str(&value)?,
            Err(_) => PollMode::default(),
        };

        let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidPollInterval)?;

        Ok(Self {
            providers,
            callback_base_url,
            poll_mode,
            poll_interval_secs,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPollMode { value: String },
    InvalidPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPollMode { value } => {
                write!(f, "POLL_MODE must be 'retain' or 'consume', got '{value}'")
            }
            ConfigError::InvalidPollInterval => {
                write!(f, "POLL_INTERVAL_SECS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPollMode { .. }
            | ConfigError::InvalidPollInterval => None,
        }
    }
}
