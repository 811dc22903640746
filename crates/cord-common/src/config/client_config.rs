//! Client configuration
//!
//! Loads configuration from environment variables or a config file.

use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;

/// How the client authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A ready-to-use token sent verbatim in Identify and `Authorization`
    Token(String),
    /// Email and password, exchanged for a token before the gateway is opened
    Password { email: String, password: String },
}

impl Credentials {
    /// Pick credentials from optional token / email / password values
    ///
    /// A token wins over an email and password pair.
    pub fn resolve(
        token: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<Self, ConfigError> {
        match (token.filter(|t| !t.is_empty()), email, password) {
            (Some(token), _, _) => Ok(Self::Token(token)),
            (None, Some(email), Some(password)) => Ok(Self::Password { email, password }),
            (None, Some(_), None) => Err(ConfigError::MissingVar("CORD_PASSWORD")),
            (None, _, _) => Err(ConfigError::MissingVar("CORD_TOKEN")),
        }
    }

    /// The token, if no exchange is needed
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Token(token) => Some(token),
            Self::Password { .. } => None,
        }
    }
}

// Never print secrets
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Gateway client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    /// REST API base URL, without trailing slash
    pub api_base: String,
    /// Gateway protocol version appended to the socket URL
    pub gateway_version: u8,
    /// Client name declared in the Identify properties
    pub client_name: String,
    /// Member count above which the server sends only online members
    pub large_threshold: u32,
    /// Capacity of the outbound frame queue
    pub outbound_buffer: usize,
    /// Timeout for REST requests
    pub request_timeout_secs: u64,
    /// Publish `DEBUG` diagnostic events on the event bus
    pub debug: bool,
}

/// Flat, all-optional shape shared by the env and file loaders
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    token: Option<String>,
    email: Option<String>,
    password: Option<String>,
    api_base: Option<String>,
    gateway_version: Option<u8>,
    client_name: Option<String>,
    large_threshold: Option<u32>,
    outbound_buffer: Option<usize>,
    request_timeout_secs: Option<u64>,
    debug: Option<bool>,
}

// Default value functions
fn default_api_base() -> String {
    "https://discordapp.com/api".to_string()
}

fn default_gateway_version() -> u8 {
    6
}

fn default_client_name() -> String {
    "cord".to_string()
}

fn default_large_threshold() -> u32 {
    50
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, value)),
        Err(_) => Ok(None),
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the credentials
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_base: default_api_base(),
            gateway_version: default_gateway_version(),
            client_name: default_client_name(),
            large_threshold: default_large_threshold(),
            outbound_buffer: default_outbound_buffer(),
            request_timeout_secs: default_request_timeout_secs(),
            debug: false,
        }
    }

    /// Shorthand for token authentication
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Credentials::Token(token.into()))
    }

    /// Override the REST API base URL
    #[must_use]
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Toggle `DEBUG` events on the bus
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Reads `CORD_TOKEN`, or `CORD_EMAIL` and `CORD_PASSWORD`, plus the
    /// optional `CORD_API_BASE`, `CORD_GATEWAY_VERSION`, `CORD_CLIENT_NAME`,
    /// `CORD_LARGE_THRESHOLD`, `CORD_OUTBOUND_BUFFER`,
    /// `CORD_REQUEST_TIMEOUT_SECS` and `CORD_DEBUG`.
    ///
    /// # Errors
    /// Returns an error if no credentials are set or a value does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let raw = RawConfig {
            token: env::var("CORD_TOKEN").ok(),
            email: env::var("CORD_EMAIL").ok(),
            password: env::var("CORD_PASSWORD").ok(),
            api_base: env::var("CORD_API_BASE").ok(),
            gateway_version: parse_var("CORD_GATEWAY_VERSION")?,
            client_name: env::var("CORD_CLIENT_NAME").ok(),
            large_threshold: parse_var("CORD_LARGE_THRESHOLD")?,
            outbound_buffer: parse_var("CORD_OUTBOUND_BUFFER")?,
            request_timeout_secs: parse_var("CORD_REQUEST_TIMEOUT_SECS")?,
            debug: parse_var("CORD_DEBUG")?,
        };

        Self::from_raw(raw)
    }

    /// Load configuration from a file (TOML, JSON, YAML, ...), with `CORD_*`
    /// environment variables layered on top
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("CORD"))
            .build()?;

        Self::from_raw(settings.try_deserialize()?)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let credentials = Credentials::resolve(raw.token, raw.email, raw.password)?;

        let outbound_buffer = raw.outbound_buffer.unwrap_or_else(default_outbound_buffer);
        if outbound_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "outbound_buffer",
                "must be at least 1".to_string(),
            ));
        }

        let mut config = Self::new(credentials)
            .api_base(raw.api_base.unwrap_or_else(default_api_base))
            .debug(raw.debug.unwrap_or(false));
        config.gateway_version = raw.gateway_version.unwrap_or_else(default_gateway_version);
        config.client_name = raw.client_name.unwrap_or_else(default_client_name);
        config.large_threshold = raw.large_threshold.unwrap_or_else(default_large_threshold);
        config.outbound_buffer = outbound_buffer;
        config.request_timeout_secs = raw
            .request_timeout_secs
            .unwrap_or_else(default_request_timeout_secs);

        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
