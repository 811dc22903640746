//! Tracing and logging setup
//!
//! Installs a `tracing` subscriber for applications built on the client.
//! `RUST_LOG` always wins; otherwise the filter is built from
//! [`TracingConfig`].

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target of the per-frame session logs
const FRAME_TARGET: &str = "cord_gateway::session";

/// Subscriber options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for everything without a more specific directive
    pub level: Level,
    /// Log every gateway frame received and sent (trace level on the session)
    pub frames: bool,
    /// JSON lines instead of human-readable output
    pub json: bool,
    pub file_line: bool,
    pub thread_names: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            frames: false,
            json: false,
            file_line: false,
            thread_names: false,
        }
    }
}

impl TracingConfig {
    /// Verbose output for following a session frame by frame
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            frames: true,
            json: false,
            file_line: true,
            thread_names: true,
        }
    }

    /// JSON output for long-running bots
    #[must_use]
    pub fn production() -> Self {
        Self {
            json: true,
            ..Self::default()
        }
    }

    /// Filter directives used when `RUST_LOG` is unset
    pub fn directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        if self.frames {
            format!("{level},{FRAME_TARGET}=trace")
        } else {
            level
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }
}

fn build_subscriber(config: &TracingConfig) -> impl SubscriberInitExt {
    let (json_layer, text_layer) = if config.json {
        let layer = fmt::layer()
            .json()
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .with_thread_names(config.thread_names);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .with_thread_names(config.thread_names);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(json_layer)
        .with(text_layer)
}

/// Install the default subscriber
///
/// # Panics
/// Panics if a global subscriber is already set.
pub fn init_tracing() {
    init_tracing_with_config(&TracingConfig::default());
}

/// Install a subscriber built from `config`
///
/// # Panics
/// Panics if a global subscriber is already set.
pub fn init_tracing_with_config(config: &TracingConfig) {
    build_subscriber(config).init();
}

/// Install the default subscriber unless one is already set
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(&TracingConfig::default())
}

/// Install a subscriber built from `config` unless one is already set
pub fn try_init_tracing_with_config(config: &TracingConfig) -> Result<(), TracingError> {
    build_subscriber(config)
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
