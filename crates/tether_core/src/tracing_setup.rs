//! Tracing subscriber setup.
//!
//! The engine only emits `tracing` events; it never installs a subscriber.
//! Hosts call [`TracingConfig::init`] once at startup to see them.
//!
//! | Target | Level | Events |
//! |--------|-------|--------|
//! | `tether_engine::registry` | `warn` | activation returned no cleanup |
//! | `tether_engine::registry` | `debug` | activated, joined, released, cleaned up |
//! | `tether_engine::subscriber` | `debug` | reconciled, unmounted, disposing |
//! | `tether_engine::collector` | `trace` | declared |
//!
//! # Example
//!
//! ```
//! use tether_core::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! // Development: pretty output with engine internals
//! let dev = TracingConfig::default()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Pretty);
//!
//! // Production: JSON, only leak warnings from the engine
//! let prod = TracingConfig::default()
//!     .with_format(TracingFormat::Json)
//!     .with_env_filter("info,tether_engine=warn");
//! # let _ = (dev, prod);
//! ```

use core::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding a filter directive, e.g. `tether_engine=debug`.
pub const FILTER_ENV: &str = "TETHER_LOG";

/// Environment variable selecting the output format: `pretty`, `compact` or `json`.
pub const FORMAT_ENV: &str = "TETHER_LOG_FORMAT";

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

impl FromStr for TracingFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(TracingError::UnknownFormat(s.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from tracing setup.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// The format name is not one of `pretty`, `compact`, `json`.
    #[error("unknown tracing format `{0}`")]
    UnknownFormat(String),

    /// The filter directive could not be parsed.
    #[error("invalid tracing filter `{filter}`")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized(#[source] tracing_subscriber::util::TryInitError),
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the global tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Maximum log level, used when no filter directive is set.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Filter directive (e.g. `"info,tether_engine=debug"`).
    pub env_filter: Option<String>,
    /// Whether to include span enter/exit events.
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads [`FILTER_ENV`] and [`FORMAT_ENV`] on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TracingError::UnknownFormat`] if [`FORMAT_ENV`] is set to an
    /// unknown format.
    pub fn from_env() -> Result<Self, TracingError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TracingError> {
        let mut config = Self::default();
        if let Some(filter) = lookup(FILTER_ENV).filter(|f| !f.trim().is_empty()) {
            config.env_filter = Some(filter);
        }
        if let Some(format) = lookup(FORMAT_ENV) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a filter directive.
    ///
    /// Format: `target=level,target=level,...`
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Builds the filter: the directive if set, otherwise the level.
    ///
    /// # Errors
    ///
    /// Returns [`TracingError::InvalidFilter`] if the directive does not parse.
    pub fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).map_err(|source| TracingError::InvalidFilter {
                    filter: filter.clone(),
                    source,
                })
            }
            None => Ok(EnvFilter::new(self.level.as_str())),
        }
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        }
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Fails on an invalid filter directive or if a global subscriber is
    /// already installed.
    pub fn try_init(&self) -> Result<(), TracingError> {
        let env_filter = self.build_filter()?;
        let span_events = self.fmt_span();

        let installed = match self.format {
            TracingFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init(),
        };
        installed.map_err(TracingError::AlreadyInitialized)?;

        tracing::info!(
            level = %self.level,
            format = ?self.format,
            filter = self.env_filter.as_deref().unwrap_or_default(),
            "tracing initialized"
        );
        Ok(())
    }

    /// Installs the global subscriber, falling back to the level if the
    /// directive is invalid and ignoring an already installed subscriber.
    pub fn init(&self) {
        match self.try_init() {
            Ok(()) | Err(TracingError::AlreadyInitialized(_)) => {}
            Err(err) => {
                let fallback = Self {
                    env_filter: None,
                    ..self.clone()
                };
                fallback.try_init().ok();
                tracing::warn!(error = %err, "falling back to level filter");
            }
        }
    }
}
