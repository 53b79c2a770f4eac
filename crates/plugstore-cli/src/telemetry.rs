// crates/plugstore-cli/src/telemetry.rs
// ============================================================================
// Module: CLI Telemetry
// Description: Global `tracing` subscriber installation.
// Purpose: Route service logs to stderr in the configured format.
// Dependencies: plugstore-config, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! The configured level is the default filter; a non-empty `RUST_LOG`
//! replaces it entirely. Logs always go to stderr so stdout stays reserved
//! for command output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use plugstore_config::LogFormat;
use plugstore_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable that overrides the configured filter.
const LOG_ENV_VAR: &str = "RUST_LOG";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Subscriber installation failures.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{directive}`: {message}")]
    Filter {
        /// Rejected directive.
        directive: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber was already installed.
    #[error("logging init failed: {0}")]
    Init(String),
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Builds the active filter from the config level and an optional override.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the chosen directive is invalid.
pub fn build_filter(level: &str, env_override: Option<&str>) -> Result<EnvFilter, TelemetryError> {
    let directive = env_override.map(str::trim).filter(|value| !value.is_empty()).unwrap_or(level);
    EnvFilter::try_new(directive).map_err(|err| TelemetryError::Filter {
        directive: directive.to_string(),
        message: err.to_string(),
    })
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_override = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(&config.level, env_override.as_deref())?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(std::io::stderr)).try_init(),
    };
    result.map_err(|err| TelemetryError::Init(err.to_string()))
}
