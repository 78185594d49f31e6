use super::config::{Config, LogLevel};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Logging system initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Noisy dependencies kept at warn regardless of the configured level.
const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "reqwest=warn", "h2=warn", "rustls=warn"];

pub fn build_filter_string(level: LogLevel, debug: bool) -> String {
    let mut parts = Vec::with_capacity(DEFAULT_DIRECTIVES.len() + 2);
    parts.push(level.as_str().to_string());
    if debug {
        parts.push(format!("{}=debug", env!("CARGO_CRATE_NAME")));
    }
    parts.extend(DEFAULT_DIRECTIVES.iter().map(|directive| directive.to_string()));
    parts.join(",")
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured filter.
pub fn init_logging(config: &Config) -> Result<(), InitializationError> {
    let filter_string = build_filter_string(config.log_level, config.debug);

    let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(from_env) if !from_env.trim().is_empty() => EnvFilter::try_new(&from_env),
        _ => EnvFilter::try_new(&filter_string),
    }
    .map_err(|e| InitializationError::LoggingInitFailed {
        details: format!("Failed to create EnvFilter with '{filter_string}'"),
        source: Box::new(e),
    })?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.log_json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true).compact())
            .try_init()
    };

    result.map_err(|e| InitializationError::LoggingInitFailed {
        details: "Failed to set global tracing subscriber".to_string(),
        source: Box::new(e),
    })
}
