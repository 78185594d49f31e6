mod cli;
pub mod serde_helpers;
mod validation;

use crate::filter::PrefixError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Missing required setting: {0}")]
    MissingField(&'static str),
    #[error("Invalid ignored IP '{value}': {source}")]
    InvalidIgnoreIp {
        value: String,
        #[source]
        source: PrefixError,
    },
    #[error("Invalid ignored URL pattern '{pattern}': {source}")]
    InvalidIgnoreUrl {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid client IP header name: {0}")]
    InvalidHeaderName(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// One `hostname=site_id` entry of the website table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteMapping {
    pub host: String,
    pub site_id: String,
}

impl WebsiteMapping {
    pub fn new(host: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            site_id: site_id.into(),
        }
    }
}

impl FromStr for WebsiteMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, site_id) = s
            .split_once('=')
            .ok_or_else(|| format!("expected HOST=SITE_ID, got '{s}'"))?;
        let (host, site_id) = (host.trim(), site_id.trim());
        if host.is_empty() || site_id.is_empty() {
            return Err(format!("expected HOST=SITE_ID, got '{s}'"));
        }
        Ok(Self::new(host, site_id))
    }
}

impl fmt::Display for WebsiteMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.host, self.site_id)
    }
}

pub use cli::Config;
