use super::serde_helpers::website_map;
use super::{ConfigError, LogLevel, WebsiteMapping};
use crate::domain::SiteMap;
use crate::reliability::RetryPolicy;
use crate::sender::ClientConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "RYBBIT_CONFIG";

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Turn tracking off entirely; requests pass through untouched
    #[arg(long, env = "RYBBIT_DISABLED")]
    pub disabled: bool,

    /// Emit per-request debug diagnostics
    #[arg(long, env = "RYBBIT_DEBUG")]
    pub debug: bool,

    /// Maximum number of events waiting for delivery
    #[arg(long, env = "RYBBIT_QUEUE_SIZE", default_value = "1000")]
    pub queue_size: usize,

    /// Number of events per batch
    #[arg(long, env = "RYBBIT_BATCH_SIZE", default_value = "20")]
    pub batch_size: usize,

    /// Maximum time a partial batch waits before being flushed, in milliseconds
    #[arg(long, env = "RYBBIT_BATCH_MAX_WAIT_MS", default_value = "5000")]
    pub batch_max_wait_ms: u64,

    /// Base URL of the Rybbit collector
    #[arg(long, env = "RYBBIT_HOST", default_value = "")]
    pub host: String,

    /// API key sent with every event
    #[arg(long, env = "RYBBIT_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Tracked website as HOST=SITE_ID (repeatable)
    #[arg(long = "website", env = "RYBBIT_WEBSITES", value_delimiter = ',')]
    #[serde(with = "website_map")]
    pub websites: Vec<WebsiteMapping>,

    /// Also report responses with status >= 400
    #[arg(long, env = "RYBBIT_TRACK_ERRORS")]
    pub track_errors: bool,

    /// Report every resource regardless of its extension
    #[arg(long, env = "RYBBIT_TRACK_ALL_RESOURCES")]
    pub track_all_resources: bool,

    /// Extensions to track instead of the built-in list (e.g. .html)
    #[arg(long = "track-extension", env = "RYBBIT_TRACK_EXTENSIONS", value_delimiter = ',')]
    pub track_extensions: Vec<String>,

    /// User-agent substrings to ignore
    #[arg(long = "ignore-user-agent", env = "RYBBIT_IGNORE_USER_AGENTS", value_delimiter = ',')]
    pub ignore_user_agents: Vec<String>,

    /// URL regular expressions to ignore
    #[arg(long = "ignore-url", env = "RYBBIT_IGNORE_URLS", value_delimiter = ',')]
    pub ignore_urls: Vec<String>,

    /// Client IPs or CIDR ranges to ignore
    #[arg(long = "ignore-ip", env = "RYBBIT_IGNORE_IPS", value_delimiter = ',')]
    pub ignore_ips: Vec<String>,

    /// Request header carrying the real client IP
    #[arg(long, env = "RYBBIT_HEADER_IP", default_value = "X-Real-Ip")]
    pub header_ip: String,

    /// Collector request timeout in seconds
    #[arg(long, env = "RYBBIT_REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "RYBBIT_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, env = "RYBBIT_LOG_JSON")]
    pub log_json: bool,

    /// Configuration file path (optional)
    #[arg(long, env = "RYBBIT_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub batch_max_wait: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,

    /// Probe backoff (not exposed as CLI args)
    #[serde(skip)]
    #[arg(skip)]
    pub retry_policy: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disabled: false,
            debug: false,
            queue_size: 1000,
            batch_size: 20,
            batch_max_wait_ms: 5000,
            host: String::new(),
            api_key: String::new(),
            websites: Vec::new(),
            track_errors: false,
            track_all_resources: false,
            track_extensions: Vec::new(),
            ignore_user_agents: Vec::new(),
            ignore_urls: Vec::new(),
            ignore_ips: Vec::new(),
            header_ip: "X-Real-Ip".to_string(),
            request_timeout_secs: 10,
            log_level: LogLevel::Info,
            log_json: false,
            config_file: None,
            batch_max_wait: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(10),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// CLI flags and `RYBBIT_*` variables layered over an optional base
    /// configuration (`--config-file`, else inline TOML in `RYBBIT_CONFIG`).
    /// A flag or variable wins whenever it differs from the built-in default.
    pub fn from_args_and_env<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);

        let base = if let Some(path) = &config.config_file {
            Some(Self::read_file(path)?)
        } else if let Ok(inline) = std::env::var(CONFIG_ENV) {
            Some(toml::from_str::<Config>(&inline)?)
        } else {
            None
        };

        if let Some(base) = base {
            config.merge_base(base);
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path.as_ref())?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn merge_base(&mut self, base: Config) {
        let defaults = Config::default();

        prefer_explicit(&mut self.disabled, base.disabled, &defaults.disabled);
        prefer_explicit(&mut self.debug, base.debug, &defaults.debug);
        prefer_explicit(&mut self.queue_size, base.queue_size, &defaults.queue_size);
        prefer_explicit(&mut self.batch_size, base.batch_size, &defaults.batch_size);
        prefer_explicit(
            &mut self.batch_max_wait_ms,
            base.batch_max_wait_ms,
            &defaults.batch_max_wait_ms,
        );
        prefer_explicit(&mut self.host, base.host, &defaults.host);
        prefer_explicit(&mut self.api_key, base.api_key, &defaults.api_key);
        prefer_explicit(&mut self.websites, base.websites, &defaults.websites);
        prefer_explicit(&mut self.track_errors, base.track_errors, &defaults.track_errors);
        prefer_explicit(
            &mut self.track_all_resources,
            base.track_all_resources,
            &defaults.track_all_resources,
        );
        prefer_explicit(
            &mut self.track_extensions,
            base.track_extensions,
            &defaults.track_extensions,
        );
        prefer_explicit(
            &mut self.ignore_user_agents,
            base.ignore_user_agents,
            &defaults.ignore_user_agents,
        );
        prefer_explicit(&mut self.ignore_urls, base.ignore_urls, &defaults.ignore_urls);
        prefer_explicit(&mut self.ignore_ips, base.ignore_ips, &defaults.ignore_ips);
        prefer_explicit(&mut self.header_ip, base.header_ip, &defaults.header_ip);
        prefer_explicit(
            &mut self.request_timeout_secs,
            base.request_timeout_secs,
            &defaults.request_timeout_secs,
        );
        prefer_explicit(&mut self.log_level, base.log_level, &defaults.log_level);
        prefer_explicit(&mut self.log_json, base.log_json, &defaults.log_json);
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.batch_max_wait = Duration::from_millis(self.batch_max_wait_ms);
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(())
    }

    pub fn site_map(&self) -> SiteMap {
        SiteMap::new(
            self.websites
                .iter()
                .map(|website| (website.host.as_str(), website.site_id.clone())),
        )
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            timeout: self.request_timeout,
            ..ClientConfig::default()
        }
    }
}

fn prefer_explicit<T: PartialEq>(current: &mut T, base: T, default: &T) {
    if current == default {
        *current = base;
    }
}
