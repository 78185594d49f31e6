use super::ip_prefix::IpPrefix;
use crate::app::{Config, ConfigError};
use http::HeaderName;
use regex::Regex;

/// Extensions regarded as "content" when no custom allow-list is configured.
/// The empty string stands for extension-less routes such as `/about`.
pub const DEFAULT_TRACK_EXTENSIONS: &[&str] = &[
    "", ".htm", ".html", ".xhtml", ".jsf", ".md", ".php", ".rss", ".rtf", ".txt", ".xml", ".pdf",
];

pub const DEFAULT_CLIENT_IP_HEADER: &str = "x-real-ip";

/// Compiled exclusion rules. Immutable once built.
#[derive(Debug, Clone)]
pub struct FilterRules {
    pub ignored_prefixes: Vec<IpPrefix>,
    pub ignored_urls: Vec<Regex>,
    pub ignored_user_agents: Vec<String>,
    pub track_extensions: Vec<String>,
    pub track_errors: bool,
    pub track_all_resources: bool,
    pub client_ip_header: HeaderName,
    pub(crate) create_new_websites: bool,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            ignored_prefixes: Vec::new(),
            ignored_urls: Vec::new(),
            ignored_user_agents: Vec::new(),
            track_extensions: Vec::new(),
            track_errors: false,
            track_all_resources: false,
            client_ip_header: HeaderName::from_static(DEFAULT_CLIENT_IP_HEADER),
            create_new_websites: false,
        }
    }
}

impl FilterRules {
    /// Compiles the configured IP prefixes, URL patterns and header name.
    ///
    /// Any failure here is fatal for the instance.
    pub fn compile(config: &Config) -> Result<Self, ConfigError> {
        let ignored_prefixes = config
            .ignore_ips
            .iter()
            .map(|value| {
                value
                    .parse::<IpPrefix>()
                    .map_err(|source| ConfigError::InvalidIgnoreIp {
                        value: value.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ignored_urls = config
            .ignore_urls
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidIgnoreUrl {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let client_ip_header = if config.header_ip.trim().is_empty() {
            HeaderName::from_static(DEFAULT_CLIENT_IP_HEADER)
        } else {
            HeaderName::try_from(config.header_ip.trim())
                .map_err(|_| ConfigError::InvalidHeaderName(config.header_ip.clone()))?
        };

        Ok(Self {
            ignored_prefixes,
            ignored_urls,
            ignored_user_agents: config.ignore_user_agents.clone(),
            track_extensions: config.track_extensions.clone(),
            track_errors: config.track_errors,
            track_all_resources: config.track_all_resources,
            client_ip_header,
            create_new_websites: false,
        })
    }

    /// Dynamic site creation is not exposed by the configuration surface.
    pub fn create_new_websites(&self) -> bool {
        self.create_new_websites
    }
}
