use super::{Config, ConfigError};
use url::Url;

impl Config {
    /// Structural checks; a failure here means the feeder cannot be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Queue size must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.batch_max_wait_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch max wait must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Settings required before the collector can be contacted.
    pub fn check_collector_settings(&self) -> Result<(), ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::MissingField("host"));
        }

        let url = Url::parse(host)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid host URL '{host}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Invalid host URL '{host}': unsupported scheme {}",
                url.scheme()
            )));
        }

        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("api_key"));
        }

        if self.websites.is_empty() {
            return Err(ConfigError::MissingField("websites"));
        }

        Ok(())
    }
}
