use super::Collector;
use super::serialization::TrackEnvelope;
use crate::domain::VisitEvent;
use bytes::Bytes;
use http::StatusCode;
use reqwest::{Client, ClientBuilder, Response, header::CONTENT_TYPE};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request timeout: {0}")]
    RequestTimeout(String),
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ClientError::RequestTimeout(error.to_string())
        } else {
            ClientError::NetworkError(error)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub max_connections: usize,
    pub keep_alive_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            timeout: Duration::from_secs(10),
            connection_timeout: Duration::from_secs(5),
            max_connections: 4,
            keep_alive_timeout: Duration::from_secs(60),
            user_agent: concat!("rybbit-feeder/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Outcome of a request the collector answered with a success status.
/// The body is always read to completion so the connection can be reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Default)]
pub struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    pub fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// reqwest-backed client for the Rybbit collector API.
#[derive(Debug, Clone)]
pub struct CollectorClient {
    client: Client,
    config: ClientConfig,
    track_url: Url,
    health_url: Url,
    stats: Arc<ClientStats>,
}

impl CollectorClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base = config.host.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ClientError::InvalidConfiguration(
                "collector host is empty".to_string(),
            ));
        }

        let track_url = endpoint(base, "/api/track")?;
        let health_url = endpoint(base, "/health")?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .pool_idle_timeout(config.keep_alive_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config,
            track_url,
            health_url,
            stats: Arc::new(ClientStats::default()),
        })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn track_url(&self) -> &Url {
        &self.track_url
    }

    pub fn health_url(&self) -> &Url {
        &self.health_url
    }

    pub async fn health_check(&self) -> Result<Delivery, ClientError> {
        let start = Instant::now();
        let result = self.client.get(self.health_url.clone()).send().await;
        self.finish(start, result).await
    }

    pub async fn send_event(&self, event: &VisitEvent) -> Result<Delivery, ClientError> {
        let body = TrackEnvelope::new(event).to_bytes()?;

        let start = Instant::now();
        let result = self
            .client
            .post(self.track_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;
        self.finish(start, result).await
    }

    async fn finish(
        &self,
        start: Instant,
        result: Result<Response, reqwest::Error>,
    ) -> Result<Delivery, ClientError> {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_request(false, start.elapsed());
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                self.stats.record_request(false, start.elapsed());
                return Err(e.into());
            }
        };

        let success = status.is_success();
        self.stats.record_request(success, start.elapsed());

        if success {
            Ok(Delivery { status, body })
        } else {
            Err(ClientError::HttpError {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).trim().to_string(),
            })
        }
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        let total_requests = self.stats.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.stats.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            successful_requests: self.stats.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.stats.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }
}

impl Collector for CollectorClient {
    async fn probe(&self) -> Result<(), ClientError> {
        self.health_check().await.map(|_| ())
    }

    async fn deliver(&self, event: &VisitEvent) -> Result<Delivery, ClientError> {
        self.send_event(event).await
    }
}

fn endpoint(base: &str, path: &str) -> Result<Url, ClientError> {
    let url: Url = format!("{base}{path}")
        .parse()
        .map_err(|e| ClientError::InvalidConfiguration(format!("Invalid host URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::InvalidConfiguration(format!(
            "Unsupported URL scheme: {other}"
        ))),
    }
}
