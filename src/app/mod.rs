pub mod config;
pub mod feeder;
pub mod logging_system;
pub mod pipeline;
pub mod shutdown;

pub use config::{Config, ConfigError, LogLevel, WebsiteMapping};
pub use feeder::{Feeder, collector_for};
pub use logging_system::{InitializationError, build_filter_string, init_logging};
pub use pipeline::BatchWorker;

use crate::buffer::PipelineStats;
use crate::diagnostics::Diagnostics;
use crate::reliability::{ConnectionSupervisor, SupervisorOutcome};
use anyhow::{Context, bail};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Waits until the configured collector is reachable and the filter settings
/// compile. Cancelling `cancel` aborts the wait.
pub async fn check_collector(config: &Config, cancel: CancellationToken) -> SupervisorOutcome {
    let diagnostics = Diagnostics::new(env!("CARGO_PKG_NAME"), config.debug);

    let collector = match collector_for(config) {
        Ok(collector) => collector,
        Err(error) => {
            diagnostics.error(format_args!("tracking disabled: {error}"));
            return SupervisorOutcome::Disabled(error);
        }
    };

    info!(host = %collector.health_url(), "Probing collector");

    let supervisor = ConnectionSupervisor::new(
        Arc::new(collector),
        Arc::new(config.clone()),
        Arc::new(config.site_map()),
        diagnostics,
        Arc::new(PipelineStats::new()),
    );
    supervisor.run(cancel).await
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let config = Config::from_args_and_env(std::env::args_os())
        .context("Configuration error")?;
    init_logging(&config).context("Failed to initialize logging")?;

    info!("Starting rybbit-feeder v{}", get_version());
    info!(
        "Configuration: host={}, websites={}, batch_size={}, queue_size={}",
        config.host,
        config.websites.len(),
        config.batch_size,
        config.queue_size
    );

    if config.disabled {
        bail!("tracking is disabled by configuration");
    }

    let cancel = CancellationToken::new();
    let signals = shutdown::cancel_on_signal(cancel.clone());
    let outcome = check_collector(&config, cancel.clone()).await;
    cancel.cancel();
    let _ = signals.await;

    match outcome {
        SupervisorOutcome::Ready(engine) => {
            info!(
                sites = engine.sites().len(),
                ignored_ips = engine.rules().ignored_prefixes.len(),
                ignored_urls = engine.rules().ignored_urls.len(),
                "Collector ready, tracking can start"
            );
            Ok(())
        }
        SupervisorOutcome::Disabled(error) => {
            Err(anyhow::Error::new(error).context("Tracking disabled"))
        }
        SupervisorOutcome::Cancelled => bail!("Cancelled before the collector became ready"),
    }
}
