use super::retry::RetryPolicy;
use crate::app::{Config, ConfigError};
use crate::buffer::PipelineStats;
use crate::diagnostics::Diagnostics;
use crate::domain::SiteMap;
use crate::filter::{FilterEngine, FilterRules};
use crate::sender::Collector;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of the connection supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SupervisorState {
    Idle,
    Probing { attempt: u32 },
    Verifying,
    Ready,
    Disabled,
    Cancelled,
}

impl SupervisorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Disabled | Self::Cancelled)
    }
}

#[derive(Debug)]
pub enum SupervisorOutcome {
    /// Collector reachable and rules compiled; tracking may start.
    Ready(FilterEngine),
    /// Fatal configuration problem; tracking stays off for the process lifetime.
    Disabled(ConfigError),
    Cancelled,
}

/// Probes the collector until it answers, then compiles the filter rules.
///
/// Runs once per instance. Probe failures are retried forever with the
/// configured backoff; configuration failures are fatal.
pub struct ConnectionSupervisor<C> {
    collector: Arc<C>,
    config: Arc<Config>,
    sites: Arc<SiteMap>,
    diagnostics: Diagnostics,
    stats: Arc<PipelineStats>,
    state: Arc<RwLock<SupervisorState>>,
}

impl<C: Collector> ConnectionSupervisor<C> {
    pub fn new(
        collector: Arc<C>,
        config: Arc<Config>,
        sites: Arc<SiteMap>,
        diagnostics: Diagnostics,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            collector,
            config,
            sites,
            diagnostics,
            stats,
            state: Arc::new(RwLock::new(SupervisorState::Idle)),
        }
    }

    /// Shares an externally owned state cell instead of a private one.
    pub fn with_state(mut self, state: Arc<RwLock<SupervisorState>>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.read()
    }

    pub async fn run(&self, cancel: CancellationToken) -> SupervisorOutcome {
        if let Err(error) = self.config.check_collector_settings() {
            return self.disable(error);
        }

        let policy: RetryPolicy = self.config.retry_policy;
        let mut attempt: u32 = 0;

        loop {
            let delay = policy.delay(attempt);
            if !delay.is_zero() {
                self.diagnostics.debug(format_args!("retrying connection in {delay:?}"));
                tokio::select! {
                    _ = cancel.cancelled() => return self.cancelled(),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            self.set_state(SupervisorState::Probing { attempt });
            self.stats.record_probe_attempt();

            let probe = tokio::select! {
                _ = cancel.cancelled() => return self.cancelled(),
                result = self.collector.probe() => result,
            };

            match probe {
                Ok(()) => break,
                Err(error) => {
                    self.diagnostics
                        .error(format_args!("failed to get health for rybbit: {error}"));
                    attempt = attempt.saturating_add(1);
                }
            }
        }

        self.set_state(SupervisorState::Verifying);
        match FilterRules::compile(&self.config) {
            Ok(rules) => {
                let engine =
                    FilterEngine::new(rules, Arc::clone(&self.sites), self.diagnostics.clone());
                self.set_state(SupervisorState::Ready);
                self.diagnostics.debug(format_args!("collector ready"));
                SupervisorOutcome::Ready(engine)
            }
            Err(error) => self.disable(error),
        }
    }

    fn disable(&self, error: ConfigError) -> SupervisorOutcome {
        self.diagnostics.error(format_args!("tracking disabled: {error}"));
        self.set_state(SupervisorState::Disabled);
        SupervisorOutcome::Disabled(error)
    }

    fn cancelled(&self) -> SupervisorOutcome {
        self.diagnostics.debug(format_args!("connection supervisor cancelled"));
        self.set_state(SupervisorState::Cancelled);
        SupervisorOutcome::Cancelled
    }

    fn set_state(&self, state: SupervisorState) {
        *self.state.write() = state;
    }
}
