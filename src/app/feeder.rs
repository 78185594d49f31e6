use super::config::{Config, ConfigError};
use super::pipeline::BatchWorker;
use crate::buffer::{BatchConfig, EventQueue, EventReceiver, EventSender, PipelineMetrics, PipelineStats};
use crate::diagnostics::Diagnostics;
use crate::domain::{FeederError, RequestMeta};
use crate::filter::FilterEngine;
use crate::intercept::{Handler, ResponseWriter, TrackingWriter, build_event};
use crate::reliability::{ConnectionSupervisor, SupervisorOutcome, SupervisorState};
use crate::sender::{Collector, CollectorClient};
use http::Request;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Builds the HTTP collector client, or explains why the settings cannot reach one.
pub fn collector_for(config: &Config) -> Result<CollectorClient, ConfigError> {
    config.check_collector_settings()?;
    CollectorClient::new(config.client_config()).map_err(|e| ConfigError::InvalidUrl(e.to_string()))
}

/// Tracking middleware handle.
///
/// Cheap to clone; every clone shares the same queue, worker and state.
/// Tracking stays inactive until the collector has answered a probe and the
/// filter configuration compiled.
#[derive(Clone)]
pub struct Feeder {
    shared: Arc<Shared>,
}

struct Shared {
    diagnostics: Diagnostics,
    api_key: String,
    disabled: AtomicBool,
    engine: OnceLock<FilterEngine>,
    sender: EventSender,
    stats: Arc<PipelineStats>,
    state: Arc<RwLock<SupervisorState>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn activate<C: Collector>(&self, engine: FilterEngine, worker: BatchWorker<C>) {
        if self.engine.set(engine).is_err() {
            self.diagnostics.error(format_args!("filter engine already published"));
            return;
        }
        self.tasks.lock().push(worker.spawn(self.cancel.clone()));
        self.disabled.store(false, Ordering::Release);
        // a shutdown racing with activation must win
        if self.cancel.is_cancelled() {
            self.disabled.store(true, Ordering::Release);
        }
    }
}

impl Feeder {
    /// Creates the feeder against the HTTP collector at `config.host`.
    ///
    /// Must be called from within a Tokio runtime. Only structurally invalid
    /// settings fail; missing collector settings leave the feeder disabled.
    pub fn new(config: Config, name: &str, cancel: CancellationToken) -> Result<Self, FeederError> {
        if config.disabled {
            return Self::with_collector_result::<CollectorClient>(config, name, cancel, Err(None));
        }
        let collector = collector_for(&config).map_err(Some);
        Self::with_collector_result(config, name, cancel, collector)
    }

    /// Creates the feeder against an arbitrary collector implementation.
    pub fn with_collector<C: Collector>(
        config: Config,
        name: &str,
        cancel: CancellationToken,
        collector: C,
    ) -> Result<Self, FeederError> {
        Self::with_collector_result(config, name, cancel, Ok(collector))
    }

    fn with_collector_result<C: Collector>(
        mut config: Config,
        name: &str,
        cancel: CancellationToken,
        collector: Result<C, Option<ConfigError>>,
    ) -> Result<Self, FeederError> {
        config.post_process()?;
        config.validate()?;

        let diagnostics = Diagnostics::new(name, config.debug);
        let stats = Arc::new(PipelineStats::new());
        let (sender, receiver) = EventQueue::bounded(config.queue_size, Arc::clone(&stats))?;

        let feeder = Self {
            shared: Arc::new(Shared {
                diagnostics,
                api_key: config.api_key.clone(),
                disabled: AtomicBool::new(true),
                engine: OnceLock::new(),
                sender,
                stats,
                state: Arc::new(RwLock::new(SupervisorState::Idle)),
                cancel,
                tasks: Mutex::new(Vec::new()),
            }),
        };

        if config.disabled {
            feeder.set_state(SupervisorState::Disabled);
            feeder
                .shared
                .diagnostics
                .debug(format_args!("tracking disabled by configuration"));
            return Ok(feeder);
        }

        match collector {
            Ok(collector) => feeder.start(config, collector, receiver),
            Err(error) => {
                if let Some(error) = error {
                    feeder
                        .shared
                        .diagnostics
                        .error(format_args!("tracking disabled: {error}"));
                }
                feeder.set_state(SupervisorState::Disabled);
            }
        }
        Ok(feeder)
    }

    fn start<C: Collector>(&self, config: Config, collector: C, receiver: EventReceiver) {
        let collector = Arc::new(collector);
        let batch_config = BatchConfig {
            max_size: config.batch_size,
            max_wait: config.batch_max_wait,
        };
        let sites = Arc::new(config.site_map());
        let shared = Arc::clone(&self.shared);

        let supervisor = ConnectionSupervisor::new(
            Arc::clone(&collector),
            Arc::new(config),
            sites,
            shared.diagnostics.clone(),
            Arc::clone(&shared.stats),
        )
        .with_state(Arc::clone(&shared.state));

        let handle = tokio::spawn(async move {
            if let SupervisorOutcome::Ready(engine) = supervisor.run(shared.cancel.clone()).await {
                let worker = BatchWorker::new(
                    collector,
                    receiver,
                    batch_config,
                    shared.diagnostics.clone(),
                    Arc::clone(&shared.stats),
                );
                shared.activate(engine, worker);
            }
        });
        self.shared.tasks.lock().push(handle);
    }

    /// Serves one request through `next`, observing the response status when
    /// the request is trackable. Never alters the response.
    pub fn handle<B, H>(&self, request: &Request<B>, writer: &mut dyn ResponseWriter, next: &H)
    where
        H: Handler<B> + ?Sized,
    {
        let Some(engine) = self.engine() else {
            next.serve(writer, request);
            return;
        };

        let meta = RequestMeta::from_request(request);
        if !engine.should_track(&meta) {
            next.serve(writer, request);
            return;
        }

        match build_event(engine, &self.shared.api_key, &meta) {
            Some(event) => {
                let mut tracking = TrackingWriter::new(
                    writer,
                    engine,
                    &self.shared.sender,
                    &self.shared.diagnostics,
                    event,
                );
                next.serve(&mut tracking, request);
            }
            None => {
                self.shared
                    .diagnostics
                    .debug(format_args!("tracking skipped, site-id is unknown"));
                next.serve(writer, request);
            }
        }
    }

    /// Enqueues a named custom event for `request`, subject to the same
    /// request filters as page views. Returns whether the event was queued.
    pub fn track_event<B>(
        &self,
        request: &Request<B>,
        name: &str,
        properties: Option<&serde_json::Value>,
    ) -> bool {
        let Some(engine) = self.engine() else {
            return false;
        };
        let meta = RequestMeta::from_request(request);
        if !engine.should_track(&meta) {
            return false;
        }
        let Some(event) = build_event(engine, &self.shared.api_key, &meta) else {
            self.shared
                .diagnostics
                .debug(format_args!("tracking skipped, site-id is unknown"));
            return false;
        };

        let queued = event
            .into_custom(name, properties)
            .map_err(|e| e.to_string())
            .and_then(|event| self.shared.sender.try_enqueue(event).map_err(|e| e.to_string()));
        match queued {
            Ok(()) => true,
            Err(error) => {
                self.shared
                    .diagnostics
                    .error(format_args!("failed to submit event: {error}"));
                false
            }
        }
    }

    fn engine(&self) -> Option<&FilterEngine> {
        if self.shared.disabled.load(Ordering::Acquire) {
            return None;
        }
        self.shared.engine.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.engine().is_some()
    }

    pub fn name(&self) -> &str {
        self.shared.diagnostics.middleware()
    }

    pub fn supervisor_state(&self) -> SupervisorState {
        *self.shared.state.read()
    }

    pub fn stats(&self) -> PipelineMetrics {
        self.shared.stats.snapshot()
    }

    /// Stops tracking, cancels the supervisor and worker, then waits for both.
    /// The worker flushes whatever is still queued before it exits.
    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        self.shared.disabled.store(true, Ordering::Release);
        loop {
            let next = self.shared.tasks.lock().pop();
            let Some(handle) = next else {
                break;
            };
            if let Err(e) = handle.await {
                self.shared
                    .diagnostics
                    .error(format_args!("feeder task failed: {e}"));
            }
        }
    }

    fn set_state(&self, state: SupervisorState) {
        *self.shared.state.write() = state;
    }
}
