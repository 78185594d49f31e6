use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineMetrics {
    pub enqueued: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub delivery_failures: u64,
    pub batches_flushed: u64,
    pub worker_restarts: u64,
    pub probe_attempts: u64,
}

/// Lock-free counters shared by the request path, the worker and the supervisor.
#[derive(Debug, Default)]
pub struct PipelineStats {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    delivery_failures: AtomicU64,
    batches_flushed: AtomicU64,
    worker_restarts: AtomicU64,
    probe_attempts: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failures(&self, count: usize) {
        self.delivery_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_batch_flushed(&self) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_worker_restart(&self) {
        self.worker_restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_attempt(&self) {
        self.probe_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineMetrics {
        PipelineMetrics {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            worker_restarts: self.worker_restarts.load(Ordering::Relaxed),
            probe_attempts: self.probe_attempts.load(Ordering::Relaxed),
        }
    }
}
