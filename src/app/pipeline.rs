use crate::buffer::{Batch, BatchConfig, BatchTrigger, EventReceiver, PendingBatch, PipelineStats};
use crate::diagnostics::Diagnostics;
use crate::sender::Collector;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Single consumer of the event queue: forms batches by size or age and hands
/// them to the collector.
pub struct BatchWorker<C> {
    collector: Arc<C>,
    receiver: EventReceiver,
    config: BatchConfig,
    diagnostics: Diagnostics,
    stats: Arc<PipelineStats>,
}

impl<C: Collector> BatchWorker<C> {
    pub fn new(
        collector: Arc<C>,
        receiver: EventReceiver,
        config: BatchConfig,
        diagnostics: Diagnostics,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            collector,
            receiver,
            config,
            diagnostics,
            stats,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Runs until cancelled or every sender is gone. A panic inside the loop
    /// discards the in-flight batch and restarts the loop.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.diagnostics.debug(format_args!(
            "starting batch worker (batch_size={}, max_wait={:?})",
            self.config.max_size, self.config.max_wait
        ));

        loop {
            let result = AssertUnwindSafe(self.batch_loop(&cancel))
                .catch_unwind()
                .await;
            match result {
                Ok(()) => break,
                Err(panic) => {
                    self.stats.record_worker_restart();
                    self.diagnostics.error(format_args!(
                        "batch worker panicked: {}; restarting",
                        panic_message(panic.as_ref())
                    ));
                }
            }
        }

        self.diagnostics.debug(format_args!("batch worker stopped"));
    }

    async fn batch_loop(&mut self, cancel: &CancellationToken) {
        let max_wait = self.config.max_wait;
        let mut pending = PendingBatch::new(self.config.max_size);
        let timer = tokio::time::sleep(max_wait);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    self.drain(&mut pending).await;
                    return;
                }

                event = self.receiver.recv() => match event {
                    Some(event) => {
                        if pending.push(event) {
                            if let Some(batch) = pending.take(BatchTrigger::SizeBased) {
                                self.flush(batch).await;
                            }
                            timer.as_mut().reset(Instant::now() + max_wait);
                        }
                    }
                    None => {
                        self.drain(&mut pending).await;
                        return;
                    }
                },

                () = &mut timer => {
                    if let Some(batch) = pending.take(BatchTrigger::TimeBased) {
                        self.flush(batch).await;
                    }
                    timer.as_mut().reset(Instant::now() + max_wait);
                }
            }
        }
    }

    /// Flushes the partial batch and everything still queued, in `max_size` chunks.
    async fn drain(&mut self, pending: &mut PendingBatch) {
        self.receiver.close();

        let mut events = pending
            .take(BatchTrigger::Shutdown)
            .map(Batch::into_events)
            .unwrap_or_default();
        events.extend(self.receiver.drain());

        if events.is_empty() {
            return;
        }
        self.diagnostics.debug(format_args!(
            "flushing {} pending events before shutdown",
            events.len()
        ));

        let max_size = self.config.max_size.max(1);
        while !events.is_empty() {
            let rest = events.split_off(events.len().min(max_size));
            let chunk = std::mem::replace(&mut events, rest);
            self.flush(Batch::new(chunk, BatchTrigger::Shutdown)).await;
        }
    }

    /// Delivers the batch in order. The first failure abandons the rest of it.
    async fn flush(&self, batch: Batch) {
        let total = batch.size();
        self.stats.record_batch_flushed();
        self.diagnostics.debug(format_args!(
            "reporting {total} events (batch {}, {:?})",
            batch.id(),
            batch.trigger()
        ));

        for (index, event) in batch.events().iter().enumerate() {
            match self.collector.deliver(event).await {
                Ok(delivery) => {
                    self.stats.record_delivered();
                    self.diagnostics.debug(format_args!(
                        "{}: {}",
                        delivery.status,
                        String::from_utf8_lossy(&delivery.body)
                    ));
                }
                Err(error) => {
                    self.stats.record_delivery_failures(total - index);
                    self.diagnostics.error(format_args!(
                        "failed to send tracking (batch {}): {error}",
                        batch.id()
                    ));
                    return;
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
