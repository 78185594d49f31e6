use super::metrics::PipelineStats;
use crate::domain::VisitEvent;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue full")]
    Full,
    #[error("queue closed")]
    Closed,
    #[error("Invalid queue capacity: {capacity}")]
    InvalidCapacity { capacity: usize },
}

/// Bounded buffer of pending visit events.
///
/// Producers never wait: a full queue rejects the new event and the caller
/// drops it.
pub struct EventQueue;

impl EventQueue {
    pub fn bounded(
        capacity: usize,
        stats: Arc<PipelineStats>,
    ) -> Result<(EventSender, EventReceiver), QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity { capacity });
        }

        let (sender, receiver) = mpsc::channel(capacity);
        Ok((
            EventSender { sender, stats },
            EventReceiver { receiver, capacity },
        ))
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<VisitEvent>,
    stats: Arc<PipelineStats>,
}

impl EventSender {
    /// Single non-blocking enqueue attempt.
    pub fn try_enqueue(&self, event: VisitEvent) -> Result<(), QueueError> {
        match self.sender.try_send(event) {
            Ok(()) => {
                self.stats.record_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_dropped();
                Err(QueueError::Full)
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.record_dropped();
                Err(QueueError::Closed)
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Number of events currently waiting in the queue.
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[derive(Debug)]
pub struct EventReceiver {
    receiver: mpsc::Receiver<VisitEvent>,
    capacity: usize,
}

impl EventReceiver {
    /// Waits for the next event; `None` once every sender is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<VisitEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<VisitEvent> {
        self.receiver.try_recv().ok()
    }

    /// Takes everything currently queued without waiting.
    pub fn drain(&mut self) -> Vec<VisitEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Rejects further enqueues; already queued events stay receivable.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
