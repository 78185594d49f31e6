use crate::domain::VisitEvent;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchTrigger {
    SizeBased,
    TimeBased,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_size: usize,
    pub max_wait: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: 20,
            max_wait: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    events: Vec<VisitEvent>,
    trigger: BatchTrigger,
}

impl Batch {
    pub fn new(events: Vec<VisitEvent>, trigger: BatchTrigger) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            events,
            trigger,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[VisitEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<VisitEvent> {
        self.events
    }

    pub fn trigger(&self) -> BatchTrigger {
        self.trigger
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Accumulator for the batch currently being formed by the worker.
#[derive(Debug)]
pub struct PendingBatch {
    events: Vec<VisitEvent>,
    max_size: usize,
}

impl PendingBatch {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            events: Vec::with_capacity(max_size),
            max_size,
        }
    }

    /// Appends an event and reports whether the batch reached its size limit.
    pub fn push(&mut self, event: VisitEvent) -> bool {
        self.events.push(event);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.max_size
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Hands out the accumulated events, leaving the accumulator empty.
    /// Returns `None` when nothing is pending.
    pub fn take(&mut self, trigger: BatchTrigger) -> Option<Batch> {
        if self.events.is_empty() {
            return None;
        }
        let events = std::mem::replace(&mut self.events, Vec::with_capacity(self.max_size));
        Some(Batch::new(events, trigger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_batch_reports_full_and_resets() {
        let mut pending = PendingBatch::new(2);
        assert!(pending.take(BatchTrigger::TimeBased).is_none());

        assert!(!pending.push(VisitEvent::pageview("k", "1", "/a")));
        assert!(pending.push(VisitEvent::pageview("k", "1", "/b")));

        let batch = pending.take(BatchTrigger::SizeBased).unwrap();
        assert_eq!(batch.size(), 2);
        assert_eq!(batch.trigger(), BatchTrigger::SizeBased);
        assert!(!batch.id().is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn batches_get_distinct_ids() {
        let first = Batch::new(vec![VisitEvent::pageview("k", "1", "/")], BatchTrigger::Shutdown);
        let second = Batch::new(Vec::new(), BatchTrigger::TimeBased);
        assert_ne!(first.id(), second.id());
        assert!(second.is_empty());
    }

    #[test]
    fn zero_max_size_is_clamped() {
        let pending = PendingBatch::new(0);
        assert_eq!(pending.max_size(), 1);
    }
}
