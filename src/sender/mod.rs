pub mod client;
pub mod serialization;

pub use client::{ClientConfig, ClientError, ClientStats, CollectorClient, ConnectionStats, Delivery};
pub use serialization::TrackEnvelope;

use crate::domain::VisitEvent;
use std::future::Future;

/// Remote analytics collector as seen by the supervisor and the worker.
pub trait Collector: Send + Sync + 'static {
    /// Reachability check; any non-success answer is an error.
    fn probe(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Delivers a single event. One attempt, no retries.
    fn deliver(
        &self,
        event: &VisitEvent,
    ) -> impl Future<Output = Result<Delivery, ClientError>> + Send;
}
