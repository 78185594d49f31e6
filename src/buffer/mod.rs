pub mod batch;
pub mod metrics;
pub mod queue;

pub use batch::{Batch, BatchConfig, BatchTrigger, PendingBatch};
pub use metrics::{PipelineMetrics, PipelineStats};
pub use queue::{EventQueue, EventReceiver, EventSender, QueueError};
