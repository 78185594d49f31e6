pub mod retry;
pub mod supervisor;

pub use retry::RetryPolicy;
pub use supervisor::{ConnectionSupervisor, SupervisorOutcome, SupervisorState};
