// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Millisecond durations fit in u64
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. ClientError in sender module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod buffer;
pub mod diagnostics;
pub mod domain;
pub mod filter;
pub mod intercept;
pub mod reliability;
pub mod sender;

// Re-export main types for easy access
pub use app::{Config, Feeder};
pub use domain::{FeederError, RemoteAddr, SiteMap, VisitEvent};
pub use filter::FilterEngine;
pub use intercept::{Handler, ResponseBuffer, ResponseWriter};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
