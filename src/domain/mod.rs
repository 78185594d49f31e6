//! Domain layer for rybbit-feeder.
//!
//! Contains the canonical types shared across all modules:
//! - `VisitEvent`: one tracked page view, the pipeline's core data type
//! - `SiteMap`: hostname to site identifier lookup
//! - `RequestMeta`: the request metadata the filter and event builder read
//! - `FeederError`: Top-level error type

pub mod error;
pub mod request_meta;
pub mod site_map;
pub mod visit_event;

pub use error::FeederError;
pub use request_meta::{RemoteAddr, RequestMeta, parse_accept_language, parse_domain_from_host};
pub use site_map::SiteMap;
pub use visit_event::{EventKind, VisitEvent};
