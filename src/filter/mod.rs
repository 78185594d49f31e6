pub mod engine;
pub mod ip_prefix;
pub mod rules;

pub use engine::{Exclusion, FilterEngine, path_extension};
pub use ip_prefix::{IpPrefix, PrefixError};
pub use rules::{DEFAULT_CLIENT_IP_HEADER, DEFAULT_TRACK_EXTENSIONS, FilterRules};
