//! Common utilities and helpers

pub mod logging;
pub mod path;
pub mod time;

pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use path::PathUtils;
pub use time::TimeParser;
