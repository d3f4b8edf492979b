//! SupportBot Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the other SupportBot crates:
//! - Application configuration (backend address, auth token, realtime tuning)
//! - A single error type covering every failure category
//! - Structured logging with tracing
//! - Common constants

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ConfigHandle};
pub use error::{SbError, SbResult};
pub use logging::init_logging;
