//! Service layer
//!
//! Business logic between the HTTP handlers and the runner.

pub mod log;
pub mod tail;
pub mod trigger;
pub mod webhook;

pub use log as log_service;
pub use trigger as trigger_service;
pub use webhook as webhook_service;
