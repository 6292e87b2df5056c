//! Data Transfer Objects
//!
//! Payloads crossing a process boundary: source-control webhooks coming in,
//! trigger requests and log deliveries exchanged with HTTP/WebSocket clients.

pub mod job;
pub mod log;
pub mod webhook;
