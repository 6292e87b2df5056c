//! Sicuro Server
//!
//! HTTP front of the CI runner: receives webhooks and manual triggers, and
//! serves job logs as snapshots or live streams.

pub mod api;
pub mod config;
pub mod service;
