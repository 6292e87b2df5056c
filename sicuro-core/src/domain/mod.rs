//! Core domain types
//!
//! This module contains the core domain structures used across Sicuro crates.
//! They carry no I/O: the runner and server decide where files live and when
//! they are read or written.

pub mod job;
pub mod language;
pub mod ledger;
pub mod log;
