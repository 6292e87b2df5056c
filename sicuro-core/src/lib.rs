//! Sicuro Core
//!
//! Core types and abstractions for the Sicuro CI server.
//!
//! This crate contains:
//! - Domain types: jobs, build statuses, the commit ledger, the language
//!   image table and the on-disk log layout
//! - DTOs: payloads exchanged with webhooks, the HTTP API and its clients

pub mod domain;
pub mod dto;
