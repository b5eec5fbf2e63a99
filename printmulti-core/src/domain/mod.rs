//! Core domain types
//!
//! This module contains the domain structures shared between the
//! orchestration engine and the backend client: the client-submitted print
//! spec, the per-timestamp jobs derived from it, and the progress record
//! polled by submitting clients.

pub mod job;
pub mod progress;
pub mod qrcode;
pub mod spec;
