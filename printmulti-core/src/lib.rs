//! Printmulti Core
//!
//! Core types for the multi-page print orchestration service.
//!
//! This crate contains:
//! - Domain types: print spec, per-timestamp jobs, progress records
//! - DTOs: wire types exchanged with clients and the print backend

pub mod domain;
pub mod dto;
