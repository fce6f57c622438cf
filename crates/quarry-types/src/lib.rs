//! Shared domain types for Quarry.
//!
//! This crate contains the data shapes used across the research pipeline:
//! requests and their validation, search records, memory and note records,
//! run/checkpoint records, configuration, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, schemars.

pub mod config;
pub mod error;
pub mod llm;
pub mod note;
pub mod output;
pub mod query;
pub mod research;
pub mod search;
pub mod source;
pub mod workflow;
