//! Infrastructure layer for Quarry.
//!
//! Contains implementations of the ports defined in `quarry-core`: SQLite
//! run and checkpoint storage, filesystem artifacts (memories, vault notes,
//! outputs), HTTP search providers, the OpenAI-compatible model client, and
//! the configuration loaders.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod search;
pub mod sqlite;
