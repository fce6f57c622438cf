//! Business logic and port traits for Quarry.
//!
//! This crate holds the research pipeline proper: the query compiler, the
//! search aggregator, the memory document contract, the pipeline engine and
//! the built-in stages. It defines the "ports" (provider, store and
//! repository traits) that `quarry-infra` implements, and depends only on
//! `quarry-types` -- never on `quarry-infra` or any database/IO crate.

pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod query;
pub mod repository;
pub mod search;
pub mod stages;

#[cfg(test)]
pub(crate) mod testing;
