//! Model provider abstractions.
//!
//! - `LlmProvider`: RPITIT trait for concrete chat-completion backends
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `structured`: JSON-schema response formats and output decoding

pub mod box_provider;
pub mod provider;
pub mod structured;

pub use box_provider::BoxLlmProvider;
pub use provider::LlmProvider;
