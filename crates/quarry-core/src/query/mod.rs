//! Structured query compilation.
//!
//! Turns a declarative `SearchQuerySpec` into the boolean string lexical
//! providers expect and the natural-language string semantic providers
//! expect.

pub mod compiler;

pub use compiler::{clean_terms, compile, compile_boolean, compile_semantic, quote_term};
