//! Multi-provider search.
//!
//! Providers implement a fixed three-capability interface (lexical,
//! semantic, context). The aggregator fans a logical search out to every
//! capable provider, isolates their failures, and ranks the merged results.

pub mod aggregator;
pub mod box_provider;
pub mod fetch;
pub mod provider;
pub mod rank;
pub mod registry;

pub use aggregator::{SearchAggregator, SearchOutcome};
pub use box_provider::BoxSearchProvider;
pub use fetch::{BoxPageFetcher, PageExcerpt, PageFetcher, SeedFetcher};
pub use provider::SearchProvider;
pub use rank::merge_and_rank;
pub use registry::ProviderRegistry;
