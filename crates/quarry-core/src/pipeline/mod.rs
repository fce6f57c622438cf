//! Pipeline engine: named stage graphs over shared state.
//!
//! - `state` -- `ResearchState`, `StateUpdate` and the merge reducer
//! - `context` -- frozen per-run context built from a validated request
//! - `stage` -- the `Stage` trait, `StageTools` and `StageError`
//! - `graph` -- stage graph declaration and validation
//! - `registry` -- name -> workflow lookup
//! - `retry` -- bounded backoff for transient errors
//! - `checkpoint` -- durable checkpoint manager
//! - `engine` -- sequential executor with resume and cancellation

pub mod checkpoint;
pub mod context;
pub mod engine;
pub mod graph;
pub mod registry;
pub mod retry;
pub mod stage;
pub mod state;

pub use checkpoint::{CheckpointError, CheckpointManager};
pub use context::ResearchContext;
pub use engine::{EngineError, PipelineEngine, RunOutcome, WorkflowInfo};
pub use graph::{GraphError, WorkflowGraph};
pub use registry::{RegistryError, WorkflowRegistry};
pub use retry::RetryPolicy;
pub use stage::{BoxStage, Stage, StageError, StageInput, StageTools};
pub use state::{LogEntry, LogRole, ResearchState, StateUpdate};
