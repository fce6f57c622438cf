//! REST API handlers, one module per resource.

pub mod run;
pub mod workflow;
