//! Repository traits implemented by the infrastructure layer.

pub mod run;

pub use run::RunRepository;
