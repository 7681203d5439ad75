//! Host-facing configuration.

pub mod options;

pub use options::ExecutionOptions;
