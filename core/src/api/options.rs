//! Configuration options for running compiled programs.

/// Configuration options for program execution.
///
/// These options control resource limits of the virtual machine.
///
/// # Example
///
/// ```
/// use mypl_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions { max_depth: 500 };
/// assert!(options.max_depth < ExecutionOptions::default().max_depth);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Maximum number of live activation frames (for recursion protection).
    ///
    /// Default: 10 000
    pub max_depth: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self { max_depth: 10_000 }
    }
}
