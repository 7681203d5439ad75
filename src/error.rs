//! Host-facing errors and their rendering.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};
use mypl_core::{
    compiler::CompileError,
    vm::{ExecutionError, ResourceExceededError, RuntimeError},
};
use thiserror::Error;

/// Anything that stops a program from compiling or running to completion.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Compilation failed: {0}")]
    #[diagnostic(
        code(mypl::compile),
        help("the program tree must pass name resolution before it is compiled")
    )]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(code(mypl::runtime))]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    #[diagnostic(
        code(mypl::resource),
        help("raise `ExecutionOptions::max_depth` or reduce the recursion depth")
    )]
    ResourceExceeded(#[from] ResourceExceededError),

    #[error("No function named 'main' is registered")]
    #[diagnostic(code(mypl::entry_point), help("declare a `main` function"))]
    MissingMain,

    #[error("Function 'main' must take no arguments, but takes {0}")]
    #[diagnostic(code(mypl::entry_point), help("remove the parameters of `main`"))]
    MainArity(usize),
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Runtime(e) => Error::Runtime(e),
            ExecutionError::ResourceExceeded(e) => Error::ResourceExceeded(e),
            ExecutionError::MissingMain => Error::MissingMain,
            ExecutionError::MainArity(arity) => Error::MainArity(arity),
        }
    }
}

/// Render an error with its code and help text to stderr
pub fn render_error(error: &Error) {
    eprint!("{}", render_error_to_string(error));
}

/// Render an error to a String without color codes (useful for tests, logs, etc.)
pub fn render_error_to_string(error: &Error) -> String {
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    let mut out = String::new();
    // Formatting into a String only fails if the handler itself does.
    if handler.render_report(&mut out, error).is_err() {
        return error.to_string();
    }
    out
}
