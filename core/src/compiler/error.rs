//! Bytecode compilation errors.

/// Errors that can occur during bytecode compilation.
///
/// The compiler expects a program that already passed name resolution and
/// type checking. These errors report a tree that did not, instead of
/// emitting bytecode that would fail later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A variable used or assigned without a declaration in scope.
    UndefinedVariable(String),
    /// `new T` for a type that was never declared.
    UndefinedType(String),
    /// A call to a name that is neither a built-in nor a declared function.
    UndefinedFunction(String),
}

impl core::fmt::Display for CompileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CompileError::UndefinedVariable(name) => write!(f, "Undefined variable '{}'", name),
            CompileError::UndefinedType(name) => write!(f, "Undefined type '{}'", name),
            CompileError::UndefinedFunction(name) => write!(f, "Undefined function '{}'", name),
        }
    }
}

impl std::error::Error for CompileError {}
