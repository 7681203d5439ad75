//! Runtime errors raised by the virtual machine.
//!
//! # Error Categories
//!
//! - **Runtime errors**: a failing instruction. Carry the kind of failure plus
//!   the function, program counter and instruction where it happened.
//! - **Resource exceeded errors**: the call stack grew past the configured limit.
//! - **Setup errors**: the program cannot start (no `main`, or `main` expects
//!   arguments).
//!
//! Every error aborts the run; there is no recovery inside a program.

use core::fmt;

use super::heap::ObjectId;

#[derive(Debug)]
pub enum ExecutionError {
    Runtime(RuntimeError),
    ResourceExceeded(ResourceExceededError),
    /// No frame template named `main` was registered.
    MissingMain,
    /// `main` was registered with a non-zero arity.
    MainArity(usize),
}

/// A failing instruction together with where it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Name of the executing function.
    pub function: String,
    /// Index of the failing instruction in its frame template.
    pub pc: usize,
    /// Textual form of the failing instruction.
    pub instruction: String,
}

/// The closed taxonomy of runtime failures.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    /// A nil operand where a concrete value is required.
    NilDereference,

    /// Character index outside `[0, len)`.
    IndexOutOfRange { index: i64, len: usize },

    /// Text that does not parse as the requested number type.
    Conversion { text: String, target: &'static str },

    /// Access to a freed or never-allocated object, or to a field the object
    /// was not allocated with.
    InvalidHeapAccess {
        id: ObjectId,
        field: Option<String>,
    },

    /// `call` of a name with no registered frame template.
    UnknownFunction { name: String },

    /// Integer or floating-point division or remainder by zero.
    DivisionByZero,

    /// Bytecode that violates the instruction contract: an operand of the
    /// wrong type, an empty operand stack or an unset local slot.
    InvalidOperand { message: String },

    /// The input or output stream failed.
    Io { message: String },
}

impl RuntimeErrorKind {
    pub(crate) fn invalid_operand(message: impl Into<String>) -> Self {
        RuntimeErrorKind::InvalidOperand {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceExceededError {
    /// Call depth exceeded.
    StackOverflow { depth: usize, max_depth: usize },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Runtime(e) => write!(f, "{}", e),
            ExecutionError::ResourceExceeded(e) => write!(f, "{}", e),
            ExecutionError::MissingMain => write!(f, "No function named 'main' is registered"),
            ExecutionError::MainArity(arity) => write!(
                f,
                "Function 'main' must take no arguments, but takes {}",
                arity
            ),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (in {} at {}: {})",
            self.kind, self.function, self.pc, self.instruction
        )
    }
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeErrorKind::NilDereference => write!(f, "Nil dereference"),
            RuntimeErrorKind::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range (length: {})", index, len)
            }
            RuntimeErrorKind::Conversion { text, target } => {
                write!(f, "Cannot convert {:?} to {}", text, target)
            }
            RuntimeErrorKind::InvalidHeapAccess { id, field: None } => {
                write!(f, "Invalid heap access: object {} does not exist", id)
            }
            RuntimeErrorKind::InvalidHeapAccess {
                id,
                field: Some(field),
            } => write!(
                f,
                "Invalid heap access: object {} has no field '{}'",
                id, field
            ),
            RuntimeErrorKind::UnknownFunction { name } => {
                write!(f, "Unknown function '{}'", name)
            }
            RuntimeErrorKind::DivisionByZero => write!(f, "Division by zero"),
            RuntimeErrorKind::InvalidOperand { message } => {
                write!(f, "Invalid operand: {}", message)
            }
            RuntimeErrorKind::Io { message } => write!(f, "I/O error: {}", message),
        }
    }
}

impl fmt::Display for ResourceExceededError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceExceededError::StackOverflow { depth, max_depth } => {
                write!(
                    f,
                    "Call stack overflow: depth {} exceeds maximum of {}",
                    depth, max_depth
                )
            }
        }
    }
}

impl From<RuntimeError> for ExecutionError {
    fn from(e: RuntimeError) -> Self {
        ExecutionError::Runtime(e)
    }
}

impl From<ResourceExceededError> for ExecutionError {
    fn from(e: ResourceExceededError) -> Self {
        ExecutionError::ResourceExceeded(e)
    }
}

impl std::error::Error for ExecutionError {}
impl std::error::Error for RuntimeError {}
impl std::error::Error for ResourceExceededError {}
