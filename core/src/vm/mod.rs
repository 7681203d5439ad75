//! Stack-based virtual machine.

mod code;
mod error;
mod heap;
mod instruction_set;
mod operators;
mod runtime;
mod stack;
mod value;

pub use code::{Code, FrameTemplate};
pub use error::{ExecutionError, ResourceExceededError, RuntimeError, RuntimeErrorKind};
pub use heap::{Fields, Heap, ObjectId};
pub use instruction_set::{Constant, Instruction};
pub use runtime::VM;
pub use value::Value;

pub(crate) use stack::Stack;
