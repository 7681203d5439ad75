//! MyPL - a small statically typed imperative language running on a stack VM
//!
//! # Overview
//!
//! A validated program tree (records, functions, statements) is compiled
//! into one frame template per function, then run by a stack-based virtual
//! machine with explicit heap allocation and deallocation.
//!
//! # Quick Start
//!
//! ```
//! use mypl::{AstBuilder, BinaryOp, ExecutionOptions, Value};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//!
//! // fun int main() { return 6 * 7 }
//! let main = b.function(
//!     "main",
//!     "int",
//!     &[],
//!     vec![b.ret(Some(b.binary(BinaryOp::Mul, b.int(6), b.int(7))))],
//! );
//! let program = b.program(vec![], vec![main]);
//!
//! let result = mypl::run(program, ExecutionOptions::default()).unwrap();
//! assert_eq!(result, Value::Int(42));
//! ```
//!
//! # Inspecting bytecode
//!
//! [`Code`] implements `Display` as a labelled instruction listing, one
//! frame per function:
//!
//! ```
//! # use mypl::AstBuilder;
//! # use bumpalo::Bump;
//! # let arena = Bump::new();
//! # let b = AstBuilder::new(&arena);
//! # let program = b.program(vec![], vec![b.function("main", "void", &[], vec![])]);
//! let code = mypl::compile(program).unwrap();
//! assert!(code.to_string().starts_with("frame main (arity 0)"));
//! ```

mod error;

// Program trees are allocated in a `bumpalo` arena.
pub use bumpalo;

pub use error::{Error, render_error, render_error_to_string};

// Re-export public API from mypl_core
pub use mypl_core::api::ExecutionOptions;
pub use mypl_core::ast::{
    self, AstBuilder, BinaryOp, Direction, Expr, FunDecl, Literal, Program, Stmt, TypeDecl,
};
pub use mypl_core::compiler::{BytecodeCompiler, CompileError};
pub use mypl_core::vm::{
    self, Code, Constant, ExecutionError, FrameTemplate, Heap, Instruction, ObjectId,
    ResourceExceededError, RuntimeError, RuntimeErrorKind, VM, Value,
};

use std::io;

/// Compile a validated program into frame templates.
pub fn compile<'a>(program: &'a Program<'a>) -> Result<Code, Error> {
    Ok(BytecodeCompiler::compile(program)?)
}

/// Compile and run a program against the process's standard input and output.
///
/// Returns the value `main` returned.
pub fn run<'a>(program: &'a Program<'a>, options: ExecutionOptions) -> Result<Value, Error> {
    let code = compile(program)?;
    let mut vm = VM::new(&code).with_options(options);
    Ok(vm.run()?)
}

/// Compile and run a program with caller-supplied input and output streams.
pub fn run_with_io<'a>(
    program: &'a Program<'a>,
    options: ExecutionOptions,
    input: impl io::BufRead,
    output: impl io::Write,
) -> Result<Value, Error> {
    let code = compile(program)?;
    let mut vm = VM::with_io(&code, input, output).with_options(options);
    Ok(vm.run()?)
}
