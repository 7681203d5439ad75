//! Bytecode compiler for MyPL programs.
//!
//! This module transforms a validated program tree into frame templates for
//! the virtual machine, one per function declaration.
//!
//! ## Design
//!
//! - Walks statements and expressions with exhaustive matches over the tree
//! - Tracks stack depth precisely, checking statement neutrality in debug builds
//! - Assigns a fresh local slot to every declaration, resolved through a
//!   lexical scope stack
//! - Emits forward jumps as placeholders and backpatches them by index

mod bytecode;
mod error;


pub use bytecode::BytecodeCompiler;
pub use error::CompileError;
