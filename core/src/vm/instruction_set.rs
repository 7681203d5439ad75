//! MyPL VM Instructions
//!
//! This module defines the instruction set of the stack-based virtual machine.
//!
//! # Design Principles
//!
//! - **Stack-based**: operations consume operands from the operand stack of the
//!   current activation frame and push their result back onto it
//! - **Typed operands**: every operand is a real Rust value (slot index, jump
//!   target, literal, field or function name), never an untyped payload
//! - **Absolute jumps**: jump operands are instruction indices within the
//!   frame template, not relative offsets
//! - **Dynamic typing**: a single `add` serves ints, doubles and strings; the
//!   VM dispatches on the runtime values
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`.
//! Binary operators pop the right operand first and compute `left op right`.

use core::fmt;

use ecow::EcoString;

/// A single VM instruction: an opcode plus its operand, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // ========================================================================
    // Stack & Variables
    // ========================================================================
    /// Push a literal.
    /// Stack: [...] -> [..., value]
    Push(Constant),

    /// Discard the top value.
    /// Stack: [..., a] -> [...]
    Pop,

    /// Copy a local slot onto the stack.
    /// Operand: slot index | Stack: [...] -> [..., value]
    Load(usize),

    /// Pop into a local slot, growing the slot array when the index is new.
    /// Operand: slot index | Stack: [..., value] -> [...]
    Store(usize),

    // ========================================================================
    // Arithmetic
    // ========================================================================
    /// Numeric addition, or concatenation when either operand is a string.
    /// Stack: [..., a, b] -> [..., a+b]
    Add,

    /// Stack: [..., a, b] -> [..., a-b]
    Sub,

    /// Stack: [..., a, b] -> [..., a*b]
    Mul,

    /// Errors on a zero divisor.
    /// Stack: [..., a, b] -> [..., a/b]
    Div,

    /// Integer-only remainder. Errors on a zero divisor.
    /// Stack: [..., a: Int, b: Int] -> [..., a%b]
    Mod,

    /// Numeric negation.
    /// Stack: [..., a] -> [..., -a]
    Neg,

    // ========================================================================
    // Logical
    // ========================================================================
    /// Stack: [..., a: Bool, b: Bool] -> [..., a&&b]
    And,

    /// Stack: [..., a: Bool, b: Bool] -> [..., a||b]
    Or,

    /// Stack: [..., a: Bool] -> [..., !a]
    Not,

    // ========================================================================
    // Comparison
    // ========================================================================
    /// Numeric, character or lexicographic string ordering.
    /// Stack: [..., a, b] -> [..., a<b: Bool]
    CmpLt,

    /// Stack: [..., a, b] -> [..., a<=b: Bool]
    CmpLe,

    /// Stack: [..., a, b] -> [..., a>b: Bool]
    CmpGt,

    /// Stack: [..., a, b] -> [..., a>=b: Bool]
    CmpGe,

    /// Structural equality; nil equals only nil, references compare by id.
    /// Stack: [..., a, b] -> [..., a==b: Bool]
    CmpEq,

    /// Stack: [..., a, b] -> [..., a!=b: Bool]
    CmpNe,

    // ========================================================================
    // Control Flow
    // ========================================================================
    /// Unconditional jump to an instruction index.
    /// Stack: [...] -> [...]
    Jmp(usize),

    /// Pop a boolean and jump if it is false.
    /// Stack: [..., cond: Bool] -> [...]
    Jmpf(usize),

    /// Call a frame template by name. The callee's arity decides how many
    /// arguments move from the caller's stack to the callee's stack.
    /// Stack: [..., arg1, ..., argN] -> [..., result]
    Call(String),

    /// Return the top value to the caller.
    /// Stack: [..., retval] -> (caller) [..., retval]
    VRet,

    // ========================================================================
    // Built-ins
    // ========================================================================
    /// Print a value's textual form (no separator, no newline).
    /// Stack: [..., value] -> [...]
    Write,

    /// Read one line from the input stream.
    /// Stack: [...] -> [..., line: String]
    Read,

    /// Character length of a string.
    /// Stack: [..., s: String] -> [..., len: Int]
    Len,

    /// Single-character substring at an index.
    /// Stack: [..., index: Int, s: String] -> [..., c: String]
    GetChr,

    /// Stack: [..., value] -> [..., value as Int]
    ToInt,

    /// Stack: [..., value] -> [..., value as Double]
    ToDbl,

    /// Stack: [..., value] -> [..., text: String]
    ToStr,

    // ========================================================================
    // Heap
    // ========================================================================
    /// Allocate an object whose fields all start as nil.
    /// Operand: field names | Stack: [...] -> [..., oid]
    Alloc(Vec<String>),

    /// Stack: [..., oid] -> [...]
    Free,

    /// Operand: field name | Stack: [..., oid] -> [..., value]
    GetFld(String),

    /// Operand: field name | Stack: [..., oid, value] -> [...]
    SetFld(String),

    // ========================================================================
    // Stack Shaping
    // ========================================================================
    /// Stack: [..., a] -> [..., a, a]
    Dup,

    /// Stack: [..., a, b] -> [..., b, a]
    Swap,

    /// No operation
    Nop,
}

impl Instruction {
    /// Number of values popped and pushed by this instruction.
    ///
    /// Returns `None` for `Call`, whose effect depends on the callee's arity
    /// (it pops `arity` values and pushes one).
    pub const fn stack_effect(&self) -> Option<(usize, usize)> {
        use Instruction::*;
        Some(match self {
            Push(_) | Load(_) | Read => (0, 1),
            Pop | Store(_) | Jmpf(_) | VRet | Write | Free => (1, 0),
            Add | Sub | Mul | Div | Mod | And | Or => (2, 1),
            CmpLt | CmpLe | CmpGt | CmpGe | CmpEq | CmpNe | GetChr => (2, 1),
            Neg | Not | Len | ToInt | ToDbl | ToStr | GetFld(_) => (1, 1),
            Alloc(_) => (0, 1),
            SetFld(_) => (2, 0),
            Dup => (1, 2),
            Swap => (2, 2),
            Jmp(_) | Nop => (0, 0),
            Call(_) => return None,
        })
    }

    /// The target of a jump instruction.
    pub const fn jump_target(&self) -> Option<usize> {
        match self {
            Self::Jmp(target) | Self::Jmpf(target) => Some(*target),
            _ => None,
        }
    }

    /// The target operand of a jump instruction, for backpatching.
    pub fn jump_target_mut(&mut self) -> Option<&mut usize> {
        match self {
            Self::Jmp(target) | Self::Jmpf(target) => Some(target),
            _ => None,
        }
    }

    /// Lower-case mnemonic used in bytecode dumps.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::Push(_) => "push",
            Self::Pop => "pop",
            Self::Load(_) => "load",
            Self::Store(_) => "store",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Neg => "neg",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::CmpLt => "cmplt",
            Self::CmpLe => "cmple",
            Self::CmpGt => "cmpgt",
            Self::CmpGe => "cmpge",
            Self::CmpEq => "cmpeq",
            Self::CmpNe => "cmpne",
            Self::Jmp(_) => "jmp",
            Self::Jmpf(_) => "jmpf",
            Self::Call(_) => "call",
            Self::VRet => "vret",
            Self::Write => "write",
            Self::Read => "read",
            Self::Len => "len",
            Self::GetChr => "getchr",
            Self::ToInt => "toint",
            Self::ToDbl => "todbl",
            Self::ToStr => "tostr",
            Self::Alloc(_) => "alloc",
            Self::Free => "free",
            Self::GetFld(_) => "getfld",
            Self::SetFld(_) => "setfld",
            Self::Dup => "dup",
            Self::Swap => "swap",
            Self::Nop => "nop",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match self {
            Self::Push(constant) => write!(f, "{name} {constant}"),
            Self::Load(slot) | Self::Store(slot) => write!(f, "{name} {slot}"),
            Self::Jmp(target) | Self::Jmpf(target) => write!(f, "{name} {target}"),
            Self::Call(callee) => write!(f, "{name} {callee}"),
            Self::GetFld(field) | Self::SetFld(field) => write!(f, "{name} {field}"),
            Self::Alloc(fields) => write!(f, "{name} [{}]", fields.join(", ")),
            _ => f.write_str(name),
        }
    }
}

// ============================================================================
// Literals
// ============================================================================

/// Literal operand of `push`.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Nil,
    Int(i64),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(EcoString),
}

impl From<i64> for Constant {
    fn from(value: i64) -> Self {
        Constant::Int(value)
    }
}

impl From<f64> for Constant {
    fn from(value: f64) -> Self {
        Constant::Double(value)
    }
}

impl From<bool> for Constant {
    fn from(value: bool) -> Self {
        Constant::Bool(value)
    }
}

impl From<char> for Constant {
    fn from(value: char) -> Self {
        Constant::Char(value)
    }
}

impl From<&str> for Constant {
    fn from(value: &str) -> Self {
        Constant::Str(value.into())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Nil => f.write_str("nil"),
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Double(value) => write!(f, "{value:?}"),
            Constant::Bool(value) => write!(f, "{value}"),
            Constant::Char(value) => write!(f, "{value:?}"),
            Constant::Str(value) => write!(f, "{:?}", value.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(Instruction::Push(Constant::Int(42)).to_string(), "push 42");
        assert_eq!(Instruction::Push(Constant::Double(2.0)).to_string(), "push 2.0");
        assert_eq!(Instruction::Push("blue".into()).to_string(), "push \"blue\"");
        assert_eq!(Instruction::Push('a'.into()).to_string(), "push 'a'");
        assert_eq!(Instruction::Push(Constant::Nil).to_string(), "push nil");
        assert_eq!(Instruction::Jmpf(7).to_string(), "jmpf 7");
        assert_eq!(Instruction::Call("sum".into()).to_string(), "call sum");
        assert_eq!(
            Instruction::Alloc(vec!["x".into(), "y".into()]).to_string(),
            "alloc [x, y]"
        );
        assert_eq!(Instruction::SetFld("x".into()).to_string(), "setfld x");
        assert_eq!(Instruction::CmpGe.to_string(), "cmpge");
    }

    #[test]
    fn test_stack_effects() {
        assert_eq!(Instruction::Push(Constant::Nil).stack_effect(), Some((0, 1)));
        assert_eq!(Instruction::Add.stack_effect(), Some((2, 1)));
        assert_eq!(Instruction::SetFld("x".into()).stack_effect(), Some((2, 0)));
        assert_eq!(Instruction::Dup.stack_effect(), Some((1, 2)));
        assert_eq!(Instruction::Call("f".into()).stack_effect(), None);
    }

    #[test]
    fn test_jump_target_patching() {
        let mut jump = Instruction::Jmpf(usize::MAX);
        *jump.jump_target_mut().unwrap() = 12;
        assert_eq!(jump, Instruction::Jmpf(12));
        assert_eq!(jump.jump_target(), Some(12));
        assert_eq!(Instruction::Nop.jump_target(), None);
    }
}
