//! Program tree consumed by the bytecode compiler.
//!
//! Nodes live in a `bumpalo` arena and borrow from it. The tree is assumed to
//! be already validated by the static checker: names resolve, operand types
//! match the operators applied to them, and no name is redeclared in the
//! same scope.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Program<'a> {
    pub types: &'a [TypeDecl<'a>],
    pub functions: &'a [FunDecl<'a>],
}

/// A user-defined record type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeDecl<'a> {
    pub name: &'a str,
    /// Fields in declaration order, each with its initializer.
    pub fields: &'a [VarDecl<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunDecl<'a> {
    pub name: &'a str,
    pub return_type: &'a str,
    pub params: &'a [Param<'a>],
    pub body: &'a [Stmt<'a>],
}

impl<'a> FunDecl<'a> {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'a> {
    pub name: &'a str,
    pub ty: &'a str,
}

/// `var name: ty = init`, used both for locals and for record fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDecl<'a> {
    pub name: &'a str,
    pub ty: Option<&'a str>,
    pub init: &'a Expr<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'a> {
    VarDecl(VarDecl<'a>),
    /// `a = e` or `a.b.c = e`. The target always has at least one segment.
    Assign {
        target: &'a [&'a str],
        value: &'a Expr<'a>,
    },
    /// `if` followed by zero or more `elif`s, then an optional `else`.
    ///
    /// REQUIRES: `branches` is non-empty; `branches[0]` is the `if` part.
    If {
        branches: &'a [CondBranch<'a>],
        else_body: Option<&'a [Stmt<'a>]>,
    },
    While {
        cond: &'a Expr<'a>,
        body: &'a [Stmt<'a>],
    },
    For {
        var: &'a str,
        start: &'a Expr<'a>,
        direction: Direction,
        end: &'a Expr<'a>,
        body: &'a [Stmt<'a>],
    },
    Return(Option<&'a Expr<'a>>),
    Delete(&'a str),
    /// A call whose result is discarded.
    Call(Call<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CondBranch<'a> {
    pub cond: &'a Expr<'a>,
    pub body: &'a [Stmt<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upto,
    Downto,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Call<'a> {
    pub name: &'a str,
    pub args: &'a [&'a Expr<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'a> {
    Literal(Literal<'a>),
    /// `a` or `a.b.c`. The path always has at least one segment.
    Path(&'a [&'a str]),
    /// `new T`
    New(&'a str),
    Call(Call<'a>),
    /// Arithmetic negation.
    Neg(&'a Expr<'a>),
    /// Logical-not prefix, applied to the whole subexpression.
    Not(&'a Expr<'a>),
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
}

#[derive(Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Int(i64),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(&'a str),
    Nil,
}

impl<'a> core::fmt::Debug for Literal<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "Int({value})"),
            Literal::Double(value) => write!(f, "Double({value:?})"),
            Literal::Bool(b) => write!(f, "Bool({b})"),
            Literal::Char(c) => write!(f, "Char({c:?})"),
            Literal::Str(s) => write!(f, "Str({s:?})"),
            Literal::Nil => write!(f, "Nil"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    /// The operator as written in source.
    pub const fn lexeme(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }

    /// Inverse of [`BinaryOp::lexeme`].
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        Some(match lexeme {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexeme_round_trips() {
        for op in [BinaryOp::Add, BinaryOp::Mod, BinaryOp::And, BinaryOp::Le, BinaryOp::Ne] {
            assert_eq!(BinaryOp::from_lexeme(op.lexeme()), Some(op));
        }
        assert_eq!(BinaryOp::from_lexeme("**"), None);
    }

    #[test]
    fn test_literal_debug() {
        assert_eq!(format!("{:?}", Literal::Double(2.0)), "Double(2.0)");
        assert_eq!(format!("{:?}", Literal::Str("hi")), "Str(\"hi\")");
        assert_eq!(format!("{:?}", Literal::Char('a')), "Char('a')");
    }
}
