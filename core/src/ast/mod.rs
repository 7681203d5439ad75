//! Validated program trees.

mod builder;
mod program;

pub use builder::AstBuilder;
pub use program::{
    BinaryOp, Call, CondBranch, Direction, Expr, FunDecl, Literal, Param, Program, Stmt, TypeDecl,
    VarDecl,
};
