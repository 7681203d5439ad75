use bumpalo::Bump;

use super::program::{
    BinaryOp, Call, CondBranch, Direction, Expr, FunDecl, Literal, Param, Program, Stmt, TypeDecl,
    VarDecl,
};

/// Arena-backed constructors for program trees.
///
/// Hosts without a parser (and the tests) build validated programs through
/// this builder. Every node and string is copied into the arena, so the
/// resulting tree borrows only from it.
///
/// # Example
///
/// ```
/// use mypl_core::ast::{AstBuilder, BinaryOp};
/// use bumpalo::Bump;
///
/// let arena = Bump::new();
/// let b = AstBuilder::new(&arena);
///
/// let body = vec![
///     b.var_decl("x", b.binary(BinaryOp::Add, b.int(1), b.int(2))),
///     b.call_stmt("print", &[b.var("x")]),
/// ];
/// let program = b.program(vec![], vec![b.function("main", "void", &[], body)]);
/// assert_eq!(program.functions.len(), 1);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct AstBuilder<'a> {
    arena: &'a Bump,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self { arena }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    fn str(&self, s: &str) -> &'a str {
        self.arena.alloc_str(s)
    }

    fn strs(&self, segments: &[&str]) -> &'a [&'a str] {
        let arena = self.arena;
        arena.alloc_slice_fill_iter(segments.iter().map(|s| &*arena.alloc_str(s)))
    }

    fn expr(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(expr)
    }

    fn stmts(&self, body: Vec<Stmt<'a>>) -> &'a [Stmt<'a>] {
        self.arena.alloc_slice_fill_iter(body)
    }

    fn call_node(&self, name: &str, args: &[&'a Expr<'a>]) -> Call<'a> {
        Call {
            name: self.str(name),
            args: self.arena.alloc_slice_copy(args),
        }
    }

    // === Expressions ===

    pub fn int(&self, value: i64) -> &'a Expr<'a> {
        self.expr(Expr::Literal(Literal::Int(value)))
    }

    pub fn double(&self, value: f64) -> &'a Expr<'a> {
        self.expr(Expr::Literal(Literal::Double(value)))
    }

    pub fn bool(&self, value: bool) -> &'a Expr<'a> {
        self.expr(Expr::Literal(Literal::Bool(value)))
    }

    pub fn char(&self, value: char) -> &'a Expr<'a> {
        self.expr(Expr::Literal(Literal::Char(value)))
    }

    pub fn string(&self, value: &str) -> &'a Expr<'a> {
        let value = self.str(value);
        self.expr(Expr::Literal(Literal::Str(value)))
    }

    pub fn nil(&self) -> &'a Expr<'a> {
        self.expr(Expr::Literal(Literal::Nil))
    }

    /// A plain variable reference.
    pub fn var(&self, name: &str) -> &'a Expr<'a> {
        self.path(&[name])
    }

    /// A field path such as `a.b.c`.
    pub fn path(&self, segments: &[&str]) -> &'a Expr<'a> {
        debug_assert!(!segments.is_empty(), "empty path");
        self.expr(Expr::Path(self.strs(segments)))
    }

    pub fn new_record(&self, type_name: &str) -> &'a Expr<'a> {
        self.expr(Expr::New(self.str(type_name)))
    }

    pub fn call(&self, name: &str, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        self.expr(Expr::Call(self.call_node(name, args)))
    }

    pub fn neg(&self, operand: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Neg(operand))
    }

    pub fn not(&self, operand: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Not(operand))
    }

    pub fn binary(&self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Binary { op, left, right })
    }

    // === Statements ===

    pub fn var_decl(&self, name: &str, init: &'a Expr<'a>) -> Stmt<'a> {
        Stmt::VarDecl(self.field(name, init))
    }

    pub fn assign(&self, target: &[&str], value: &'a Expr<'a>) -> Stmt<'a> {
        debug_assert!(!target.is_empty(), "empty assignment target");
        Stmt::Assign {
            target: self.strs(target),
            value,
        }
    }

    pub fn branch(&self, cond: &'a Expr<'a>, body: Vec<Stmt<'a>>) -> CondBranch<'a> {
        CondBranch {
            cond,
            body: self.stmts(body),
        }
    }

    /// `if`/`elif` chain: the first branch is the `if`, the rest are `elif`s.
    pub fn if_stmt(
        &self,
        branches: Vec<CondBranch<'a>>,
        else_body: Option<Vec<Stmt<'a>>>,
    ) -> Stmt<'a> {
        debug_assert!(!branches.is_empty(), "if statement without a condition");
        Stmt::If {
            branches: self.arena.alloc_slice_fill_iter(branches),
            else_body: else_body.map(|body| self.stmts(body)),
        }
    }

    pub fn while_loop(&self, cond: &'a Expr<'a>, body: Vec<Stmt<'a>>) -> Stmt<'a> {
        Stmt::While {
            cond,
            body: self.stmts(body),
        }
    }

    pub fn for_loop(
        &self,
        var: &str,
        start: &'a Expr<'a>,
        direction: Direction,
        end: &'a Expr<'a>,
        body: Vec<Stmt<'a>>,
    ) -> Stmt<'a> {
        Stmt::For {
            var: self.str(var),
            start,
            direction,
            end,
            body: self.stmts(body),
        }
    }

    pub fn ret(&self, value: Option<&'a Expr<'a>>) -> Stmt<'a> {
        Stmt::Return(value)
    }

    pub fn delete(&self, name: &str) -> Stmt<'a> {
        Stmt::Delete(self.str(name))
    }

    pub fn call_stmt(&self, name: &str, args: &[&'a Expr<'a>]) -> Stmt<'a> {
        Stmt::Call(self.call_node(name, args))
    }

    // === Declarations ===

    /// A field (or local) declaration without a type annotation.
    pub fn field(&self, name: &str, init: &'a Expr<'a>) -> VarDecl<'a> {
        VarDecl {
            name: self.str(name),
            ty: None,
            init,
        }
    }

    pub fn type_decl(&self, name: &str, fields: Vec<VarDecl<'a>>) -> TypeDecl<'a> {
        TypeDecl {
            name: self.str(name),
            fields: self.arena.alloc_slice_fill_iter(fields),
        }
    }

    /// A function declaration; `params` are `(name, type)` pairs.
    pub fn function(
        &self,
        name: &str,
        return_type: &str,
        params: &[(&str, &str)],
        body: Vec<Stmt<'a>>,
    ) -> FunDecl<'a> {
        let params = self
            .arena
            .alloc_slice_fill_iter(params.iter().map(|(name, ty)| Param {
                name: self.str(name),
                ty: self.str(ty),
            }));
        FunDecl {
            name: self.str(name),
            return_type: self.str(return_type),
            params,
            body: self.stmts(body),
        }
    }

    pub fn program(&self, types: Vec<TypeDecl<'a>>, functions: Vec<FunDecl<'a>>) -> &'a Program<'a> {
        self.arena.alloc(Program {
            types: self.arena.alloc_slice_fill_iter(types),
            functions: self.arena.alloc_slice_fill_iter(functions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_copies_strings_into_arena() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);

        let owned = String::from("point");
        let expr = b.path(&[owned.as_str(), "x"]);
        drop(owned);

        match expr {
            Expr::Path(segments) => assert_eq!(*segments, ["point", "x"]),
            other => panic!("Expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_function_params_keep_declaration_order() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);

        let f = b.function("f", "int", &[("a", "int"), ("b", "string")], vec![]);
        assert_eq!(f.arity(), 2);
        assert_eq!(f.params[0].name, "a");
        assert_eq!(f.params[1].ty, "string");
    }
}
