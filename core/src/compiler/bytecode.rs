//! Bytecode compiler implementation.

use hashbrown::HashMap;
use tracing::debug;

use super::CompileError;
use crate::{
    ast::{BinaryOp, Call, CondBranch, Direction, Expr, FunDecl, Literal, Program, Stmt, TypeDecl},
    vm::{Code, Constant, FrameTemplate, Instruction},
};

/// Bytecode compiler that turns a validated program into frame templates.
///
/// Each function is compiled independently into its own instruction
/// sequence. The compiler tracks the operand stack depth of everything it
/// emits, both to size the VM's operand stacks and to check that every
/// statement leaves the stack as it found it.
pub struct BytecodeCompiler<'a> {
    /// Record types by name, for `new` expressions.
    types: HashMap<&'a str, &'a TypeDecl<'a>>,

    /// Declared parameter count of every user function.
    arities: HashMap<&'a str, usize>,

    /// Instructions of the function being compiled.
    instructions: Vec<Instruction>,

    /// Number of local slots handed out in the current function.
    num_locals: usize,

    /// Scope stack for lexical scoping
    ///
    /// Each scope maps variable names to their local slot. The function body
    /// and every nested block push a scope. Slots are never reused, so a
    /// shadowing declaration always gets a fresh one.
    scopes: Vec<HashMap<&'a str, usize>>,

    /// Current stack depth during compilation
    current_stack_depth: usize,

    /// Maximum stack depth of the current function
    max_stack_size: usize,
}

impl<'a> BytecodeCompiler<'a> {
    /// Create a compiler for `program`, indexing its types and functions.
    pub fn new(program: &'a Program<'a>) -> Self {
        let types = program.types.iter().map(|decl| (decl.name, decl)).collect();
        let arities = program
            .functions
            .iter()
            .map(|function| (function.name, function.arity()))
            .collect();

        Self {
            types,
            arities,
            instructions: Vec::new(),
            num_locals: 0,
            scopes: Vec::new(),
            current_stack_depth: 0,
            max_stack_size: 0,
        }
    }

    /// Convenience method to compile a whole program in one call.
    pub fn compile(program: &'a Program<'a>) -> Result<Code, CompileError> {
        let mut compiler = Self::new(program);
        let mut code = Code::new();
        for function in program.functions {
            code.add(compiler.compile_function(function)?);
        }
        Ok(code)
    }

    /// Compile one function declaration into a frame template.
    pub fn compile_function(
        &mut self,
        function: &'a FunDecl<'a>,
    ) -> Result<FrameTemplate, CompileError> {
        self.instructions = Vec::new();
        self.num_locals = 0;
        self.scopes.clear();
        // The arguments are on the operand stack on entry.
        self.current_stack_depth = function.arity();
        self.max_stack_size = function.arity();

        self.push_scope();
        for param in function.params {
            let slot = self.allocate_local(param.name);
            self.emit(Instruction::Store(slot));
        }
        for stmt in function.body {
            self.statement(stmt)?;
        }
        if !matches!(function.body.last(), Some(Stmt::Return(_))) {
            self.emit(Instruction::Push(Constant::Nil));
            self.emit(Instruction::VRet);
        }
        self.pop_scope();

        debug!(
            function = function.name,
            arity = function.arity(),
            instructions = self.instructions.len(),
            locals = self.num_locals,
            max_stack_size = self.max_stack_size,
            "Compiled function"
        );

        Ok(
            FrameTemplate::new(
                function.name,
                function.arity(),
                core::mem::take(&mut self.instructions),
            )
            .with_max_stack_size(self.max_stack_size),
        )
    }

    // === Stack Management ===

    /// Push a value onto the stack (increases depth by 1).
    fn push_stack(&mut self) {
        self.current_stack_depth += 1;
        if self.current_stack_depth > self.max_stack_size {
            self.max_stack_size = self.current_stack_depth;
        }
    }

    /// Pop N values from the stack.
    fn pop_stack_n(&mut self, n: usize) {
        debug_assert!(
            self.current_stack_depth >= n,
            "Stack underflow: trying to pop {} but depth is {}",
            n,
            self.current_stack_depth
        );
        self.current_stack_depth -= n;
    }

    // === Instruction Emission ===

    /// Emit an instruction, applying its stack effect.
    fn emit(&mut self, instruction: Instruction) {
        let Some((pops, pushes)) = instruction.stack_effect() else {
            panic!("{} has no static stack effect", instruction);
        };
        self.pop_stack_n(pops);
        for _ in 0..pushes {
            self.push_stack();
        }
        self.instructions.push(instruction);
    }

    /// Emit a call to a user function: pops its arguments, pushes its result.
    fn emit_call(&mut self, name: &str, arity: usize) {
        self.pop_stack_n(arity);
        self.push_stack();
        self.instructions.push(Instruction::Call(name.into()));
    }

    // === Local Variable Management ===

    /// Look up a variable in the current scope chain.
    ///
    /// Searches from the innermost scope outward.
    fn lookup_local(&self, name: &str) -> Result<usize, CompileError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .ok_or_else(|| CompileError::UndefinedVariable(name.into()))
    }

    /// Allocate a new local variable slot in the current scope.
    fn allocate_local(&mut self, name: &'a str) -> usize {
        let slot = self.num_locals;
        self.num_locals += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, slot);
        }
        slot
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        debug_assert!(!self.scopes.is_empty(), "Cannot pop the function scope twice");
        self.scopes.pop();
    }

    // === Jump Patching Infrastructure ===

    /// Emit a jump whose target is not known yet and return its index.
    ///
    /// The target is filled in later with `patch_jump`.
    fn jump_placeholder(&mut self, make_jump: fn(usize) -> Instruction) -> usize {
        let index = self.label();
        self.emit(make_jump(usize::MAX));
        index
    }

    /// Get the current instruction index (for use as a jump label).
    fn label(&self) -> usize {
        self.instructions.len()
    }

    /// Point the jump at `placeholder_index` to `target_label`.
    fn patch_jump(&mut self, placeholder_index: usize, target_label: usize) {
        match self.instructions[placeholder_index].jump_target_mut() {
            Some(target) => *target = target_label,
            None => debug_assert!(false, "Instruction {} is not a jump", placeholder_index),
        }
    }

    // === Statements ===

    fn block(&mut self, body: &'a [Stmt<'a>]) -> Result<(), CompileError> {
        self.push_scope();
        for stmt in body {
            self.statement(stmt)?;
        }
        self.pop_scope();
        Ok(())
    }

    fn statement(&mut self, stmt: &'a Stmt<'a>) -> Result<(), CompileError> {
        let depth_before = self.current_stack_depth;

        match stmt {
            Stmt::VarDecl(decl) => {
                // The initializer cannot see the variable it initializes.
                self.expression(decl.init)?;
                let slot = self.allocate_local(decl.name);
                self.emit(Instruction::Store(slot));
            }

            Stmt::Assign { target, value } => {
                self.expression(value)?;
                match *target {
                    [name] => {
                        let slot = self.lookup_local(name)?;
                        self.emit(Instruction::Store(slot));
                    }
                    [base, path @ .., field] => {
                        // setfld wants the object below the value.
                        self.emit(Instruction::Load(self.lookup_local(base)?));
                        for segment in path {
                            self.emit(Instruction::GetFld(segment.to_string()));
                        }
                        self.emit(Instruction::Swap);
                        self.emit(Instruction::SetFld(field.to_string()));
                    }
                    [] => panic!("Assignment without a target"),
                }
            }

            Stmt::If {
                branches,
                else_body,
            } => self.if_chain(*branches, *else_body)?,

            Stmt::While { cond, body } => {
                let loop_start = self.label();
                self.expression(cond)?;
                let exit_jump = self.jump_placeholder(Instruction::Jmpf);
                self.block(body)?;
                self.emit(Instruction::Jmp(loop_start));
                let loop_end = self.label();
                self.patch_jump(exit_jump, loop_end);
            }

            Stmt::For {
                var,
                start,
                direction,
                end,
                body,
            } => {
                // The loop variable lives in its own scope around the body.
                self.push_scope();
                self.expression(start)?;
                let slot = self.allocate_local(var);
                self.emit(Instruction::Store(slot));

                let loop_test = self.label();
                self.emit(Instruction::Load(slot));
                self.expression(end)?;
                let (compare, step) = match direction {
                    Direction::Upto => (Instruction::CmpLe, Instruction::Add),
                    Direction::Downto => (Instruction::CmpGe, Instruction::Sub),
                };
                self.emit(compare);
                let exit_jump = self.jump_placeholder(Instruction::Jmpf);

                self.block(body)?;

                self.emit(Instruction::Load(slot));
                self.emit(Instruction::Push(Constant::Int(1)));
                self.emit(step);
                self.emit(Instruction::Store(slot));
                self.emit(Instruction::Jmp(loop_test));
                let loop_end = self.label();
                self.patch_jump(exit_jump, loop_end);
                self.pop_scope();
            }

            Stmt::Return(value) => {
                match value {
                    Some(expr) => self.expression(expr)?,
                    None => self.emit(Instruction::Push(Constant::Nil)),
                }
                self.emit(Instruction::VRet);
            }

            Stmt::Delete(name) => {
                self.emit(Instruction::Load(self.lookup_local(name)?));
                self.emit(Instruction::Free);
            }

            Stmt::Call(call) => {
                // Discard the result of a call used as a statement.
                self.call(call)?;
                self.emit(Instruction::Pop);
            }
        }

        debug_assert_eq!(
            self.current_stack_depth, depth_before,
            "Statement is not stack-neutral: {:?}",
            stmt
        );
        Ok(())
    }

    /// `if`/`elif`/`else`: each condition's false branch falls to the next
    /// condition (or the `else`), each body jumps to a shared end `nop`.
    fn if_chain(
        &mut self,
        branches: &'a [CondBranch<'a>],
        else_body: Option<&'a [Stmt<'a>]>,
    ) -> Result<(), CompileError> {
        let mut end_jumps = Vec::with_capacity(branches.len());
        let mut pending_false_jump: Option<usize> = None;

        for branch in branches {
            if let Some(jump) = pending_false_jump.take() {
                let next_condition = self.label();
                self.patch_jump(jump, next_condition);
            }
            self.expression(branch.cond)?;
            pending_false_jump = Some(self.jump_placeholder(Instruction::Jmpf));
            self.block(branch.body)?;
            end_jumps.push(self.jump_placeholder(Instruction::Jmp));
        }

        if let Some(else_body) = else_body {
            if let Some(jump) = pending_false_jump.take() {
                let else_start = self.label();
                self.patch_jump(jump, else_start);
            }
            self.block(else_body)?;
        }

        let end = self.label();
        self.emit(Instruction::Nop);
        for jump in end_jumps.into_iter().chain(pending_false_jump) {
            self.patch_jump(jump, end);
        }
        Ok(())
    }

    // === Expressions ===

    fn expression(&mut self, expr: &'a Expr<'a>) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(literal) => self.emit(Instruction::Push(constant(literal))),

            Expr::Path(path) => {
                let [base, fields @ ..] = *path else {
                    panic!("Empty variable path");
                };
                self.emit(Instruction::Load(self.lookup_local(base)?));
                for field in fields {
                    self.emit(Instruction::GetFld(field.to_string()));
                }
            }

            Expr::New(type_name) => {
                let decl = self
                    .types
                    .get(type_name)
                    .copied()
                    .ok_or_else(|| CompileError::UndefinedType(type_name.to_string()))?;
                let field_names = decl.fields.iter().map(|f| f.name.to_string()).collect();
                self.emit(Instruction::Alloc(field_names));
                for field in decl.fields {
                    self.emit(Instruction::Dup);
                    self.expression(field.init)?;
                    self.emit(Instruction::SetFld(field.name.to_string()));
                }
            }

            Expr::Call(call) => self.call(call)?,

            Expr::Neg(operand) => {
                self.expression(operand)?;
                self.emit(Instruction::Neg);
            }

            Expr::Not(operand) => {
                self.expression(operand)?;
                self.emit(Instruction::Not);
            }

            Expr::Binary { op, left, right } => {
                self.expression(left)?;
                self.expression(right)?;
                self.emit(binary_instruction(*op));
            }
        }
        Ok(())
    }

    fn call(&mut self, call: &Call<'a>) -> Result<(), CompileError> {
        for arg in call.args {
            self.expression(arg)?;
        }
        match builtin(call.name) {
            Some(instructions) => {
                for instruction in instructions {
                    self.emit(instruction);
                }
            }
            None => {
                let arity = self
                    .arities
                    .get(call.name)
                    .copied()
                    .ok_or_else(|| CompileError::UndefinedFunction(call.name.into()))?;
                self.emit_call(call.name, arity);
            }
        }
        Ok(())
    }
}

/// Instructions a built-in call compiles to, after its arguments are pushed.
fn builtin(name: &str) -> Option<Vec<Instruction>> {
    use Instruction::*;
    Some(match name {
        // `print` is void but every call must produce a value.
        "print" => vec![Write, Push(Constant::Nil)],
        "read" => vec![Read],
        "length" => vec![Len],
        "get" => vec![GetChr],
        "stoi" | "dtoi" => vec![ToInt],
        "stod" | "itod" => vec![ToDbl],
        "itos" | "dtos" => vec![ToStr],
        _ => return None,
    })
}

fn constant(literal: &Literal<'_>) -> Constant {
    match *literal {
        Literal::Int(value) => Constant::Int(value),
        Literal::Double(value) => Constant::Double(value),
        Literal::Bool(value) => Constant::Bool(value),
        Literal::Char(value) => Constant::Char(value),
        Literal::Str(value) => Constant::Str(value.into()),
        Literal::Nil => Constant::Nil,
    }
}

fn binary_instruction(op: BinaryOp) -> Instruction {
    match op {
        BinaryOp::Add => Instruction::Add,
        BinaryOp::Sub => Instruction::Sub,
        BinaryOp::Mul => Instruction::Mul,
        BinaryOp::Div => Instruction::Div,
        BinaryOp::Mod => Instruction::Mod,
        BinaryOp::And => Instruction::And,
        BinaryOp::Or => Instruction::Or,
        BinaryOp::Lt => Instruction::CmpLt,
        BinaryOp::Le => Instruction::CmpLe,
        BinaryOp::Gt => Instruction::CmpGt,
        BinaryOp::Ge => Instruction::CmpGe,
        BinaryOp::Eq => Instruction::CmpEq,
        BinaryOp::Ne => Instruction::CmpNe,
    }
}
