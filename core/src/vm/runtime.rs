use std::io::{self, BufRead, Write as _};

use tracing::{debug, trace};

use super::{
    Code, ExecutionError, FrameTemplate, Heap, Instruction, ResourceExceededError, RuntimeError,
    RuntimeErrorKind, Stack, Value,
    operators::{self, ArithOp, CmpOp},
};
use crate::api::ExecutionOptions;

/// A live call of a frame template.
struct Frame<'code> {
    template: &'code FrameTemplate,
    pc: usize,
    locals: Vec<Option<Value>>,
    stack: Stack<Value>,
}

impl<'code> Frame<'code> {
    fn new(template: &'code FrameTemplate) -> Self {
        Frame {
            template,
            pc: 0,
            locals: Vec::new(),
            stack: Stack::with_capacity(template.max_stack_size),
        }
    }

    fn pop(&mut self) -> Result<Value, RuntimeErrorKind> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeErrorKind::invalid_operand("operand stack is empty"))
    }

    fn load(&self, slot: usize) -> Result<Value, RuntimeErrorKind> {
        self.locals
            .get(slot)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or_else(|| RuntimeErrorKind::invalid_operand(format!("slot {} is unset", slot)))
    }

    fn store(&mut self, slot: usize, value: Value) {
        if slot >= self.locals.len() {
            self.locals.resize(slot + 1, None);
        }
        self.locals[slot] = Some(value);
    }

    fn binary(
        &mut self,
        op: impl FnOnce(&Value, &Value) -> Result<Value, RuntimeErrorKind>,
    ) -> Result<(), RuntimeErrorKind> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.stack.push(op(&left, &right)?);
        Ok(())
    }

    fn unary(
        &mut self,
        op: impl FnOnce(&Value) -> Result<Value, RuntimeErrorKind>,
    ) -> Result<(), RuntimeErrorKind> {
        let operand = self.pop()?;
        self.stack.push(op(&operand)?);
        Ok(())
    }
}

/// What the run loop does after an instruction.
enum Step<'code> {
    Next,
    Call(Frame<'code>),
    Return(Value),
}

fn io_error(error: io::Error) -> RuntimeErrorKind {
    RuntimeErrorKind::Io {
        message: error.to_string(),
    }
}

fn object_operand(value: Value) -> Result<super::ObjectId, RuntimeErrorKind> {
    match value {
        Value::Ref(id) => Ok(id),
        Value::Nil => Err(RuntimeErrorKind::NilDereference),
        other => Err(RuntimeErrorKind::invalid_operand(format!(
            "expected an object reference, found {}",
            other.type_name()
        ))),
    }
}

/// Stack-based virtual machine executing the frame templates of a [`Code`].
///
/// The VM owns the heap and the call stack of one run. `read` and `write`
/// go through the injected input and output streams.
///
/// # Example
///
/// ```
/// use mypl_core::vm::{Code, Constant, FrameTemplate, Instruction::*, Value, VM};
///
/// let mut code = Code::new();
/// code.add(FrameTemplate::new("main", 0, vec![Push(Constant::Int(6)), Push(Constant::Int(7)), Mul, VRet]));
///
/// let mut output = Vec::new();
/// let mut vm = VM::with_io(&code, std::io::empty(), &mut output);
/// assert_eq!(vm.run().unwrap(), Value::Int(42));
/// ```
pub struct VM<'code> {
    code: &'code Code,
    frames: Vec<Frame<'code>>,
    heap: Heap,
    options: ExecutionOptions,
    input: Box<dyn BufRead + 'code>,
    output: Box<dyn io::Write + 'code>,
}

impl<'code> VM<'code> {
    /// A VM reading from standard input and writing to standard output.
    pub fn new(code: &'code Code) -> Self {
        Self::with_io(code, io::stdin().lock(), io::stdout())
    }

    pub fn with_io(
        code: &'code Code,
        input: impl BufRead + 'code,
        output: impl io::Write + 'code,
    ) -> Self {
        VM {
            code,
            frames: Vec::new(),
            heap: Heap::new(),
            options: ExecutionOptions::default(),
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Run `main` to completion and return the value it returned.
    ///
    /// Every run starts with an empty heap; objects from an earlier run on
    /// the same VM are discarded.
    pub fn run(&mut self) -> Result<Value, ExecutionError> {
        let main = self.code.get("main").ok_or(ExecutionError::MissingMain)?;
        if main.arity != 0 {
            return Err(ExecutionError::MainArity(main.arity));
        }

        debug!(templates = self.code.len(), "Starting run");
        self.heap = Heap::new();
        self.frames.clear();
        self.frames.push(Frame::new(main));
        let result = self.run_loop();
        self.frames.clear();
        result
    }

    fn run_loop(&mut self) -> Result<Value, ExecutionError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(Value::Nil);
            };
            let template = frame.template;
            let pc = frame.pc;

            let step = match template.instructions.get(pc) {
                Some(instruction) => {
                    trace!(
                        function = %template.name,
                        pc,
                        %instruction,
                        depth = frame.stack.len(),
                        "Execute"
                    );
                    frame.pc += 1;
                    self.execute(instruction).map_err(|kind| RuntimeError {
                        kind,
                        function: template.name.clone(),
                        pc,
                        instruction: instruction.to_string(),
                    })?
                }
                // Falling off the end returns nil.
                None => Step::Return(Value::Nil),
            };

            match step {
                Step::Next => {}
                Step::Call(callee) => {
                    let depth = self.frames.len() + 1;
                    if depth > self.options.max_depth {
                        return Err(ResourceExceededError::StackOverflow {
                            depth,
                            max_depth: self.options.max_depth,
                        }
                        .into());
                    }
                    debug!(function = %callee.template.name, depth, "Call");
                    self.frames.push(callee);
                }
                Step::Return(value) => {
                    self.frames.pop();
                    debug!(function = %template.name, %value, "Return");
                    match self.frames.last_mut() {
                        Some(caller) => caller.stack.push(value),
                        None => return Ok(value),
                    }
                }
            }
        }
    }

    fn execute(&mut self, instruction: &'code Instruction) -> Result<Step<'code>, RuntimeErrorKind> {
        let code: &'code Code = self.code;
        let Self {
            frames,
            heap,
            input,
            output,
            ..
        } = self;
        let frame = frames
            .last_mut()
            .ok_or_else(|| RuntimeErrorKind::invalid_operand("no active frame"))?;

        use Instruction::*;
        match instruction {
            Push(constant) => frame.stack.push(constant.into()),
            Pop => {
                frame.pop()?;
            }
            Load(slot) => {
                let value = frame.load(*slot)?;
                frame.stack.push(value);
            }
            Store(slot) => {
                let value = frame.pop()?;
                frame.store(*slot, value);
            }

            Add => frame.binary(|l, r| operators::arithmetic(ArithOp::Add, l, r))?,
            Sub => frame.binary(|l, r| operators::arithmetic(ArithOp::Sub, l, r))?,
            Mul => frame.binary(|l, r| operators::arithmetic(ArithOp::Mul, l, r))?,
            Div => frame.binary(|l, r| operators::arithmetic(ArithOp::Div, l, r))?,
            Mod => frame.binary(|l, r| operators::arithmetic(ArithOp::Mod, l, r))?,
            Neg => frame.unary(operators::negate)?,

            And => frame.binary(|l, r| operators::logical(true, l, r))?,
            Or => frame.binary(|l, r| operators::logical(false, l, r))?,
            Not => frame.unary(operators::not)?,

            CmpLt => frame.binary(|l, r| operators::compare(CmpOp::Lt, l, r))?,
            CmpLe => frame.binary(|l, r| operators::compare(CmpOp::Le, l, r))?,
            CmpGt => frame.binary(|l, r| operators::compare(CmpOp::Gt, l, r))?,
            CmpGe => frame.binary(|l, r| operators::compare(CmpOp::Ge, l, r))?,
            CmpEq => frame.binary(|l, r| Ok(Value::Bool(l == r)))?,
            CmpNe => frame.binary(|l, r| Ok(Value::Bool(l != r)))?,

            Jmp(target) => frame.pc = *target,
            Jmpf(target) => match frame.pop()? {
                Value::Bool(false) => frame.pc = *target,
                Value::Bool(true) => {}
                Value::Nil => return Err(RuntimeErrorKind::NilDereference),
                other => {
                    return Err(RuntimeErrorKind::invalid_operand(format!(
                        "jmpf expects a bool, found {}",
                        other.type_name()
                    )));
                }
            },
            Call(name) => {
                let template = code
                    .get(name)
                    .ok_or_else(|| RuntimeErrorKind::UnknownFunction { name: name.clone() })?;
                let args = frame.stack.take_top(template.arity).ok_or_else(|| {
                    RuntimeErrorKind::invalid_operand(format!(
                        "{} expects {} arguments, found {} on the stack",
                        name,
                        template.arity,
                        frame.stack.len()
                    ))
                })?;
                // The first argument ends up on top of the callee's stack,
                // so the prologue's `store 0` receives it.
                let mut callee = Frame::new(template);
                for arg in args.into_iter().rev() {
                    callee.stack.push(arg);
                }
                return Ok(Step::Call(callee));
            }
            VRet => return Ok(Step::Return(frame.pop()?)),

            Write => {
                let value = frame.pop()?;
                write!(output, "{}", value).map_err(io_error)?;
                output.flush().map_err(io_error)?;
            }
            Read => {
                let mut line = String::new();
                input.read_line(&mut line).map_err(io_error)?;
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                frame.stack.push(Value::str(&line));
            }
            Len => frame.unary(operators::length)?,
            GetChr => {
                let string = frame.pop()?;
                let index = frame.pop()?;
                frame.stack.push(operators::char_at(&string, &index)?);
            }
            ToInt => frame.unary(operators::to_int)?,
            ToDbl => frame.unary(operators::to_double)?,
            ToStr => frame.unary(operators::to_str)?,

            Alloc(fields) => {
                let id = heap.alloc(fields);
                debug!(%id, ?fields, "Allocated object");
                frame.stack.push(Value::Ref(id));
            }
            Free => {
                let id = object_operand(frame.pop()?)?;
                heap.free(id)?;
                debug!(%id, "Freed object");
            }
            GetFld(field) => {
                let id = object_operand(frame.pop()?)?;
                let value = heap.get_field(id, field)?.clone();
                frame.stack.push(value);
            }
            SetFld(field) => {
                let value = frame.pop()?;
                let id = object_operand(frame.pop()?)?;
                heap.set_field(id, field, value)?;
            }

            Dup => {
                if !frame.stack.dup() {
                    return Err(RuntimeErrorKind::invalid_operand("operand stack is empty"));
                }
            }
            Swap => {
                if !frame.stack.swap() {
                    return Err(RuntimeErrorKind::invalid_operand(
                        "swap needs two operands",
                    ));
                }
            }
            Nop => {}
        }
        Ok(Step::Next)
    }
}

#[cfg(test)]
#[path = "runtime_test.rs"]
mod runtime_test;
