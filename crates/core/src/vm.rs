//! Stack interpreter for [`CodeObject`]s.
//!
//! Interpreted calls push frames onto an explicit frame stack instead of recursing on the native
//! stack; only native callbacks that call back into the interpreter start a nested run. Errors
//! raised anywhere, including inside native callbacks, unwind straight to the caller unchanged.

use crate::function::CodeObject;
use crate::opcode::{CompareOp, Opcode};
use crate::result::{Error, Result};
use crate::value::{MapRef, Value};
use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

/// Maximum number of live interpreted frames per thread, nested runs included.
pub const MAX_CALL_DEPTH: usize = 256;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Calls any callable value with positional arguments.
pub fn call(callee: &Value, args: Vec<Value>) -> Result<Value> {
    match callee {
        Value::Function(function) => function.call(args),
        Value::Native(native) => native.call(&args),
        other => Err(Error::NotCallable(other.type_name().to_string())),
    }
}

/// Executes `code` with the given arguments bound to its parameters.
pub fn run(code: Rc<CodeObject>, args: Vec<Value>) -> Result<Value> {
    let mut interpreter = Interpreter::default();
    interpreter.push_frame(code, args)?;
    interpreter.execute()
}

/// What a single instruction asks the interpreter to do next.
enum Step {
    Continue,
    Call(Rc<CodeObject>, Vec<Value>),
    Return(Value),
}

#[derive(Default)]
struct Interpreter {
    frames: Vec<Frame>,
}

impl Interpreter {
    fn push_frame(&mut self, code: Rc<CodeObject>, args: Vec<Value>) -> Result<()> {
        if args.len() != code.argcount() {
            return Err(Error::ArityMismatch {
                function: code.name.to_string(),
                expected: code.argcount(),
                got: args.len(),
            });
        }
        DEPTH.with(|depth| {
            if depth.get() >= MAX_CALL_DEPTH {
                return Err(Error::CallDepthExceeded(MAX_CALL_DEPTH));
            }
            depth.set(depth.get() + 1);
            Ok(())
        })?;
        self.frames.push(Frame::new(code, args));
        Ok(())
    }

    fn pop_frame(&mut self) {
        if self.frames.pop().is_some() {
            DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
        }
    }

    fn execute(&mut self) -> Result<Value> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(Value::None);
            };
            match frame.step()? {
                Step::Continue => {}
                Step::Call(code, args) => self.push_frame(code, args)?,
                Step::Return(value) => {
                    self.pop_frame();
                    match self.frames.last_mut() {
                        Some(caller) => caller.stack.push(value),
                        None => return Ok(value),
                    }
                }
            }
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // Frames left behind by an error still count against the thread's depth
        while !self.frames.is_empty() {
            self.pop_frame();
        }
    }
}

struct Frame {
    code: Rc<CodeObject>,
    stack: Vec<Value>,
    locals: Vec<Option<Value>>,
    pc: usize,
}

impl Frame {
    fn new(code: Rc<CodeObject>, args: Vec<Value>) -> Self {
        let mut locals: Vec<Option<Value>> = vec![None; code.varnames.len().max(args.len())];
        for (slot, arg) in args.into_iter().enumerate() {
            locals[slot] = Some(arg);
        }
        Self {
            code,
            stack: Vec::with_capacity(8),
            locals,
            pc: 0,
        }
    }

    fn pop(&mut self, op: Opcode) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| Error::StackUnderflow(op.to_string()))
    }

    fn top(&self, op: Opcode) -> Result<&Value> {
        self.stack
            .last()
            .ok_or_else(|| Error::StackUnderflow(op.to_string()))
    }

    fn jump(&mut self, target: u32) -> Result<()> {
        let target = target as usize;
        if target > self.code.code.len() {
            return Err(Error::InvalidJumpTarget(target));
        }
        self.pc = target;
        Ok(())
    }

    fn constant(&self, op: Opcode, arg: usize) -> Result<Value> {
        pooled(&self.code.consts, op, arg, "constant").cloned()
    }

    fn name(&self, op: Opcode, arg: usize) -> Result<Rc<str>> {
        pooled(&self.code.names, op, arg, "name").cloned()
    }

    fn slot(&mut self, op: Opcode, arg: usize) -> Result<&mut Option<Value>> {
        self.locals.get_mut(arg).ok_or_else(|| Error::InvalidOperand {
            op: op.to_string(),
            msg: format!("local index {arg} out of range"),
        })
    }

    fn load_local(&mut self, op: Opcode, arg: usize) -> Result<Value> {
        if let Some(value) = self.slot(op, arg)? {
            return Ok(value.clone());
        }
        let name = self
            .code
            .varnames
            .get(arg)
            .map_or_else(|| format!("#{arg}"), |name| name.to_string());
        Err(Error::UnboundLocal(name))
    }

    /// Executes one instruction.
    fn step(&mut self) -> Result<Step> {
        let Some(&ins) = self.code.code.get(self.pc) else {
            // Falling off the end returns the absent value
            return Ok(Step::Return(Value::None));
        };
        self.pc += 1;
        let arg = ins.arg as usize;

        match ins.op {
            Opcode::NOP => {}
            Opcode::POP_TOP => {
                self.pop(ins.op)?;
            }
            Opcode::DUP_TOP => {
                let top = self.top(ins.op)?.clone();
                self.stack.push(top);
            }
            Opcode::ROT_TWO => {
                let first = self.pop(ins.op)?;
                let second = self.pop(ins.op)?;
                self.stack.push(first);
                self.stack.push(second);
            }
            Opcode::LOAD_CONST => {
                let value = self.constant(ins.op, arg)?;
                self.stack.push(value);
            }
            Opcode::LOAD_FAST => {
                let value = self.load_local(ins.op, arg)?;
                self.stack.push(value);
            }
            Opcode::STORE_FAST => {
                let value = self.pop(ins.op)?;
                *self.slot(ins.op, arg)? = Some(value);
            }
            Opcode::IS_BOUND => {
                let bound = self.slot(ins.op, arg)?.is_some();
                self.stack.push(Value::Bool(bound));
            }
            Opcode::LOAD_ATTR => {
                let object = self.pop(ins.op)?;
                let name = self.name(ins.op, arg)?;
                let ns = object.as_object().ok_or_else(|| {
                    Error::TypeError(format!(
                        "cannot read attribute '{name}' of {}",
                        object.type_name()
                    ))
                })?;
                let value = ns.get(&name).ok_or_else(|| Error::AttributeError {
                    object: ns.name().to_string(),
                    attribute: name.to_string(),
                })?;
                self.stack.push(value);
            }
            Opcode::STORE_ATTR => {
                // TOS.name = TOS1
                let object = self.pop(ins.op)?;
                let value = self.pop(ins.op)?;
                let name = self.name(ins.op, arg)?;
                let ns = object.as_object().ok_or_else(|| {
                    Error::TypeError(format!(
                        "cannot set attribute '{name}' on {}",
                        object.type_name()
                    ))
                })?;
                ns.set(&name, value);
            }
            Opcode::BUILD_MAP => {
                let map = MapRef::new();
                let mut pairs = Vec::with_capacity(arg);
                for _ in 0..arg {
                    let value = self.pop(ins.op)?;
                    let key = self.pop(ins.op)?;
                    pairs.push((map_key(&key)?, value));
                }
                for (key, value) in pairs.into_iter().rev() {
                    map.insert(key, value);
                }
                self.stack.push(Value::Map(map));
            }
            Opcode::STORE_SUBSCR => {
                // TOS1[TOS] = TOS2
                let key = self.pop(ins.op)?;
                let container = self.pop(ins.op)?;
                let value = self.pop(ins.op)?;
                as_map(&container)?.insert(map_key(&key)?, value);
            }
            Opcode::BINARY_SUBSCR => {
                let key = self.pop(ins.op)?;
                let container = self.pop(ins.op)?;
                let value = as_map(&container)?.require(&map_key(&key)?)?;
                self.stack.push(value);
            }
            Opcode::BINARY_ADD | Opcode::BINARY_SUBTRACT | Opcode::BINARY_MULTIPLY => {
                let rhs = self.pop(ins.op)?;
                let lhs = self.pop(ins.op)?;
                self.stack.push(binary(ins.op, &lhs, &rhs)?);
            }
            Opcode::COMPARE_OP => {
                let rhs = self.pop(ins.op)?;
                let lhs = self.pop(ins.op)?;
                let cmp = CompareOp::from_index(ins.arg).ok_or_else(|| Error::InvalidOperand {
                    op: ins.op.to_string(),
                    msg: format!("comparison index {arg}"),
                })?;
                self.stack.push(Value::Bool(compare(cmp, &lhs, &rhs)?));
            }
            Opcode::UNARY_NOT => {
                let value = self.pop(ins.op)?;
                self.stack.push(Value::Bool(!value.is_truthy()));
            }
            Opcode::CALL_FUNCTION => {
                if self.stack.len() < arg + 1 {
                    return Err(Error::StackUnderflow(ins.op.to_string()));
                }
                let args = self.stack.split_off(self.stack.len() - arg);
                let callee = self.pop(ins.op)?;
                if let Value::Function(function) = &callee {
                    return Ok(Step::Call(function.code(), args));
                }
                let result = call(&callee, args)?;
                self.stack.push(result);
            }
            Opcode::RETURN_VALUE => return Ok(Step::Return(self.pop(ins.op)?)),
            Opcode::JUMP_ABSOLUTE => self.jump(ins.arg)?,
            Opcode::POP_JUMP_IF_TRUE => {
                if self.pop(ins.op)?.is_truthy() {
                    self.jump(ins.arg)?;
                }
            }
            Opcode::POP_JUMP_IF_FALSE => {
                if !self.pop(ins.op)?.is_truthy() {
                    self.jump(ins.arg)?;
                }
            }
        }
        Ok(Step::Continue)
    }
}

fn pooled<'a, T>(pool: &'a [T], op: Opcode, arg: usize, what: &str) -> Result<&'a T> {
    pool.get(arg).ok_or_else(|| Error::InvalidOperand {
        op: op.to_string(),
        msg: format!("{what} index {arg} out of range"),
    })
}

fn map_key(key: &Value) -> Result<String> {
    key.as_str().map(str::to_string).ok_or_else(|| {
        Error::TypeError(format!("map keys must be str, got {}", key.type_name()))
    })
}

fn as_map(value: &Value) -> Result<&MapRef> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(Error::TypeError(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn binary(op: Opcode, lhs: &Value, rhs: &Value) -> Result<Value> {
    let overflow = || Error::TypeError(format!("integer overflow in {op}"));
    match (op, lhs, rhs) {
        (Opcode::BINARY_ADD, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (_, Value::Int(a), Value::Int(b)) => {
            let result = match op {
                Opcode::BINARY_ADD => a.checked_add(*b),
                Opcode::BINARY_SUBTRACT => a.checked_sub(*b),
                _ => a.checked_mul(*b),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        _ => Err(Error::TypeError(format!(
            "unsupported operand types for {op}: {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn compare(cmp: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool> {
    match cmp {
        CompareOp::Eq => return Ok(lhs == rhs),
        CompareOp::Ne => return Ok(lhs != rhs),
        _ => {}
    }
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => {
            return Err(Error::TypeError(format!(
                "'{}' not supported between {} and {}",
                cmp,
                lhs.type_name(),
                rhs.type_name()
            )));
        }
    };
    Ok(match cmp {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}
