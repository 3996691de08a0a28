//! Compiled functions.
//!
//! A [`CodeObject`] is the concrete, executable form: slot indices, pooled constants and absolute
//! jump offsets. A [`Function`] owns the code currently installed for it; installing new code
//! swaps the body while the function object itself (and every reference to it) stays the same.

use crate::opcode::Opcode;
use crate::result::Result;
use crate::value::Value;
use crate::vm;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One concrete instruction. `arg` is a pool index, slot, count or absolute offset depending on
/// the opcode's operand kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcreteInstruction {
    pub op: Opcode,
    pub arg: u32,
}

/// Executable form produced by the assembler.
#[derive(Clone, Debug)]
pub struct CodeObject {
    /// Function name.
    pub name: Rc<str>,
    /// Parameter names; parameters occupy the first `argnames.len()` slots.
    pub argnames: Vec<Rc<str>>,
    /// Every local slot name, parameters first.
    pub varnames: Vec<Rc<str>>,
    /// Constant pool.
    pub consts: Vec<Value>,
    /// Attribute name pool.
    pub names: Vec<Rc<str>>,
    /// Instruction stream.
    pub code: Vec<ConcreteInstruction>,
}

impl CodeObject {
    pub fn argcount(&self) -> usize {
        self.argnames.len()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// A function object whose body can be replaced in place.
pub struct Function {
    name: Rc<str>,
    code: RefCell<Rc<CodeObject>>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shared handle to a [`Function`].
#[derive(Clone)]
pub struct FunctionHandle(Rc<Function>);

impl FunctionHandle {
    pub fn new(code: CodeObject) -> Self {
        Self(Rc::new(Function {
            name: code.name.clone(),
            code: RefCell::new(Rc::new(code)),
        }))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// The code currently installed.
    pub fn code(&self) -> Rc<CodeObject> {
        self.0.code.borrow().clone()
    }

    /// Replaces the installed code, returning what was there before.
    ///
    /// Frames already executing keep the code they started with.
    pub fn install(&self, code: Rc<CodeObject>) -> Rc<CodeObject> {
        tracing::debug!(
            "Installing {} instructions into {}",
            code.len(),
            self.name()
        );
        self.0.code.replace(code)
    }

    /// Calls the function with positional arguments.
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        vm::run(self.code(), args)
    }

    pub fn ptr_eq(&self, other: &FunctionHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name())
    }
}
