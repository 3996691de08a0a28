//! Editable instructions: symbolic operands and opaque label tokens.

use crate::opcode::{CompareOp, OperandKind, Opcode};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Opaque jump-target token. Only the assembler turns labels into offsets.
///
/// Labels are minted by [`Program::new_label`](crate::Program::new_label) so they stay unique
/// within their program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub(crate) u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Symbolic operand of an [`Instruction`].
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    None,
    Count(u32),
    Const(Value),
    Local(Rc<str>),
    Name(Rc<str>),
    Label(Label),
    Compare(CompareOp),
}

impl Arg {
    /// Operand kind this argument satisfies.
    pub fn kind(&self) -> OperandKind {
        match self {
            Arg::None => OperandKind::None,
            Arg::Count(_) => OperandKind::Count,
            Arg::Const(_) => OperandKind::Const,
            Arg::Local(_) => OperandKind::Local,
            Arg::Name(_) => OperandKind::Name,
            Arg::Label(_) => OperandKind::Label,
            Arg::Compare(_) => OperandKind::Compare,
        }
    }
}

/// One editable instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub op: Opcode,
    pub arg: Arg,
}

impl Instruction {
    /// Builds an instruction without checking the operand; the assembler validates.
    pub fn new(op: Opcode, arg: Arg) -> Self {
        Self { op, arg }
    }

    /// Instruction with no operand.
    pub fn bare(op: Opcode) -> Self {
        Self::new(op, Arg::None)
    }

    pub fn load_const(value: impl Into<Value>) -> Self {
        Self::new(Opcode::LOAD_CONST, Arg::Const(value.into()))
    }

    pub fn load_fast(local: impl AsRef<str>) -> Self {
        Self::new(Opcode::LOAD_FAST, Arg::Local(Rc::from(local.as_ref())))
    }

    pub fn store_fast(local: impl AsRef<str>) -> Self {
        Self::new(Opcode::STORE_FAST, Arg::Local(Rc::from(local.as_ref())))
    }

    pub fn is_bound(local: impl AsRef<str>) -> Self {
        Self::new(Opcode::IS_BOUND, Arg::Local(Rc::from(local.as_ref())))
    }

    pub fn load_attr(name: impl AsRef<str>) -> Self {
        Self::new(Opcode::LOAD_ATTR, Arg::Name(Rc::from(name.as_ref())))
    }

    pub fn store_attr(name: impl AsRef<str>) -> Self {
        Self::new(Opcode::STORE_ATTR, Arg::Name(Rc::from(name.as_ref())))
    }

    pub fn build_map(entries: u32) -> Self {
        Self::new(Opcode::BUILD_MAP, Arg::Count(entries))
    }

    pub fn call_function(argc: u32) -> Self {
        Self::new(Opcode::CALL_FUNCTION, Arg::Count(argc))
    }

    pub fn compare(op: CompareOp) -> Self {
        Self::new(Opcode::COMPARE_OP, Arg::Compare(op))
    }

    /// Jump of kind `op` to `target`.
    pub fn jump(op: Opcode, target: Label) -> Self {
        Self::new(op, Arg::Label(target))
    }

    /// True when the operand matches what the opcode expects.
    pub fn is_well_formed(&self) -> bool {
        self.op.operand() == self.arg.kind()
    }

    /// Jump target, if this is a jump.
    pub fn target(&self) -> Option<Label> {
        match self.arg {
            Arg::Label(label) => Some(label),
            _ => None,
        }
    }

    /// Local name referenced by this instruction, if any.
    pub fn local(&self) -> Option<&Rc<str>> {
        match &self.arg {
            Arg::Local(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Arg::None => write!(f, "{}", self.op),
            Arg::Count(n) => write!(f, "{:<18} {}", self.op, n),
            Arg::Const(value) => write!(f, "{:<18} {}", self.op, value),
            Arg::Local(name) | Arg::Name(name) => write!(f, "{:<18} {}", self.op, name),
            Arg::Label(label) => write!(f, "{:<18} @{}", self.op, label),
            Arg::Compare(cmp) => write!(f, "{:<18} {}", self.op, cmp),
        }
    }
}

/// Element of a program: an instruction or the position a label names.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Instr(Instruction),
    Label(Label),
}

impl Item {
    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Item::Instr(ins) => Some(ins),
            Item::Label(_) => None,
        }
    }

    pub fn as_instruction_mut(&mut self) -> Option<&mut Instruction> {
        match self {
            Item::Instr(ins) => Some(ins),
            Item::Label(_) => None,
        }
    }

    /// True for an instruction with opcode `op`.
    pub fn is_op(&self, op: Opcode) -> bool {
        self.as_instruction().is_some_and(|ins| ins.op == op)
    }
}

impl From<Instruction> for Item {
    fn from(ins: Instruction) -> Self {
        Item::Instr(ins)
    }
}

impl From<Label> for Item {
    fn from(label: Label) -> Self {
        Item::Label(label)
    }
}
