//! Opcode catalogue: mnemonics, operand kinds and parsing.

use crate::result::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of operand an opcode expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand.
    None,
    /// A count (arguments, map entries).
    Count,
    /// A constant value.
    Const,
    /// A local variable name.
    Local,
    /// An attribute name.
    Name,
    /// A jump target.
    Label,
    /// A comparison operator.
    Compare,
}

macro_rules! opcodes {
    ($($variant:ident => $mnemonic:literal, $operand:ident;)*) => {
        /// Instruction mnemonics understood by the assembler and interpreter.
        #[allow(non_camel_case_types, clippy::upper_case_acronyms)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// Every opcode in catalogue order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Canonical mnemonic, e.g. `"LOAD_FAST"`.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }

            /// Operand kind this opcode takes.
            pub fn operand(self) -> OperandKind {
                match self {
                    $(Opcode::$variant => OperandKind::$operand,)*
                }
            }
        }

        impl FromStr for Opcode {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($mnemonic => Ok(Opcode::$variant),)*
                    other => Err(Error::UnknownOpcode(other.to_string())),
                }
            }
        }
    };
}

opcodes! {
    NOP => "NOP", None;
    POP_TOP => "POP_TOP", None;
    DUP_TOP => "DUP_TOP", None;
    ROT_TWO => "ROT_TWO", None;
    LOAD_CONST => "LOAD_CONST", Const;
    LOAD_FAST => "LOAD_FAST", Local;
    STORE_FAST => "STORE_FAST", Local;
    IS_BOUND => "IS_BOUND", Local;
    LOAD_ATTR => "LOAD_ATTR", Name;
    STORE_ATTR => "STORE_ATTR", Name;
    BUILD_MAP => "BUILD_MAP", Count;
    STORE_SUBSCR => "STORE_SUBSCR", None;
    BINARY_SUBSCR => "BINARY_SUBSCR", None;
    BINARY_ADD => "BINARY_ADD", None;
    BINARY_SUBTRACT => "BINARY_SUBTRACT", None;
    BINARY_MULTIPLY => "BINARY_MULTIPLY", None;
    COMPARE_OP => "COMPARE_OP", Compare;
    UNARY_NOT => "UNARY_NOT", None;
    CALL_FUNCTION => "CALL_FUNCTION", Count;
    RETURN_VALUE => "RETURN_VALUE", None;
    JUMP_ABSOLUTE => "JUMP_ABSOLUTE", Label;
    POP_JUMP_IF_TRUE => "POP_JUMP_IF_TRUE", Label;
    POP_JUMP_IF_FALSE => "POP_JUMP_IF_FALSE", Label;
}

impl Opcode {
    /// Returns true if the opcode transfers control to a label.
    #[inline]
    pub fn is_jump(self) -> bool {
        self.operand() == OperandKind::Label
    }

    /// Returns true if the opcode ends execution of the current frame.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Opcode::RETURN_VALUE)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

/// Comparison operators carried by `COMPARE_OP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CompareOp {
    /// Source-level spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Index used in the concrete encoding.
    pub(crate) fn index(self) -> u32 {
        self as u32
    }

    pub(crate) fn from_index(index: u32) -> Option<Self> {
        [
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Gt,
            CompareOp::Ge,
        ]
        .get(index as usize)
        .copied()
    }
}

impl FromStr for CompareOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            other => {
                return Err(Error::InvalidOperand {
                    op: Opcode::COMPARE_OP.to_string(),
                    msg: format!("unknown comparison '{other}'"),
                });
            }
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
