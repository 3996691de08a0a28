//! Core results and error types

use thiserror::Error;

/// Core error type encompassing assembly and execution faults.
#[derive(Debug, Error)]
pub enum Error {
    /// Argument count does not match the function's declared parameters.
    #[error("{function}() takes {expected} arguments but {got} were given")]
    ArityMismatch {
        /// Name of the called function.
        function: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },

    /// Attribute lookup on an object failed.
    #[error("object '{object}' has no attribute '{attribute}'")]
    AttributeError {
        /// Name of the object that was searched.
        object: String,
        /// The missing attribute.
        attribute: String,
    },

    /// Nested calls went deeper than the interpreter allows.
    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),

    /// A label was bound more than once in a program.
    #[error("label {0} is bound more than once")]
    DuplicateLabel(String),

    /// An instruction carries an operand its opcode does not accept.
    #[error("invalid operand for {op}: {msg}")]
    InvalidOperand {
        /// Mnemonic of the offending instruction.
        op: String,
        /// What was wrong with the operand.
        msg: String,
    },

    /// A concrete jump points outside the instruction stream.
    #[error("jump target {0} is out of range")]
    InvalidJumpTarget(usize),

    /// Map lookup with a key that is not present.
    #[error("key error: '{0}'")]
    KeyError(String),

    /// The callee is not a function or native callback.
    #[error("'{0}' object is not callable")]
    NotCallable(String),

    /// Failed to parse assembly at the specified line.
    #[error("assembly parse error at line {line}: {msg} ⇒ `{raw}`")]
    ParseError {
        /// The line number where parsing failed.
        line: usize,
        /// Description of the parsing error.
        msg: String,
        /// The raw content that failed to parse.
        raw: String,
    },

    /// A fault raised by native code, including user hooks.
    #[error("{0}")]
    Raised(String),

    /// An instruction needed more operands than the stack held.
    #[error("stack underflow executing {0}")]
    StackUnderflow(String),

    /// An operation was applied to values of the wrong kind.
    #[error("type error: {0}")]
    TypeError(String),

    /// A local slot was read before anything was stored in it.
    #[error("local variable '{0}' referenced before assignment")]
    UnboundLocal(String),

    /// A jump references a label that is never bound.
    #[error("label {0} is referenced but never bound")]
    UndefinedLabel(String),

    /// The mnemonic is not part of the opcode catalogue.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),
}

impl Error {
    /// Convenience constructor for faults raised from native callbacks.
    pub fn raised(msg: impl Into<String>) -> Self {
        Error::Raised(msg.into())
    }
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
