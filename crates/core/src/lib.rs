//! Host runtime for weft: values, namespaces, replaceable functions, an editable instruction
//! representation and the interpreter that runs it.
//!
//! The usual round trip is `decode` (installed code to [`Program`]), edit, then `assemble`
//! ([`Program`] back to [`CodeObject`]) and [`FunctionHandle::install`].

pub mod decoder;
pub mod encoder;
pub mod function;
pub mod instruction;
pub mod namespace;
pub mod opcode;
pub mod program;
pub mod result;
pub mod value;
pub mod vm;

pub use decoder::{decode, parse_assembly};
pub use encoder::assemble;
pub use function::{CodeObject, ConcreteInstruction, Function, FunctionHandle};
pub use instruction::{Arg, Instruction, Item, Label};
pub use namespace::{Namespace, Owner};
pub use opcode::{CompareOp, OperandKind, Opcode};
pub use program::Program;
pub use result::{Error, Result};
pub use value::{MapRef, NativeCallback, NativeFn, Value};

/// Parses and assembles `asm` into a fresh function.
///
/// ```rust,ignore
/// let add = compile("fn add(a, b)\n LOAD_FAST a\n LOAD_FAST b\n BINARY_ADD\n RETURN_VALUE\n")?;
/// assert_eq!(add.call(vec![Value::Int(1), Value::Int(2)])?, Value::Int(3));
/// ```
pub fn compile(asm: &str) -> Result<FunctionHandle> {
    let program = parse_assembly(asm)?;
    Ok(FunctionHandle::new(assemble(&program)?))
}
