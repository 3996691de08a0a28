//! Module for assembling editable programs into executable code objects.

use crate::function::{CodeObject, ConcreteInstruction};
use crate::instruction::{Arg, Item, Label};
use crate::program::Program;
use crate::result::{Error, Result};
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// Assembles a program into a [`CodeObject`].
///
/// Labels are resolved to absolute instruction offsets, local names to slots (parameters keep
/// the first slots), constants and attribute names to pool indices.
///
/// # Errors
/// * [`Error::DuplicateLabel`] if a label position appears twice.
/// * [`Error::UndefinedLabel`] if a jump names a label that is never placed.
/// * [`Error::InvalidOperand`] if an instruction's operand does not fit its opcode.
///
/// # Examples
/// ```rust,ignore
/// let program = parse_assembly("fn one()\n LOAD_CONST 1\n RETURN_VALUE\n")?;
/// let code = assemble(&program)?;
/// assert_eq!(code.len(), 2);
/// ```
pub fn assemble(program: &Program) -> Result<CodeObject> {
    let offsets = resolve_labels(program)?;

    let varnames = program.varnames();
    let slots: HashMap<Rc<str>, u32> = varnames
        .iter()
        .enumerate()
        .map(|(slot, name)| (name.clone(), slot as u32))
        .collect();

    let mut consts: Vec<Value> = Vec::new();
    let mut names: Vec<Rc<str>> = Vec::new();
    let mut code = Vec::with_capacity(program.instruction_count());

    for ins in program.instructions() {
        if !ins.is_well_formed() {
            tracing::warn!("Rejecting malformed instruction: {}", ins);
            return Err(Error::InvalidOperand {
                op: ins.op.to_string(),
                msg: format!(
                    "expected {:?} operand, got {:?}",
                    ins.op.operand(),
                    ins.arg.kind()
                ),
            });
        }

        let arg = match &ins.arg {
            Arg::None => 0,
            Arg::Count(n) => *n,
            Arg::Const(value) => intern(&mut consts, value),
            Arg::Local(name) => slots[name],
            Arg::Name(name) => intern(&mut names, name),
            Arg::Label(label) => *offsets
                .get(label)
                .ok_or_else(|| Error::UndefinedLabel(label.to_string()))?,
            Arg::Compare(cmp) => cmp.index(),
        };
        code.push(ConcreteInstruction { op: ins.op, arg });
    }

    tracing::debug!(
        "Assembled {}: {} instructions, {} locals, {} constants",
        program.name(),
        code.len(),
        varnames.len(),
        consts.len()
    );

    Ok(CodeObject {
        name: program.name_rc(),
        argnames: program.argnames().to_vec(),
        varnames,
        consts,
        names,
        code,
    })
}

/// Maps each placed label to the offset of the instruction that follows it.
fn resolve_labels(program: &Program) -> Result<HashMap<Label, u32>> {
    let mut offsets = HashMap::new();
    let mut pc: u32 = 0;
    for item in program.items() {
        match item {
            Item::Instr(_) => pc += 1,
            Item::Label(label) => {
                if offsets.insert(*label, pc).is_some() {
                    return Err(Error::DuplicateLabel(label.to_string()));
                }
            }
        }
    }
    Ok(offsets)
}

/// Returns the pool index of `value`, appending it when not already present.
fn intern<T: PartialEq + Clone>(pool: &mut Vec<T>, value: &T) -> u32 {
    let index = pool.iter().position(|known| known == value).unwrap_or_else(|| {
        pool.push(value.clone());
        pool.len() - 1
    });
    index as u32
}
