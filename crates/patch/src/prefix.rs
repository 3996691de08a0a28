//! Prefix scaffolding.
//!
//! Prepends a block that captures the parameters into a map, hands the map to the combined
//! prefix callback and either returns `None` or re-binds the parameters and falls into the body.

use crate::config::RewriteConfig;
use crate::patch::PrefixFn;
use std::rc::Rc;
use tracing::debug;
use weft_core::{Instruction, Item, MapRef, NativeFn, Opcode, Program, Value};

/// Folds prefix hooks into one callback taking the state map.
///
/// Hooks run in order; the first `Some(false)` stops the chain and makes the callback return
/// `False`.
pub fn combine(hooks: Vec<Rc<PrefixFn>>) -> NativeFn {
    NativeFn::new("prefix", move |args| {
        let state = state_arg(args)?;
        for hook in &hooks {
            if hook(&state)? == Some(false) {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    })
}

pub(crate) fn state_arg(args: &[Value]) -> weft_core::Result<MapRef> {
    match args {
        [Value::Map(state)] => Ok(state.clone()),
        _ => Err(weft_core::Error::TypeError(
            "hook callbacks take a single map argument".into(),
        )),
    }
}

/// Inserts the prefix block at the start of `program`.
pub fn scaffold(program: &mut Program, callback: NativeFn, config: &RewriteConfig) {
    let state = config.prefix_state.as_str();
    let params = program.argnames().to_vec();
    let proceed = program.new_label();

    let mut block: Vec<Item> = vec![
        Instruction::build_map(0).into(),
        Instruction::store_fast(state).into(),
    ];
    for param in &params {
        block.extend(store_entry(param, param, state));
    }
    block.extend([
        Instruction::load_const(callback).into(),
        Instruction::load_fast(state).into(),
        Instruction::call_function(1).into(),
        Instruction::jump(Opcode::POP_JUMP_IF_TRUE, proceed).into(),
        Instruction::load_const(Value::None).into(),
        Instruction::bare(Opcode::RETURN_VALUE).into(),
        Item::Label(proceed),
    ]);
    for param in &params {
        block.extend([
            Instruction::load_fast(state).into(),
            Instruction::load_const(param.as_ref()).into(),
            Instruction::bare(Opcode::BINARY_SUBSCR).into(),
            Instruction::store_fast(param).into(),
        ]);
    }

    debug!(
        "Prefix block for {}: {} items, {} parameters",
        program.name(),
        block.len(),
        params.len()
    );
    program.prepend(block);
}

/// `map[key] = local`, with the map held in `state`.
pub(crate) fn store_entry(local: &str, key: &str, state: &str) -> [Item; 4] {
    [
        Instruction::load_fast(local).into(),
        Instruction::load_fast(state).into(),
        Instruction::load_const(key).into(),
        Instruction::bare(Opcode::STORE_SUBSCR).into(),
    ]
}
