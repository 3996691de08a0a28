//! Postfix scaffolding.
//!
//! Every `RETURN_VALUE` becomes a jump to a single landing block appended at the end. The
//! landing collects parameters, bound locals and the pending result into a map, runs the
//! combined postfix callback and returns whatever the map holds under the result key.

use crate::config::RewriteConfig;
use crate::patch::PostfixFn;
use crate::prefix::{state_arg, store_entry};
use std::rc::Rc;
use tracing::debug;
use weft_core::{Instruction, Item, NativeFn, Opcode, Program, Value};

/// Folds postfix hooks into one callback. Every hook runs, in order.
pub fn combine(hooks: Vec<Rc<PostfixFn>>) -> NativeFn {
    NativeFn::new("postfix", move |args| {
        let state = state_arg(args)?;
        for hook in &hooks {
            hook(&state)?;
        }
        Ok(Value::None)
    })
}

/// Redirects every exit of `program` through the postfix landing.
pub fn scaffold(program: &mut Program, callback: NativeFn, config: &RewriteConfig) {
    let landing = program.new_label();

    let mut exits = 0usize;
    for ins in program.instructions_mut() {
        if ins.op == Opcode::RETURN_VALUE {
            *ins = Instruction::jump(Opcode::JUMP_ABSOLUTE, landing);
            exits += 1;
        }
    }

    // Falling off the end, or jumping to a trailing label, reaches the landing with None
    program.push(Instruction::load_const(Value::None));

    let params = program.argnames().to_vec();
    let locals: Vec<Rc<str>> = program
        .varnames()
        .into_iter()
        .skip(params.len())
        .filter(|local| !config.is_synthesized(local))
        .collect();

    let state = config.postfix_state.as_str();
    let pending = config.pending_result.as_str();
    let key = config.result_key.as_str();

    let mut block: Vec<Item> = vec![
        Item::Label(landing),
        Instruction::store_fast(pending).into(),
        Instruction::build_map(0).into(),
        Instruction::store_fast(state).into(),
    ];
    for param in &params {
        block.extend(store_entry(param, param, state));
    }
    for local in &locals {
        let skip = program.new_label();
        block.push(Instruction::is_bound(local).into());
        block.push(Instruction::jump(Opcode::POP_JUMP_IF_FALSE, skip).into());
        block.extend(store_entry(local, local, state));
        block.push(Item::Label(skip));
    }
    block.extend(store_entry(pending, key, state));
    block.extend([
        Instruction::load_const(callback).into(),
        Instruction::load_fast(state).into(),
        Instruction::call_function(1).into(),
        Instruction::bare(Opcode::POP_TOP).into(),
        Instruction::load_fast(state).into(),
        Instruction::load_const(key).into(),
        Instruction::bare(Opcode::BINARY_SUBSCR).into(),
        Instruction::bare(Opcode::RETURN_VALUE).into(),
    ]);

    debug!(
        "Postfix landing for {}: {} exits redirected, {} locals exposed",
        program.name(),
        exits,
        locals.len()
    );
    program.extend(block);
}
