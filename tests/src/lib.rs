//! Shared fixtures for the weft integration tests.

use std::rc::Rc;
use weft_core::{FunctionHandle, Namespace, Owner, compile};

/// `f(a) = a + 10`.
pub const ADD_TEN: &str = "
fn f(a)
    LOAD_FAST a
    LOAD_CONST 10
    BINARY_ADD
    RETURN_VALUE
";

/// Returns 1 for truthy input and 0 otherwise, from two separate return points.
pub const TWO_EXITS: &str = "
fn pick(flag)
    LOAD_FAST flag
    POP_JUMP_IF_FALSE @no
    LOAD_CONST 1
    STORE_FAST seen
    LOAD_CONST 1
    RETURN_VALUE
no:
    LOAD_CONST 0
    RETURN_VALUE
";

/// Installs a DEBUG-level log subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
}

/// A fresh module owning one compiled function under `attribute`.
pub fn module_with(
    attribute: &str,
    asm: &str,
) -> weft_core::Result<(Rc<Namespace>, FunctionHandle)> {
    let module = Namespace::new("module");
    let function = compile(asm)?;
    module.set(attribute, function.clone());
    Ok((module, function))
}

/// The module as a patch owner.
pub fn owner(module: &Rc<Namespace>) -> Rc<dyn Owner> {
    module.clone()
}
