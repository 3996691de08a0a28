use color_eyre::Result;
use weft_core::{Arg, Error as CoreError, Instruction, MapRef, Opcode, Program, Value};
use weft_patch::{Error, PatchOptions, Registry};
use weft_tests::{ADD_TEN, init_tracing, module_with, owner};

/// Rewrites every `LOAD_CONST from` into `LOAD_CONST to`.
fn swap_const(from: i64, to: i64) -> impl Fn(Program) -> weft_core::Result<Program> {
    move |mut program: Program| {
        for ins in program.instructions_mut() {
            if ins.op == Opcode::LOAD_CONST && ins.arg == Arg::Const(Value::Int(from)) {
                *ins = Instruction::load_const(to);
            }
        }
        Ok(program)
    }
}

#[test]
fn transpiler_replaces_a_constant() -> Result<()> {
    init_tracing();
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;

    registry.transpiler(owner(&module), "f", swap_const(10, 20), PatchOptions::default())?;
    assert_eq!(f.call(vec![Value::Int(100)])?, Value::Int(120));
    Ok(())
}

#[test]
fn transpilers_chain_by_priority() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;

    // 10 -> 20 must run before 20 -> 30 for the chain to reach 30
    registry.transpiler(
        owner(&module),
        "f",
        swap_const(20, 30),
        PatchOptions::default().priority(1),
    )?;
    assert_eq!(f.call(vec![Value::Int(0)])?, Value::Int(10));
    registry.transpiler(
        owner(&module),
        "f",
        swap_const(10, 20),
        PatchOptions::default().priority(2),
    )?;
    assert_eq!(f.call(vec![Value::Int(0)])?, Value::Int(30));
    Ok(())
}

#[test]
fn transpiled_bodies_get_scaffolding_too() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;

    registry.transpiler(owner(&module), "f", swap_const(10, 20), PatchOptions::default())?;
    registry.prefix(
        owner(&module),
        "f",
        |state: &MapRef| {
            state.insert("a", 1);
            Ok(None)
        },
        PatchOptions::default(),
    )?;
    assert_eq!(f.call(vec![Value::Int(100)])?, Value::Int(21));
    Ok(())
}

#[test]
fn transpiler_faults_surface_from_patch_all() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;

    let err = registry
        .transpiler(
            owner(&module),
            "f",
            |_: Program| Err(CoreError::raised("refusing to rewrite")),
            PatchOptions::default().deferred(),
        )
        .map(|_| ())
        .and_then(|()| registry.anonymous().patch_all().map(|_| ()))
        .unwrap_err();
    assert!(matches!(err, Error::Core(CoreError::Raised(ref msg)) if msg == "refusing to rewrite"));
    assert_eq!(f.call(vec![Value::Int(0)])?, Value::Int(10));
    Ok(())
}
