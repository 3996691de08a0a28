use color_eyre::Result;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use weft_core::{Error as CoreError, MapRef, Namespace, NativeFn, Value};
use weft_patch::{Error, PatchOptions, Registry};
use weft_tests::{TWO_EXITS, init_tracing, module_with, owner};

/// `guarded(sentinel)` marks `sentinel.run = True` and returns 7.
const GUARDED: &str = "
fn guarded(sentinel)
    LOAD_CONST True
    LOAD_FAST sentinel
    STORE_ATTR run
    LOAD_CONST 7
    RETURN_VALUE
";

fn run_guarded(verdict: Option<bool>) -> Result<(Value, Option<Value>)> {
    let registry = Registry::new();
    let (module, f) = module_with("guarded", GUARDED)?;
    registry.prefix(
        owner(&module),
        "guarded",
        move |_: &MapRef| Ok(verdict),
        PatchOptions::default(),
    )?;

    let sentinel = Namespace::new("sentinel");
    let result = f.call(vec![Value::Object(sentinel.clone())])?;
    Ok((result, sentinel.get("run")))
}

#[test]
fn prefix_verdicts() -> Result<()> {
    init_tracing();
    assert_eq!(run_guarded(None)?, (Value::Int(7), Some(Value::Bool(true))));
    assert_eq!(run_guarded(Some(true))?, (Value::Int(7), Some(Value::Bool(true))));
    assert_eq!(run_guarded(Some(false))?, (Value::None, None));
    Ok(())
}

#[test]
fn postfix_overrides_every_exit() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("pick", TWO_EXITS)?;
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    registry.postfix(
        owner(&module),
        "pick",
        move |state: &MapRef| {
            counter.set(counter.get() + 1);
            state.insert("__result", 20);
            Ok(())
        },
        PatchOptions::default(),
    )?;

    assert_eq!(f.call(vec![Value::Bool(true)])?, Value::Int(20));
    assert_eq!(f.call(vec![Value::Bool(false)])?, Value::Int(20));
    assert_eq!(calls.get(), 2);
    Ok(())
}

#[test]
fn postfix_sees_parameters_and_bound_locals_only() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("pick", TWO_EXITS)?;
    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::default();
    let log = seen.clone();
    registry.prefix(
        owner(&module),
        "pick",
        |_: &MapRef| Ok(None),
        PatchOptions::default(),
    )?;
    registry.postfix(
        owner(&module),
        "pick",
        move |state: &MapRef| {
            log.borrow_mut()
                .push(state.keys().iter().map(|k| k.to_string()).collect());
            Ok(())
        },
        PatchOptions::default(),
    )?;

    f.call(vec![Value::Bool(true)])?;
    f.call(vec![Value::Bool(false)])?;

    let seen = seen.borrow();
    assert_eq!(seen[0], ["__result", "flag", "seen"]);
    assert_eq!(seen[1], ["__result", "flag"]);
    Ok(())
}

#[test]
fn postfix_runs_after_a_short_circuit() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("pick", TWO_EXITS)?;
    let observed: Rc<RefCell<Option<Value>>> = Rc::default();
    let slot = observed.clone();

    registry.prefix(
        owner(&module),
        "pick",
        |_: &MapRef| Ok(Some(false)),
        PatchOptions::default(),
    )?;
    registry.postfix(
        owner(&module),
        "pick",
        move |state: &MapRef| {
            *slot.borrow_mut() = state.get("__result");
            state.insert("__result", "fallback");
            Ok(())
        },
        PatchOptions::default(),
    )?;

    assert_eq!(f.call(vec![Value::Bool(true)])?, Value::str("fallback"));
    assert_eq!(*observed.borrow(), Some(Value::None));
    Ok(())
}

#[test]
fn hook_errors_surface_from_the_call() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("pick", TWO_EXITS)?;
    registry.postfix(
        owner(&module),
        "pick",
        |_: &MapRef| Err(CoreError::raised("postfix exploded")),
        PatchOptions::default(),
    )?;

    let err = f.call(vec![Value::Bool(true)]).unwrap_err();
    assert!(matches!(err, CoreError::Raised(ref msg) if msg == "postfix exploded"));
    Ok(())
}

#[test]
fn unresolvable_targets_are_silent() -> Result<()> {
    let registry = Registry::new();
    let module = Namespace::new("module");
    module.set("native", NativeFn::new("native", |_| Ok(Value::Int(1))));
    module.set("answer", 42);

    for attribute in ["missing", "native", "answer"] {
        registry.prefix(
            owner(&module),
            attribute,
            |_: &MapRef| Ok(Some(false)),
            PatchOptions::default(),
        )?;
        assert!(registry.baseline(owner(&module), attribute).is_none());
    }
    assert!(registry.anonymous().patch_all()?.is_empty());
    assert_eq!(module.get("answer"), Some(Value::Int(42)));
    Ok(())
}

#[test]
fn transpiler_output_that_fails_to_assemble_is_reported() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("pick", TWO_EXITS)?;
    let pristine = f.code();

    let err = registry
        .transpiler(
            owner(&module),
            "pick",
            |mut program: weft_core::Program| {
                let dangling = program.new_label();
                program.push(weft_core::Instruction::jump(
                    weft_core::Opcode::JUMP_ABSOLUTE,
                    dangling,
                ));
                Ok(program)
            },
            PatchOptions::default(),
        )
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, Error::Core(CoreError::UndefinedLabel(_))));
    assert!(Rc::ptr_eq(&f.code(), &pristine));
    Ok(())
}

/// `gate(flag)` returns 1 when `flag` is truthy, otherwise jumps past its last instruction.
const GATE: &str = "
fn gate(flag)
    LOAD_FAST flag
    POP_JUMP_IF_FALSE @end
    LOAD_CONST 1
    RETURN_VALUE
end:
";

#[test]
fn postfix_observes_jumps_to_a_trailing_label() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("gate", GATE)?;
    let results = Rc::new(RefCell::new(Vec::new()));
    let seen = results.clone();
    registry.postfix(
        owner(&module),
        "gate",
        move |state: &MapRef| {
            seen.borrow_mut().push(state.require("__result")?);
            Ok(())
        },
        PatchOptions::default(),
    )?;

    assert_eq!(f.call(vec![Value::Bool(true)])?, Value::Int(1));
    assert_eq!(f.call(vec![Value::Bool(false)])?, Value::None);
    assert_eq!(*results.borrow(), [Value::Int(1), Value::None]);
    Ok(())
}
