use color_eyre::Result;
use std::rc::Rc;
use weft_core::{Error, NativeFn, Value, compile, vm};
use weft_tests::{ADD_TEN, init_tracing, module_with};

#[test]
fn install_swaps_the_body_in_place() -> Result<()> {
    init_tracing();
    let (module, f) = module_with("f", ADD_TEN)?;
    let doubled = compile("fn f(a)\n LOAD_FAST a\n LOAD_CONST 2\n BINARY_MULTIPLY\n RETURN_VALUE\n")?;

    let previous = f.install(doubled.code());
    assert_eq!(f.call(vec![Value::Int(21)])?, Value::Int(42));

    // The owner still holds the very same function object
    let Some(Value::Function(bound)) = module.get("f") else {
        panic!("attribute vanished");
    };
    assert!(bound.ptr_eq(&f));

    f.install(previous);
    assert_eq!(f.call(vec![Value::Int(21)])?, Value::Int(31));
    Ok(())
}

#[test]
fn running_frames_keep_their_code() -> Result<()> {
    let (_module, f) = module_with(
        "f",
        "fn f(swap)\n LOAD_FAST swap\n CALL_FUNCTION 0\n POP_TOP\n LOAD_CONST 1\n RETURN_VALUE\n",
    )?;
    let replacement = compile("fn f(swap)\n LOAD_CONST 2\n RETURN_VALUE\n")?.code();

    let target = f.clone();
    let swap = NativeFn::new("swap", move |_| {
        target.install(Rc::clone(&replacement));
        Ok(Value::None)
    });

    assert_eq!(f.call(vec![Value::Native(swap.clone())])?, Value::Int(1));
    assert_eq!(f.call(vec![Value::Native(swap)])?, Value::Int(2));
    Ok(())
}

#[test]
fn strings_concatenate_and_compare() -> Result<()> {
    let f = compile(
        "fn greet(name)
            LOAD_CONST \"hello \"
            LOAD_FAST name
            BINARY_ADD
            RETURN_VALUE",
    )?;
    assert_eq!(f.call(vec![Value::str("weft")])?, Value::str("hello weft"));

    let lt = compile("fn lt(a, b)\n LOAD_FAST a\n LOAD_FAST b\n COMPARE_OP <\n RETURN_VALUE\n")?;
    assert_eq!(lt.call(vec![Value::str("a"), Value::str("b")])?, Value::Bool(true));
    assert_eq!(lt.call(vec![Value::Int(3), Value::Int(2)])?, Value::Bool(false));
    assert!(matches!(
        lt.call(vec![Value::Int(3), Value::str("x")]),
        Err(Error::TypeError(_))
    ));
    Ok(())
}

#[test]
fn calling_non_callables_fails() {
    assert!(matches!(
        vm::call(&Value::str("f"), vec![]),
        Err(Error::NotCallable(ref kind)) if kind == "str"
    ));
}

#[test]
fn overflow_is_a_type_error() -> Result<()> {
    let f = compile(ADD_TEN)?;
    assert!(matches!(
        f.call(vec![Value::Int(i64::MAX)]),
        Err(Error::TypeError(_))
    ));
    Ok(())
}
