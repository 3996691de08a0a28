use color_eyre::Result;
use std::cell::RefCell;
use std::rc::Rc;
use weft_core::{MapRef, Value};
use weft_patch::{PatchOptions, Registry};
use weft_tests::{ADD_TEN, init_tracing, module_with, owner};

type Trace = Rc<RefCell<Vec<&'static str>>>;

fn tagging_postfix(
    registry: &Registry,
    module: &Rc<weft_core::Namespace>,
    trace: &Trace,
    tag: &'static str,
    options: PatchOptions,
) -> Result<()> {
    let trace = trace.clone();
    registry.postfix(
        owner(module),
        "f",
        move |state: &MapRef| {
            trace.borrow_mut().push(tag);
            state.insert("__result", tag);
            Ok(())
        },
        options.name(tag),
    )?;
    Ok(())
}

/// Registers a priority 10 and a priority 0 postfix, in the given order, and reports the
/// call order and the final result.
fn run(order: [(&'static str, i32); 2]) -> Result<(Vec<&'static str>, Value)> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;
    let trace: Trace = Rc::default();
    for (tag, priority) in order {
        tagging_postfix(
            &registry,
            &module,
            &trace,
            tag,
            PatchOptions::default().priority(priority),
        )?;
    }

    trace.borrow_mut().clear();
    let result = f.call(vec![Value::Int(1)])?;
    let calls = trace.borrow().clone();
    Ok((calls, result))
}

#[test]
fn higher_priority_runs_first_and_lowest_writes_last() -> Result<()> {
    init_tracing();
    let expected = (vec!["high", "low"], Value::str("low"));
    assert_eq!(run([("high", 10), ("low", 0)])?, expected);
    assert_eq!(run([("low", 0), ("high", 10)])?, expected);
    Ok(())
}

#[test]
fn equal_priority_keeps_registration_order() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;
    let trace: Trace = Rc::default();
    for tag in ["first", "second", "third"] {
        tagging_postfix(&registry, &module, &trace, tag, PatchOptions::default())?;
    }

    trace.borrow_mut().clear();
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::str("third"));
    assert_eq!(*trace.borrow(), ["first", "second", "third"]);

    let reports = registry.anonymous().patch_all()?;
    assert_eq!(reports[0].postfixes, ["first", "second", "third"]);
    Ok(())
}

#[test]
fn prefixes_follow_the_same_order_and_stop_on_false() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;
    let trace: Trace = Rc::default();

    for (tag, priority, verdict) in [("late", -5, None), ("veto", 0, Some(false)), ("early", 5, None)] {
        let trace = trace.clone();
        registry.prefix(
            owner(&module),
            "f",
            move |_: &MapRef| {
                trace.borrow_mut().push(tag);
                Ok(verdict)
            },
            PatchOptions::default().priority(priority),
        )?;
    }

    assert_eq!(f.call(vec![Value::Int(1)])?, Value::None);
    assert_eq!(*trace.borrow(), ["early", "veto"]);
    Ok(())
}

#[test]
fn patches_from_every_handler_apply() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;
    let trace: Trace = Rc::default();

    tagging_postfix(&registry, &module, &trace, "anon", PatchOptions::default())?;
    tagging_postfix(
        &registry,
        &module,
        &trace,
        "named",
        PatchOptions::default().handler("audit"),
    )?;

    trace.borrow_mut().clear();
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::str("named"));
    assert_eq!(*trace.borrow(), ["anon", "named"]);

    // Re-evaluating through either handler yields the same combined code
    let anon = registry.anonymous().patch_all()?;
    let named = registry.handler(Some("audit")).patch_all()?;
    assert_eq!(anon, named);
    Ok(())
}
