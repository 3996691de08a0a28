use color_eyre::Result;
use std::rc::Rc;
use weft_core::{MapRef, Value};
use weft_patch::{
    ANONYMOUS, Error, Hook, HookKind, PatchBuilder, PatchOptions, PatchTarget, PostfixFn,
    Registry,
};
use weft_tests::{ADD_TEN, init_tracing, module_with, owner};

fn plus_one(state: &MapRef) -> weft_core::Result<()> {
    let result = state.require("__result")?.expect_int("plus_one")?;
    state.insert("__result", result + 1);
    Ok(())
}

#[test]
fn handlers_with_one_name_share_patches() -> Result<()> {
    init_tracing();
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;

    registry.postfix(owner(&module), "f", plus_one, PatchOptions::default().handler("audit"))?;
    let again = registry.handler(Some("audit"));
    assert_eq!(again.len(), 1);
    assert_eq!(again.patches()[0].kind(), HookKind::Postfix);

    again.unpatch_all()?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(11));
    Ok(())
}

#[test]
fn destroy_undoes_and_forgets_the_handler() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;
    registry.postfix(owner(&module), "f", plus_one, PatchOptions::default().handler("audit"))?;
    registry.postfix(owner(&module), "f", plus_one, PatchOptions::default())?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(13));

    let reports = registry.handler(Some("audit")).destroy()?;
    assert_eq!(reports[0].postfixes.len(), 1);
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(12));
    assert_eq!(registry.handler_names(), [ANONYMOUS]);
    assert!(registry.handler(Some("audit")).is_empty());
    Ok(())
}

#[test]
fn deferred_and_disabled_registrations() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;

    registry.postfix(owner(&module), "f", plus_one, PatchOptions::default().deferred())?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(11));

    registry.postfix(owner(&module), "f", plus_one, PatchOptions::default().disabled())?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(12));

    let handler = registry.anonymous();
    handler.patches()[1].set_enabled(true);
    handler.patch_all()?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(13));

    handler.clear();
    assert!(handler.is_empty());
    assert!(handler.patch_all()?.is_empty());
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(13));
    registry.refresh(owner(&module), "f")?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(11));
    Ok(())
}

#[test]
fn patch_names_default_to_the_hook_type() -> Result<()> {
    let registry = Registry::new();
    let (module, _f) = module_with("f", ADD_TEN)?;
    registry.postfix(owner(&module), "f", plus_one, PatchOptions::default())?;

    let name = registry.anonymous().patches()[0].name().to_string();
    assert!(name.ends_with("plus_one"), "{name}");
    Ok(())
}

#[test]
fn builder_rejects_anything_but_one_hook() -> Result<()> {
    let registry = Registry::new();
    let (module, f) = module_with("f", ADD_TEN)?;
    let target = PatchTarget::new(owner(&module), "f");

    let err = PatchBuilder::new(target.clone()).build().unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(11));

    let hook: Rc<PostfixFn> = Rc::new(plus_one);
    let patch = PatchBuilder::new(target).postfix(hook).name("built").build()?;
    assert!(matches!(patch.hook(), Hook::Postfix(_)));
    registry.register(patch, &PatchOptions::default())?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(12));
    Ok(())
}

#[test]
fn reports_serialize() -> Result<()> {
    let registry = Registry::new();
    let (module, _f) = module_with("f", ADD_TEN)?;
    registry.postfix(owner(&module), "f", plus_one, PatchOptions::default().name("plus_one"))?;

    let report = registry
        .refresh(owner(&module), "f")?
        .expect("target resolves");
    let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
    assert_eq!(json["target"], "module.f");
    assert_eq!(json["function"], "f");
    assert_eq!(json["postfixes"][0], "plus_one");
    assert_eq!(json["baseline_instructions"], 4);
    Ok(())
}

#[test]
fn the_thread_default_registry_is_shared() -> Result<()> {
    let (module, f) = module_with("f", ADD_TEN)?;
    Registry::global().postfix(
        owner(&module),
        "f",
        plus_one,
        PatchOptions::default().handler("thread_default"),
    )?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(12));

    Registry::global().handler(Some("thread_default")).destroy()?;
    assert_eq!(f.call(vec![Value::Int(1)])?, Value::Int(11));
    Ok(())
}
