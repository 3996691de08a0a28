//! The caller-owned patch registry.

use crate::baseline::{Baseline, BaselineCache};
use crate::config::RewriteConfig;
use crate::engine;
use crate::handler::PatchHandler;
use crate::patch::{Hook, Patch, PatchTarget};
use crate::report::RewriteReport;
use crate::Result;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;
use weft_core::{MapRef, Owner, Program};

/// Name of the handler that receives patches registered without one.
pub const ANONYMOUS: &str = "_anonymous";

pub(crate) type PatchList = Rc<RefCell<Vec<Rc<Patch>>>>;

pub(crate) struct Inner {
    pub(crate) config: RewriteConfig,
    pub(crate) baselines: RefCell<BaselineCache>,
    /// Interned handlers, in creation order.
    pub(crate) handlers: RefCell<IndexMap<String, PatchList>>,
    next_handler: Cell<usize>,
}

/// Per-registration settings.
#[derive(Debug, Clone)]
pub struct PatchOptions {
    /// Patch name; defaults to the hook's type name.
    pub name: Option<String>,
    /// Handler to append to; defaults to the anonymous handler.
    pub handler: Option<String>,
    pub priority: i32,
    pub enabled: bool,
    /// Run the handler's `patch_all` right after registering.
    pub apply: bool,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            name: None,
            handler: None,
            priority: 0,
            enabled: true,
            apply: true,
        }
    }
}

impl PatchOptions {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Registers without re-evaluating the target.
    pub fn deferred(mut self) -> Self {
        self.apply = false;
        self
    }
}

/// Owns the baseline cache, the handler table and the rewrite configuration.
///
/// Cloning a `Registry` yields another handle to the same state.
#[derive(Clone)]
pub struct Registry {
    inner: Rc<Inner>,
}

thread_local! {
    static GLOBAL: Registry = Registry::new();
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RewriteConfig::default())
    }

    pub fn with_config(config: RewriteConfig) -> Self {
        let registry = Self {
            inner: Rc::new(Inner {
                config,
                baselines: RefCell::new(BaselineCache::new()),
                handlers: RefCell::new(IndexMap::new()),
                next_handler: Cell::new(0),
            }),
        };
        registry.handler(Some(ANONYMOUS));
        registry
    }

    /// The shared default registry of the current thread.
    pub fn global() -> Registry {
        GLOBAL.with(Registry::clone)
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.inner.config
    }

    /// Returns the handler interned under `name`, creating it on first request.
    ///
    /// `None` mints a fresh handler with a synthesized unique name.
    pub fn handler(&self, name: Option<&str>) -> PatchHandler {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.unique_handler_name(),
        };
        let list = self
            .inner
            .handlers
            .borrow_mut()
            .entry(name.clone())
            .or_default()
            .clone();
        PatchHandler::new(&name, list, self.inner.clone())
    }

    /// The default handler for patches registered without a handler name.
    pub fn anonymous(&self) -> PatchHandler {
        self.handler(Some(ANONYMOUS))
    }

    /// Names of every live handler, in creation order.
    pub fn handler_names(&self) -> Vec<String> {
        self.inner.handlers.borrow().keys().cloned().collect()
    }

    fn unique_handler_name(&self) -> String {
        let handlers = self.inner.handlers.borrow();
        loop {
            let id = self.inner.next_handler.get();
            self.inner.next_handler.set(id + 1);
            let name = format!("handler_{id}");
            if !handlers.contains_key(&name) {
                return name;
            }
        }
    }

    /// The recorded baseline of `owner.attribute`, if one was captured.
    pub fn baseline(&self, owner: Rc<dyn Owner>, attribute: &str) -> Option<Baseline> {
        let target = PatchTarget::new(owner, attribute);
        self.inner.baselines.borrow().get(&target).cloned()
    }

    /// Re-evaluates a single target from every enabled patch registered for it.
    pub fn refresh(&self, owner: Rc<dyn Owner>, attribute: &str) -> Result<Option<RewriteReport>> {
        engine::rewrite(&self.inner, &PatchTarget::new(owner, attribute))
    }

    /// Appends `patch` to the handler named in `options` and applies it unless deferred.
    pub fn register(&self, patch: Patch, options: &PatchOptions) -> Result<Rc<Patch>> {
        let handler = self.handler(Some(options.handler.as_deref().unwrap_or(ANONYMOUS)));
        debug!(
            "Registering {} {} on {} in {}",
            patch.kind(),
            patch.name(),
            patch.target().label(),
            handler.name()
        );
        let patch = handler.push(patch);
        if options.apply {
            handler.patch_all()?;
        }
        Ok(patch)
    }

    /// Registers a transpiler for `owner.attribute` and returns the hook.
    pub fn transpiler<F>(
        &self,
        owner: Rc<dyn Owner>,
        attribute: &str,
        hook: F,
        options: PatchOptions,
    ) -> Result<Rc<F>>
    where
        F: Fn(Program) -> weft_core::Result<Program> + 'static,
    {
        let hook = Rc::new(hook);
        let patch = self.build::<F>(owner, attribute, Hook::Transpiler(hook.clone()), &options);
        self.register(patch, &options)?;
        Ok(hook)
    }

    /// Registers a prefix for `owner.attribute` and returns the hook.
    pub fn prefix<F>(
        &self,
        owner: Rc<dyn Owner>,
        attribute: &str,
        hook: F,
        options: PatchOptions,
    ) -> Result<Rc<F>>
    where
        F: Fn(&MapRef) -> weft_core::Result<Option<bool>> + 'static,
    {
        let hook = Rc::new(hook);
        let patch = self.build::<F>(owner, attribute, Hook::Prefix(hook.clone()), &options);
        self.register(patch, &options)?;
        Ok(hook)
    }

    /// Registers a postfix for `owner.attribute` and returns the hook.
    pub fn postfix<F>(
        &self,
        owner: Rc<dyn Owner>,
        attribute: &str,
        hook: F,
        options: PatchOptions,
    ) -> Result<Rc<F>>
    where
        F: Fn(&MapRef) -> weft_core::Result<()> + 'static,
    {
        let hook = Rc::new(hook);
        let patch = self.build::<F>(owner, attribute, Hook::Postfix(hook.clone()), &options);
        self.register(patch, &options)?;
        Ok(hook)
    }

    fn build<F>(
        &self,
        owner: Rc<dyn Owner>,
        attribute: &str,
        hook: Hook,
        options: &PatchOptions,
    ) -> Patch {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| std::any::type_name::<F>().to_string());
        Patch::new(PatchTarget::new(owner, attribute), hook)
            .with_name(name)
            .with_priority(options.priority)
            .with_enabled(options.enabled)
    }
}
