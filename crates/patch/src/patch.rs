//! Patch records and the targets they apply to.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use weft_core::{MapRef, Owner, Program};

/// Rewrites a whole program. Receives the previous stage's program by value.
pub type TranspilerFn = dyn Fn(Program) -> weft_core::Result<Program>;

/// Runs before the body. `Some(false)` skips the body; `None` and `Some(true)` continue.
pub type PrefixFn = dyn Fn(&MapRef) -> weft_core::Result<Option<bool>>;

/// Runs after the body with the parameters, bound locals and the pending result.
pub type PostfixFn = dyn Fn(&MapRef) -> weft_core::Result<()>;

/// An `(owner, attribute)` pair naming a patchable function.
///
/// Owners compare by reference identity, attributes by string value.
#[derive(Clone)]
pub struct PatchTarget {
    owner: Rc<dyn Owner>,
    attribute: Rc<str>,
}

impl PatchTarget {
    pub fn new(owner: Rc<dyn Owner>, attribute: impl AsRef<str>) -> Self {
        Self {
            owner,
            attribute: Rc::from(attribute.as_ref()),
        }
    }

    pub fn owner(&self) -> &Rc<dyn Owner> {
        &self.owner
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// `owner.attribute`, for logs and reports.
    pub fn label(&self) -> String {
        format!("{}.{}", self.owner.label(), self.attribute)
    }

    fn owner_addr(&self) -> *const () {
        Rc::as_ptr(&self.owner) as *const ()
    }
}

impl PartialEq for PatchTarget {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.owner_addr(), other.owner_addr()) && self.attribute == other.attribute
    }
}

impl Eq for PatchTarget {}

impl Hash for PatchTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner_addr().hash(state);
        self.attribute.hash(state);
    }
}

impl fmt::Debug for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatchTarget({})", self.label())
    }
}

/// The single behavior a patch contributes.
#[derive(Clone)]
pub enum Hook {
    Transpiler(Rc<TranspilerFn>),
    Prefix(Rc<PrefixFn>),
    Postfix(Rc<PostfixFn>),
}

impl Hook {
    pub fn kind(&self) -> HookKind {
        match self {
            Hook::Transpiler(_) => HookKind::Transpiler,
            Hook::Prefix(_) => HookKind::Prefix,
            Hook::Postfix(_) => HookKind::Postfix,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook::{:?}", self.kind())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    Transpiler,
    Prefix,
    Postfix,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookKind::Transpiler => "transpiler",
            HookKind::Prefix => "prefix",
            HookKind::Postfix => "postfix",
        })
    }
}

/// One patch rule. Only `enabled` changes after construction.
pub struct Patch {
    target: PatchTarget,
    name: String,
    priority: i32,
    enabled: Cell<bool>,
    hook: Hook,
}

impl Patch {
    /// Creates an enabled patch with priority 0, named after its hook kind.
    pub fn new(target: PatchTarget, hook: Hook) -> Self {
        Self {
            target,
            name: hook.kind().to_string(),
            priority: 0,
            enabled: Cell::new(true),
            hook,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        self.enabled.set(enabled);
        self
    }

    pub fn target(&self) -> &PatchTarget {
        &self.target
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn hook(&self) -> &Hook {
        &self.hook
    }

    pub fn kind(&self) -> HookKind {
        self.hook.kind()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Toggles the patch. Takes effect on the next `patch_all` of any handler touching the target.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Patch")
            .field("target", &self.target)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled.get())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Builder taking each hook kind as an optional field.
///
/// Exactly one hook must be set; [`PatchBuilder::build`] rejects anything else.
pub struct PatchBuilder {
    target: PatchTarget,
    name: Option<String>,
    priority: i32,
    enabled: bool,
    transpiler: Option<Rc<TranspilerFn>>,
    prefix: Option<Rc<PrefixFn>>,
    postfix: Option<Rc<PostfixFn>>,
}

impl PatchBuilder {
    pub fn new(target: PatchTarget) -> Self {
        Self {
            target,
            name: None,
            priority: 0,
            enabled: true,
            transpiler: None,
            prefix: None,
            postfix: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn transpiler(mut self, hook: Rc<TranspilerFn>) -> Self {
        self.transpiler = Some(hook);
        self
    }

    pub fn prefix(mut self, hook: Rc<PrefixFn>) -> Self {
        self.prefix = Some(hook);
        self
    }

    pub fn postfix(mut self, hook: Rc<PostfixFn>) -> Self {
        self.postfix = Some(hook);
        self
    }

    pub fn build(self) -> Result<Patch> {
        let mut hooks: Vec<Hook> = Vec::with_capacity(1);
        hooks.extend(self.transpiler.map(Hook::Transpiler));
        hooks.extend(self.prefix.map(Hook::Prefix));
        hooks.extend(self.postfix.map(Hook::Postfix));

        let Some(hook) = hooks.pop().filter(|_| hooks.is_empty()) else {
            return Err(Error::Configuration(format!(
                "patch for {} needs exactly one hook",
                self.target.label()
            )));
        };

        let mut patch = Patch::new(self.target, hook)
            .with_priority(self.priority)
            .with_enabled(self.enabled);
        if let Some(name) = self.name {
            patch = patch.with_name(name);
        }
        Ok(patch)
    }
}
