//! Attribute-bearing namespaces: modules, plain objects, anything that owns functions by name.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Capability to look up a named attribute.
///
/// Patch targets are `(owner, attribute)` pairs; the engine only ever reads through this trait,
/// so hosts can expose whatever object model they have.
pub trait Owner {
    /// Human readable name used in logs and reports.
    fn label(&self) -> String;

    /// Current value bound to `attribute`, if any.
    fn lookup(&self, attribute: &str) -> Option<Value>;
}

/// A named bag of attributes.
pub struct Namespace {
    name: Rc<str>,
    attrs: RefCell<BTreeMap<Rc<str>, Value>>,
}

impl Namespace {
    pub fn new(name: impl AsRef<str>) -> Rc<Self> {
        Rc::new(Self {
            name: Rc::from(name.as_ref()),
            attrs: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, attribute: &str) -> Option<Value> {
        self.attrs.borrow().get(attribute).cloned()
    }

    /// Binds `attribute`, returning the value it replaced.
    pub fn set(&self, attribute: impl AsRef<str>, value: impl Into<Value>) -> Option<Value> {
        self.attrs
            .borrow_mut()
            .insert(Rc::from(attribute.as_ref()), value.into())
    }

    pub fn remove(&self, attribute: &str) -> Option<Value> {
        self.attrs.borrow_mut().remove(attribute)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attrs.borrow().contains_key(attribute)
    }
}

impl Owner for Namespace {
    fn label(&self) -> String {
        self.name.to_string()
    }

    fn lookup(&self, attribute: &str) -> Option<Value> {
        self.get(attribute)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("attrs", &self.attrs.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
