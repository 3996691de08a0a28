//! Runtime values.
//!
//! Shared kinds (maps, objects, functions, natives) are reference counted and compare by
//! identity; scalars compare by value.

use crate::function::FunctionHandle;
use crate::namespace::Namespace;
use crate::result::{Error, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A value on the operand stack, in a local slot or in a constant pool.
#[derive(Clone, Default)]
pub enum Value {
    /// The designed absent value.
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Map(MapRef),
    Object(Rc<Namespace>),
    Function(FunctionHandle),
    Native(NativeFn),
}

impl Value {
    /// Builds a string value.
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Native(_) => "native",
        }
    }

    /// Truthiness used by conditional jumps and `UNARY_NOT`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Object(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<Namespace>> {
        match self {
            Value::Object(ns) => Some(ns),
            _ => None,
        }
    }

    /// Integer view that reports a type error naming `context` on mismatch.
    pub fn expect_int(&self, context: &str) -> Result<i64> {
        self.as_int().ok_or_else(|| {
            Error::TypeError(format!("{context} expects int, got {}", self.type_name()))
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(&a.func, &b.func),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<MapRef> for Value {
    fn from(map: MapRef) -> Self {
        Value::Map(map)
    }
}

impl From<FunctionHandle> for Value {
    fn from(function: FunctionHandle) -> Self {
        Value::Function(function)
    }
}

impl From<NativeFn> for Value {
    fn from(native: NativeFn) -> Self {
        Value::Native(native)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Value {
    /// Renders values the way the assembly format spells constants.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{:?}", s.as_ref()),
            Value::Map(m) => write!(f, "<map of {}>", m.len()),
            Value::Object(ns) => write!(f, "<object {}>", ns.name()),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Native(native) => write!(f, "<native {}>", native.name()),
        }
    }
}

/// Shared, mutable string-keyed map.
///
/// Cloning a `MapRef` shares the underlying storage, which is how scaffolding and hooks observe
/// each other's writes.
#[derive(Clone, Default)]
pub struct MapRef(Rc<RefCell<BTreeMap<Rc<str>, Value>>>);

impl MapRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Lookup that fails with `KeyError` when absent.
    pub fn require(&self, key: &str) -> Result<Value> {
        self.get(key).ok_or_else(|| Error::KeyError(key.to_string()))
    }

    /// Inserts `value` under `key`, returning the previous value if any.
    pub fn insert(&self, key: impl AsRef<str>, value: impl Into<Value>) -> Option<Value> {
        self.0
            .borrow_mut()
            .insert(Rc::from(key.as_ref()), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Sorted snapshot of the keys.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.borrow().iter()).finish()
    }
}

/// Signature of a native callback.
pub type NativeCallback = dyn Fn(&[Value]) -> Result<Value>;

/// A callable implemented in Rust.
#[derive(Clone)]
pub struct NativeFn {
    name: Rc<str>,
    func: Rc<NativeCallback>,
}

impl NativeFn {
    pub fn new(name: impl AsRef<str>, func: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
        Self {
            name: Rc::from(name.as_ref()),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the callback. Errors are returned exactly as the callback produced them.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}
