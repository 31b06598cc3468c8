//! Dynamic values crossing the reflective boundary
//!
//! Generated code hands field values, call arguments and results to the
//! registry as [`Value`]. Instances of registered classes travel as
//! [`ObjectRef`] handles.

use parking_lot::RwLock;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use crate::error::{ReflectError, Result};

// --- Data Types ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(ObjectRef),
}

/// Shared handle to a live instance.
///
/// Clones alias the same instance; equality is identity.
#[derive(Clone)]
pub struct ObjectRef {
    cell: Arc<RwLock<dyn Any + Send + Sync>>,
    type_id: TypeId,
    type_name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Shared,
    Exclusive,
}

thread_local! {
    /// Instances this thread is currently inside a `with_ref`/`with_mut` for
    static HELD: RefCell<Vec<(usize, Access)>> = const { RefCell::new(Vec::new()) };
}

/// Marks an instance as held by this thread until dropped
struct Held;

impl Held {
    fn enter(key: usize, access: Access) -> Self {
        HELD.with(|held| held.borrow_mut().push((key, access)));
        Held
    }

    /// An exclusive hold is never stacked with another hold on the same key.
    fn current(key: usize) -> Option<Access> {
        HELD.with(|held| {
            held.borrow()
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, access)| *access)
        })
    }
}

impl Drop for Held {
    fn drop(&mut self) {
        HELD.with(|held| {
            held.borrow_mut().pop();
        });
    }
}

impl ObjectRef {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        let cell: Arc<RwLock<dyn Any + Send + Sync>> = Arc::new(RwLock::new(value));
        Self {
            cell,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Concrete type of the instance behind the handle
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified Rust type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Bare type name, e.g. `TargetClass`
    pub fn class_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Run `f` against the instance. `Ok(None)` if it is not a `T`.
    ///
    /// Nested reads of the same instance on one thread are allowed. Reading
    /// an instance this thread is mutating fails with
    /// [`ReflectError::Reentrant`].
    pub fn with_ref<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<Option<R>> {
        let key = self.key();
        let guard = match Held::current(key) {
            Some(Access::Exclusive) => return Err(self.reentered()),
            Some(Access::Shared) => self.cell.read_recursive(),
            None => self.cell.read(),
        };
        let _held = Held::enter(key, Access::Shared);
        Ok(guard.downcast_ref::<T>().map(f))
    }

    /// Run `f` against the instance mutably. `Ok(None)` if it is not a `T`.
    ///
    /// Fails with [`ReflectError::Reentrant`] if this thread is already
    /// inside `with_ref` or `with_mut` for the same instance.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<Option<R>> {
        let key = self.key();
        if Held::current(key).is_some() {
            return Err(self.reentered());
        }
        let mut guard = self.cell.write();
        let _held = Held::enter(key, Access::Exclusive);
        Ok(guard.downcast_mut::<T>().map(f))
    }

    pub fn downcast_clone<T: Any + Clone>(&self) -> Result<Option<T>> {
        self.with_ref(|value: &T| value.clone())
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.cell) as *const () as usize
    }

    fn reentered(&self) -> ReflectError {
        tracing::debug!(class = self.class_name(), "reentrant instance access");
        ReflectError::Reentrant {
            class: self.class_name().to_string(),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.class_name())
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("class", self.class_name())?;
        map.end()
    }
}

/// `a::b::Name<c::D>` -> `Name`
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// --- Helper Methods ---

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
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
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Name of the value's kind, used in type mismatch reports
    pub fn kind_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Object(obj) => obj.class_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "<{}>", obj.class_name()),
        }
    }
}

// --- From Implementations ---

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(f64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// --- FromValue ---

/// Checked conversion out of a [`Value`].
///
/// This is where a field's or parameter's declared type is enforced.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(ReflectError::type_mismatch("bool", other.kind_name())),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(n) => Ok(n),
            other => Err(ReflectError::type_mismatch("f64", other.kind_name())),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(n) => Ok(n as f32),
            other => Err(ReflectError::type_mismatch("f32", other.kind_name())),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(ReflectError::type_mismatch("str", other.kind_name())),
        }
    }
}

impl FromValue for ObjectRef {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(obj) => Ok(obj),
            other => Err(ReflectError::type_mismatch("object", other.kind_name())),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ReflectError::type_mismatch("list", other.kind_name())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! int_value {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(n: $ty) -> Self {
                Value::Int(i64::from(n))
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Int(n) => <$ty>::try_from(n).map_err(|_| {
                        ReflectError::type_mismatch(stringify!($ty), format!("int {n}"))
                    }),
                    other => Err(ReflectError::type_mismatch(stringify!($ty), other.kind_name())),
                }
            }
        }
    )*};
}

int_value!(i8, i16, i32, i64, u8, u16, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i64,
    }

    #[test]
    fn test_value_serialization() {
        let v = Value::from(vec![Value::Int(1), Value::from("a"), Value::Null]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"[1,"a",null]"#);

        let obj = Value::from(ObjectRef::new(Point { x: 1 }));
        assert_eq!(serde_json::to_string(&obj).unwrap(), r#"{"class":"Point"}"#);
    }

    #[test]
    fn test_int_range_is_checked() {
        assert_eq!(u8::from_value(Value::Int(255)).unwrap(), 255);
        let err = u8::from_value(Value::Int(256)).unwrap_err();
        assert!(matches!(err, ReflectError::TypeMismatch { .. }));
    }

    #[test]
    fn test_kind_mismatch() {
        let err = String::from_value(Value::Int(6)).unwrap_err();
        assert_eq!(format!("{err}"), "Type mismatch: expected str, got int");
    }

    #[test]
    fn test_option_roundtrip_through_null() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Option::<i64>::from_value(Value::Int(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_object_ref_aliases() {
        let a = ObjectRef::new(Point { x: 1 });
        let b = a.clone();
        b.with_mut(|p: &mut Point| p.x = 7).unwrap().unwrap();
        assert_eq!(a.downcast_clone::<Point>().unwrap(), Some(Point { x: 7 }));
        assert_eq!(a, b);
        assert_ne!(a, ObjectRef::new(Point { x: 7 }));
    }

    #[test]
    fn test_with_ref_wrong_type() {
        let obj = ObjectRef::new(Point { x: 1 });
        assert!(obj.with_ref(|_: &String| ()).unwrap().is_none());
        assert!(obj.is::<Point>());
        assert_eq!(obj.class_name(), "Point");
    }

    #[test]
    fn test_nested_reads_of_one_instance() {
        let obj = ObjectRef::new(Point { x: 3 });
        let alias = obj.clone();
        let doubled = obj
            .with_ref(|outer: &Point| {
                let inner = alias.with_ref(|p: &Point| p.x).unwrap().unwrap();
                outer.x + inner
            })
            .unwrap();
        assert_eq!(doubled, Some(6));
    }

    #[test]
    fn test_reentry_under_mutation_is_an_error() {
        let obj = ObjectRef::new(Point { x: 1 });
        let alias = obj.clone();

        let inner = obj
            .with_mut(|_: &mut Point| alias.with_ref(|p: &Point| p.x))
            .unwrap()
            .unwrap();
        assert!(matches!(inner, Err(ReflectError::Reentrant { .. })));

        let inner = obj
            .with_ref(|_: &Point| alias.with_mut(|p: &mut Point| p.x = 2))
            .unwrap()
            .unwrap();
        assert!(matches!(inner, Err(ReflectError::Reentrant { .. })));

        // Released again once the outer access returns
        obj.with_mut(|p: &mut Point| p.x = 5).unwrap().unwrap();
        assert_eq!(obj.downcast_clone::<Point>().unwrap(), Some(Point { x: 5 }));
    }

    #[test]
    fn test_distinct_instances_nest_freely() {
        let a = ObjectRef::new(Point { x: 1 });
        let b = ObjectRef::new(Point { x: 2 });
        let sum = a
            .with_mut(|pa: &mut Point| {
                let x = b.with_mut(|pb: &mut Point| pb.x).unwrap().unwrap();
                pa.x += x;
                pa.x
            })
            .unwrap();
        assert_eq!(sum, Some(3));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("alloc::vec::Vec<i32>"), "Vec");
        assert_eq!(short_type_name("my_crate::fixtures::TargetClass"), "TargetClass");
        assert_eq!(short_type_name("i64"), "i64");
    }

    #[test]
    fn test_display() {
        let v = Value::from(vec!["a", "b"]);
        assert_eq!(v.to_string(), "[a, b]");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
