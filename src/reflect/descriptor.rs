//! Class, field and method descriptors
//!
//! Specs are what generated code hands to the registry; descriptors are what
//! it gets back. A descriptor carries a resolver closure instead of runtime
//! metadata, so a dynamic get/set/call is one downcast plus one conversion.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::callable::{InstanceFn, SharedFn};
use super::{normalize_name, TypeHandle};
use crate::error::{ReflectError, Result};
use crate::value::{FromValue, ObjectRef, Value};

// Instance resolvers yield `Ok(None)` when the receiver is not of the owner type.
type InstanceGetter = Box<dyn Fn(&ObjectRef) -> Result<Option<Value>> + Send + Sync>;
type InstanceSetter = Box<dyn Fn(&ObjectRef, Value) -> Result<Option<()>> + Send + Sync>;
type SharedGetter = Box<dyn Fn() -> Value + Send + Sync>;
type SharedSetter = Box<dyn Fn(Value) -> Result<()> + Send + Sync>;
type InstanceCall = Box<dyn Fn(&str, &ObjectRef, &[Value]) -> Result<Option<Value>> + Send + Sync>;
type SharedCall = Box<dyn Fn(&str, &[Value]) -> Result<Value> + Send + Sync>;

enum FieldBinding {
    Instance {
        owner: TypeHandle,
        get: InstanceGetter,
        set: InstanceSetter,
    },
    Shared {
        get: SharedGetter,
        set: SharedSetter,
    },
}

enum MethodBinding {
    Instance { owner: TypeHandle, call: InstanceCall },
    Shared { call: SharedCall },
}

// --- Specs ---

/// Registration input for one field
pub struct FieldSpec {
    name: String,
    value_type: &'static str,
    binding: FieldBinding,
}

impl FieldSpec {
    /// Instance field, addressed through a projection into `T`.
    pub fn instance<T, V>(
        name: impl Into<String>,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self
    where
        T: Any + Send + Sync,
        V: Clone + Into<Value> + FromValue + 'static,
    {
        Self {
            name: name.into(),
            value_type: std::any::type_name::<V>(),
            binding: FieldBinding::Instance {
                owner: TypeHandle::of::<T>(),
                get: Box::new(move |obj: &ObjectRef| {
                    obj.with_ref(|target: &T| -> Value { get(target).clone().into() })
                }),
                set: Box::new(move |obj: &ObjectRef, value: Value| -> Result<Option<()>> {
                    let value = V::from_value(value)?;
                    obj.with_mut(|target: &mut T| *get_mut(target) = value)
                }),
            },
        }
    }

    /// Static field bound to its single shared storage location.
    pub fn shared<V>(name: impl Into<String>, cell: &'static RwLock<V>) -> Self
    where
        V: Clone + Into<Value> + FromValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            value_type: std::any::type_name::<V>(),
            binding: FieldBinding::Shared {
                get: Box::new(move || -> Value {
                    let guard = cell.read().unwrap_or_else(PoisonError::into_inner);
                    V::clone(&guard).into()
                }),
                set: Box::new(move |value: Value| -> Result<()> {
                    let value = V::from_value(value)?;
                    *cell.write().unwrap_or_else(PoisonError::into_inner) = value;
                    Ok(())
                }),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        matches!(self.binding, FieldBinding::Shared { .. })
    }

    pub(crate) fn bind(self, class: &TypeHandle) -> FieldDescriptor {
        if let FieldBinding::Instance { owner, .. } = &self.binding {
            assert_owner(owner, class, &self.name);
        }
        FieldDescriptor {
            name: self.name,
            class: class.name().to_string(),
            value_type: self.value_type,
            binding: self.binding,
        }
    }
}

/// Registration input for one method
pub struct MethodSpec {
    name: String,
    arity: Option<usize>,
    binding: MethodBinding,
}

impl MethodSpec {
    /// Instance method; `f` takes the receiver (`&T` or `&mut T`) first.
    pub fn instance<T, M, F>(name: impl Into<String>, f: F) -> Self
    where
        T: Any + Send + Sync,
        M: 'static,
        F: InstanceFn<T, M>,
    {
        Self {
            name: name.into(),
            arity: Some(F::ARITY),
            binding: MethodBinding::Instance {
                owner: TypeHandle::of::<T>(),
                call: Box::new(move |method: &str, obj: &ObjectRef, args: &[Value]| {
                    <F as InstanceFn<T, M>>::invoke(&f, method, obj, args)
                }),
            },
        }
    }

    /// Instance method over raw arguments. Arity is not known up front.
    pub fn instance_raw<T, F>(name: impl Into<String>, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut T, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity: None,
            binding: MethodBinding::Instance {
                owner: TypeHandle::of::<T>(),
                call: Box::new(move |_: &str, obj: &ObjectRef, args: &[Value]| -> Result<Option<Value>> {
                    obj.with_mut(|target: &mut T| f(target, args))?.transpose()
                }),
            },
        }
    }

    /// Static method.
    pub fn shared<Args, F>(name: impl Into<String>, f: F) -> Self
    where
        Args: 'static,
        F: SharedFn<Args>,
    {
        Self {
            name: name.into(),
            arity: Some(F::ARITY),
            binding: MethodBinding::Shared {
                call: Box::new(move |method: &str, args: &[Value]| {
                    <F as SharedFn<Args>>::invoke(&f, method, args)
                }),
            },
        }
    }

    /// Static method over raw arguments.
    pub fn shared_raw<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity: None,
            binding: MethodBinding::Shared {
                call: Box::new(move |_: &str, args: &[Value]| f(args)),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        matches!(self.binding, MethodBinding::Shared { .. })
    }

    pub(crate) fn bind(self, class: &TypeHandle) -> MethodDescriptor {
        if let MethodBinding::Instance { owner, .. } = &self.binding {
            assert_owner(owner, class, &self.name);
        }
        MethodDescriptor {
            qualified: format!("{}::{}", class.name(), self.name),
            name: self.name,
            class: class.name().to_string(),
            arity: self.arity,
            binding: self.binding,
        }
    }
}

/// An instance member bound to another type can never resolve; registering
/// it is a programming error.
fn assert_owner(owner: &TypeHandle, class: &TypeHandle, member: &str) {
    assert!(
        owner.type_id() == class.type_id(),
        "member '{}' is declared on {}, not on {}",
        member,
        owner.name(),
        class.name()
    );
}

// --- Descriptors ---

pub struct ClassDescriptor {
    handle: TypeHandle,
    fields: HashMap<String, FieldDescriptor>,
    methods: HashMap<String, MethodDescriptor>,
}

impl ClassDescriptor {
    pub(crate) fn new(handle: TypeHandle, fields: Vec<FieldSpec>, methods: Vec<MethodSpec>) -> Self {
        let fields = fields
            .into_iter()
            .map(|spec| (normalize_name(spec.name()), spec.bind(&handle)))
            .collect();
        let methods = methods
            .into_iter()
            .map(|spec| (normalize_name(spec.name()), spec.bind(&handle)))
            .collect();
        Self {
            handle,
            fields,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn handle(&self) -> &TypeHandle {
        &self.handle
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        let field = self.fields.get(&normalize_name(name));
        if field.is_none() {
            tracing::trace!(class = self.name(), field = name, "field lookup miss");
        }
        field
    }

    pub fn get_method(&self, name: &str) -> Option<&MethodDescriptor> {
        let method = self.methods.get(&normalize_name(name));
        if method.is_none() {
            tracing::trace!(class = self.name(), method = name, "method lookup miss");
        }
        method
    }

    /// All fields, ordered by name
    pub fn fields(&self) -> Vec<&FieldDescriptor> {
        let mut fields: Vec<_> = self.fields.values().collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        fields
    }

    /// All methods, ordered by name
    pub fn methods(&self) -> Vec<&MethodDescriptor> {
        let mut methods: Vec<_> = self.methods.values().collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }
}

impl std::fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name())
            .field("fields", &self.fields())
            .field("methods", &self.methods())
            .finish()
    }
}

pub struct FieldDescriptor {
    name: String,
    class: String,
    value_type: &'static str,
    binding: FieldBinding,
}

impl FieldDescriptor {
    /// Name as registered
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        matches!(self.binding, FieldBinding::Shared { .. })
    }

    /// Declared Rust type of the field's value
    pub fn type_name(&self) -> &'static str {
        self.value_type
    }

    /// Read the field. `obj` is ignored for static fields.
    pub fn get_value(&self, obj: Option<&ObjectRef>) -> Result<Value> {
        match &self.binding {
            FieldBinding::Shared { get, .. } => Ok(get()),
            FieldBinding::Instance { owner, get, .. } => {
                let obj = receiver(&self.class, &self.name, owner, obj)?;
                get(obj)?.ok_or_else(|| wrong_receiver(&self.class, &self.name, owner, obj))
            }
        }
    }

    /// Write the field. The value must convert to the declared type.
    pub fn set_value(&self, obj: Option<&ObjectRef>, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match &self.binding {
            FieldBinding::Shared { set, .. } => set(value),
            FieldBinding::Instance { owner, set, .. } => {
                let obj = receiver(&self.class, &self.name, owner, obj)?;
                set(obj, value)?.ok_or_else(|| wrong_receiver(&self.class, &self.name, owner, obj))
            }
        }
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("is_static", &self.is_static())
            .field("type", &self.value_type)
            .finish()
    }
}

pub struct MethodDescriptor {
    name: String,
    class: String,
    qualified: String,
    arity: Option<usize>,
    binding: MethodBinding,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        matches!(self.binding, MethodBinding::Shared { .. })
    }

    /// Parameter count, excluding the receiver. `None` for raw callables.
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Invoke the method. Static methods ignore `obj`.
    ///
    /// Arguments are checked against the signature here, at call time.
    pub fn call(&self, obj: Option<&ObjectRef>, args: &[Value]) -> Result<Value> {
        match &self.binding {
            MethodBinding::Shared { call } => call(&self.qualified, args),
            MethodBinding::Instance { owner, call } => {
                let obj = receiver(&self.class, &self.name, owner, obj)?;
                call(&self.qualified, obj, args)?
                    .ok_or_else(|| wrong_receiver(&self.class, &self.name, owner, obj))
            }
        }
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("is_static", &self.is_static())
            .field("arity", &self.arity)
            .finish()
    }
}

fn receiver<'a>(
    class: &str,
    member: &str,
    owner: &TypeHandle,
    obj: Option<&'a ObjectRef>,
) -> Result<&'a ObjectRef> {
    let obj = obj.ok_or_else(|| ReflectError::MissingInstance {
        class: class.to_string(),
        member: member.to_string(),
    })?;
    if obj.type_id() != owner.type_id() {
        return Err(wrong_receiver(class, member, owner, obj));
    }
    Ok(obj)
}

fn wrong_receiver(class: &str, member: &str, owner: &TypeHandle, obj: &ObjectRef) -> ReflectError {
    ReflectError::WrongReceiver {
        class: class.to_string(),
        member: member.to_string(),
        expected: owner.name().to_string(),
        found: obj.class_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    struct Sample {
        count: i64,
        label: String,
    }

    static SHARED_LIMIT: Lazy<RwLock<i64>> = Lazy::new(|| RwLock::new(10));

    fn sample_class() -> ClassDescriptor {
        ClassDescriptor::new(
            TypeHandle::of::<Sample>(),
            vec![
                FieldSpec::instance::<Sample, i64>("count", |s| &s.count, |s| &mut s.count),
                FieldSpec::instance::<Sample, String>("Label", |s| &s.label, |s| &mut s.label),
                FieldSpec::shared("SHARED_LIMIT", &*SHARED_LIMIT),
            ],
            vec![MethodSpec::shared_raw("Count_Args", |args: &[Value]| {
                Ok(Value::Int(args.len() as i64))
            })],
        )
    }

    #[test]
    fn test_instance_field_requires_instance() {
        let class = sample_class();
        let err = class.get_field("count").unwrap().get_value(None).unwrap_err();
        assert!(matches!(err, ReflectError::MissingInstance { .. }));
    }

    #[test]
    fn test_instance_field_rejects_foreign_receiver() {
        let class = sample_class();
        let other = ObjectRef::new(42_i64);
        let err = class.get_field("label").unwrap().get_value(Some(&other)).unwrap_err();
        assert!(matches!(err, ReflectError::WrongReceiver { .. }));
    }

    #[test]
    fn test_set_value_type_mismatch_leaves_field_untouched() {
        let class = sample_class();
        let obj = ObjectRef::new(Sample {
            count: 1,
            label: "a".into(),
        });
        let field = class.get_field("count").unwrap();
        assert!(field.set_value(Some(&obj), "six").is_err());
        assert_eq!(field.get_value(Some(&obj)).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_static_set_value_type_mismatch_leaves_field_untouched() {
        let class = sample_class();
        let field = class.get_field("SHARED_LIMIT").unwrap();
        let err = field.set_value(None, "x").unwrap_err();
        assert!(matches!(err, ReflectError::TypeMismatch { .. }));
        assert_eq!(field.get_value(None).unwrap(), Value::Int(10));
    }

    #[test]
    fn test_static_field_ignores_instance() {
        let class = sample_class();
        let field = class.get_field("sharedLimit").unwrap();
        assert!(field.is_static());
        let ignored = ObjectRef::new(42_i64);
        assert_eq!(field.get_value(Some(&ignored)).unwrap(), Value::Int(10));
    }

    #[test]
    fn test_raw_method_has_no_arity() {
        let class = sample_class();
        let method = class.get_method("countargs").unwrap();
        assert_eq!(method.arity(), None);
        let result = method.call(None, &[Value::Null, Value::Null]).unwrap();
        assert_eq!(result, Value::Int(2));
    }

    #[test]
    fn test_enumeration_is_sorted() {
        let class = sample_class();
        let names: Vec<_> = class.fields().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["Label", "SHARED_LIMIT", "count"]);
    }

    #[test]
    #[should_panic(expected = "is declared on")]
    fn test_member_of_other_type_is_fatal() {
        ClassDescriptor::new(
            TypeHandle::of::<String>(),
            vec![FieldSpec::instance::<Sample, i64>("count", |s| &s.count, |s| &mut s.count)],
            vec![],
        );
    }
}
