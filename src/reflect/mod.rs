//! Name-based reflection registry
//!
//! Generated code registers each class once, at start-up, with the fields and
//! methods it wants to expose. Afterwards any caller can look a class up by
//! name or by instance and get, set or call its members by name.
//!
//! Names are normalized before every insert and every lookup, so
//! `InstanceField`, `instance_field` and `INSTANCEFIELD` are the same key.

pub mod callable;
pub mod descriptor;
mod macros;

use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub use callable::{ByMut, ByRef, InstanceFn, SharedFn};
pub use descriptor::{ClassDescriptor, FieldDescriptor, FieldSpec, MethodDescriptor, MethodSpec};

use crate::value::{short_type_name, ObjectRef, Value};

/// Registry key for a class or member name.
///
/// Drops separators (`_`, `-`, `.`, whitespace) and lowercases.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c: &char| !matches!(*c, '_' | '-' | '.') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Runtime identity of a registrable type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHandle {
    type_id: TypeId,
    name: String,
}

impl TypeHandle {
    /// Handle named after the type's last path segment.
    pub fn of<T: Any>() -> Self {
        Self::named::<T>(short_type_name(std::any::type_name::<T>()))
    }

    pub fn named<T: Any>(name: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: name.into(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Class table keyed by normalized class name
#[derive(Debug, Default)]
pub struct Registry {
    classes: HashMap<String, Arc<ClassDescriptor>>,
    by_type: HashMap<TypeId, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and store the descriptor for one class, replacing any class
    /// previously registered under the same normalized name.
    ///
    /// # Panics
    /// If an instance member spec was built for a type other than `handle`.
    pub fn register_class(
        &mut self,
        handle: TypeHandle,
        fields: Vec<FieldSpec>,
        methods: Vec<MethodSpec>,
    ) -> Arc<ClassDescriptor> {
        let key = normalize_name(handle.name());
        let type_id = handle.type_id();
        let (field_count, method_count) = (fields.len(), methods.len());

        let class = Arc::new(ClassDescriptor::new(handle, fields, methods));
        if let Some(previous) = self.classes.insert(key.clone(), Arc::clone(&class)) {
            let previous_id = previous.handle().type_id();
            if previous_id != type_id && self.by_type.get(&previous_id) == Some(&key) {
                self.by_type.remove(&previous_id);
            }
        }
        self.by_type.insert(type_id, key);

        tracing::debug!(
            class = class.name(),
            fields = field_count,
            methods = method_count,
            "registered class"
        );
        class
    }

    pub fn class_by_name(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        let class = self.classes.get(&normalize_name(name)).cloned();
        if class.is_none() {
            tracing::trace!(class = name, "class lookup miss");
        }
        class
    }

    /// Class of the instance behind `obj`
    pub fn class_of(&self, obj: &ObjectRef) -> Option<Arc<ClassDescriptor>> {
        self.class_by_type(obj.type_id())
    }

    /// Class of an object value; `None` for every other kind of value
    pub fn class_of_value(&self, value: &Value) -> Option<Arc<ClassDescriptor>> {
        value.as_object().and_then(|obj| self.class_of(obj))
    }

    pub fn class_for<T: Any>(&self) -> Option<Arc<ClassDescriptor>> {
        self.class_by_type(TypeId::of::<T>())
    }

    fn class_by_type(&self, type_id: TypeId) -> Option<Arc<ClassDescriptor>> {
        let key = self.by_type.get(&type_id)?;
        self.classes.get(key).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(&normalize_name(name))
    }

    /// All classes, ordered by name
    pub fn classes(&self) -> Vec<Arc<ClassDescriptor>> {
        let mut classes: Vec<_> = self.classes.values().cloned().collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));
        classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

// --- Process-wide registry ---

static GLOBAL: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::new()));

/// The process-wide registry.
///
/// Populated during initialization, read afterwards.
pub fn global() -> &'static RwLock<Registry> {
    &GLOBAL
}

/// Register a class in the process-wide registry
pub fn register_class(
    handle: TypeHandle,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
) -> Arc<ClassDescriptor> {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register_class(handle, fields, methods)
}

pub fn get_class_by_name(name: &str) -> Option<Arc<ClassDescriptor>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .class_by_name(name)
}

pub fn get_class(obj: &ObjectRef) -> Option<Arc<ClassDescriptor>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .class_of(obj)
}
