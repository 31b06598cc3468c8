//! Reflection fixture exercised by `onert demo`
//!
//! Mirrors what a transpiled class looks like once registered: one field and
//! one method of each kind.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use std::sync::{PoisonError, RwLock};

use onelang_runtime::reflect::Registry;
use onelang_runtime::{reflect_class, ObjectRef, Value};

pub struct TargetClass {
    pub instance_field: i64,
}

impl Default for TargetClass {
    fn default() -> Self {
        Self { instance_field: 5 }
    }
}

impl TargetClass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_method(&self) -> String {
        format!("instanceField = {}", self.instance_field)
    }
}

pub static TARGET_CLASS_STATIC_FIELD: Lazy<RwLock<String>> =
    Lazy::new(|| RwLock::new("hello".to_string()));

pub fn target_class_static_method(arg1: String) -> String {
    format!(
        "arg1 = {}, staticField = {}",
        arg1,
        TARGET_CLASS_STATIC_FIELD
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    )
}

pub fn register(registry: &mut Registry) {
    reflect_class!(in registry; TargetClass {
        fields: [instance_field],
        statics: ["StaticField" => &*TARGET_CLASS_STATIC_FIELD],
        methods: [instance_method],
        static_methods: ["StaticMethod" => target_class_static_method],
    });
}

/// Walk every query/call operation once, returning the printed lines.
pub fn run(registry: &Registry) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let obj = ObjectRef::new(TargetClass::new());

    let cls = registry
        .class_of(&obj)
        .ok_or_else(|| anyhow!("cls is null!"))?;
    registry
        .class_by_name("TargetClass")
        .ok_or_else(|| anyhow!("cls2 is null!"))?;

    let method1 = cls
        .get_method("instanceMethod")
        .ok_or_else(|| anyhow!("method1 is null!"))?;
    let method1_result = method1.call(Some(&obj), &[])?;
    out.push(format!("instanceMethod: {method1_result}"));

    let method2 = cls
        .get_method("staticMethod")
        .ok_or_else(|| anyhow!("method2 is null!"))?;
    let method2_result = method2.call(None, &[Value::from("arg1value")])?;
    out.push(format!("staticMethod: {method2_result}"));

    let field1 = cls
        .get_field("instanceField")
        .ok_or_else(|| anyhow!("field1 is null!"))?;
    field1.set_value(Some(&obj), 6)?;
    let field1_new_val = field1.get_value(Some(&obj))?;
    let direct = obj
        .with_ref(|target: &TargetClass| target.instance_field)?
        .ok_or_else(|| anyhow!("obj is not a TargetClass"))?;
    out.push(format!(
        "new instance field value: {direct} == {field1_new_val}"
    ));

    let field2 = cls
        .get_field("staticField")
        .ok_or_else(|| anyhow!("field2 is null!"))?;
    field2.set_value(None, "bello")?;
    let field2_new_val = field2.get_value(None)?;
    let direct = TARGET_CLASS_STATIC_FIELD
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    out.push(format!(
        "new static field value: {direct} == {field2_new_val}"
    ));

    Ok(out)
}
