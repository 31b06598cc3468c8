/// Register a struct's members by name.
///
/// Instance fields and methods are named by their Rust identifiers, so a
/// member that does not exist fails to compile. Static members are given as
/// `"Name" => binding` pairs.
///
/// ```
/// use once_cell::sync::Lazy;
/// use std::sync::RwLock;
/// use onelang_runtime::reflect_class;
/// use onelang_runtime::reflect::Registry;
///
/// struct Counter {
///     count: i64,
/// }
///
/// impl Counter {
///     fn bump(&mut self) -> i64 {
///         self.count += 1;
///         self.count
///     }
/// }
///
/// static LIMIT: Lazy<RwLock<i64>> = Lazy::new(|| RwLock::new(10));
///
/// fn limit_of(by: i64) -> i64 {
///     *LIMIT.read().unwrap() * by
/// }
///
/// let mut registry = Registry::new();
/// let class = reflect_class!(in registry; Counter {
///     fields: [count],
///     statics: ["Limit" => &*LIMIT],
///     methods: [bump],
///     static_methods: ["LimitOf" => limit_of],
/// });
/// assert_eq!(class.name(), "Counter");
/// assert!(class.get_field("COUNT").is_some());
/// ```
///
/// Without `in registry;` the class goes into the process-wide registry.
#[macro_export]
macro_rules! reflect_class {
    (in $registry:expr; $ty:ty { $($body:tt)* }) => {{
        let (fields, methods) = $crate::reflect_class!(@specs $ty { $($body)* });
        $registry.register_class($crate::reflect::TypeHandle::of::<$ty>(), fields, methods)
    }};
    (@specs $ty:ty {
        $(fields: [$($field:ident),* $(,)?] $(,)?)?
        $(statics: [$($static_name:literal => $static_cell:expr),* $(,)?] $(,)?)?
        $(methods: [$($method:ident),* $(,)?] $(,)?)?
        $(static_methods: [$($static_method:literal => $static_fn:expr),* $(,)?] $(,)?)?
    }) => {{
        #[allow(unused_mut)]
        let mut fields: ::std::vec::Vec<$crate::reflect::FieldSpec> = ::std::vec::Vec::new();
        #[allow(unused_mut)]
        let mut methods: ::std::vec::Vec<$crate::reflect::MethodSpec> = ::std::vec::Vec::new();
        $($(
            fields.push($crate::reflect::FieldSpec::instance::<$ty, _>(
                stringify!($field),
                |target: &$ty| &target.$field,
                |target: &mut $ty| &mut target.$field,
            ));
        )*)?
        $($(
            fields.push($crate::reflect::FieldSpec::shared($static_name, $static_cell));
        )*)?
        $($(
            methods.push($crate::reflect::MethodSpec::instance::<$ty, _, _>(
                stringify!($method),
                <$ty>::$method,
            ));
        )*)?
        $($(
            methods.push($crate::reflect::MethodSpec::shared($static_method, $static_fn));
        )*)?
        (fields, methods)
    }};
    ($ty:ty { $($body:tt)* }) => {{
        let (fields, methods) = $crate::reflect_class!(@specs $ty { $($body)* });
        $crate::reflect::register_class($crate::reflect::TypeHandle::of::<$ty>(), fields, methods)
    }};
}
