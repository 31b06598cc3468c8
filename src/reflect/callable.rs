//! Callable Adapter Trait Definitions
//!
//! 型付きの Rust 関数を、`&[Value]` を受け取る動的呼び出しに変換する。
//! 引数の個数と型はすべて呼び出し時に検査される。

use std::any::Any;

use crate::error::{ReflectError, Result};
use crate::value::{FromValue, ObjectRef, Value};

/// レシーバを `&T` で受け取るインスタンスメソッドのマーカー
pub struct ByRef;

/// レシーバを `&mut T` で受け取るインスタンスメソッドのマーカー
pub struct ByMut;

/// 静的メソッドとして登録できる関数
///
/// `Args` は引数型のタプル。0〜4 引数の `Fn` に実装される。
pub trait SharedFn<Args>: Send + Sync + 'static {
    /// 期待する引数の個数
    const ARITY: usize;

    /// 引数を変換して呼び出す
    ///
    /// # Arguments
    /// * `method` - エラー表示用の修飾名（例: "TargetClass::staticMethod"）
    /// * `args` - 呼び出し引数
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value>;
}

/// インスタンスメソッドとして登録できる関数
///
/// 第一引数がレシーバ（`&T` または `&mut T`）。
pub trait InstanceFn<T, Marker>: Send + Sync + 'static {
    const ARITY: usize;

    /// レシーバが `T` でない場合は `Ok(None)`
    fn invoke(&self, method: &str, this: &ObjectRef, args: &[Value]) -> Result<Option<Value>>;
}

pub(crate) fn check_arity(method: &str, expected: usize, args: &[Value]) -> Result<()> {
    if args.len() != expected {
        return Err(ReflectError::ArityMismatch {
            method: method.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

macro_rules! impl_callables {
    ($arity:expr; $($arg:ident $val:ident $idx:tt),*) => {
        impl<F, R, $($arg,)*> SharedFn<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: Into<Value>,
            $($arg: FromValue,)*
        {
            const ARITY: usize = $arity;

            fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
                check_arity(method, $arity, args)?;
                Ok((self)($($arg::from_value(args[$idx].clone())?),*).into())
            }
        }

        impl<F, T, R, $($arg,)*> InstanceFn<T, (ByRef, ($($arg,)*))> for F
        where
            F: Fn(&T, $($arg),*) -> R + Send + Sync + 'static,
            T: Any,
            R: Into<Value>,
            $($arg: FromValue,)*
        {
            const ARITY: usize = $arity;

            fn invoke(&self, method: &str, this: &ObjectRef, args: &[Value]) -> Result<Option<Value>> {
                check_arity(method, $arity, args)?;
                $(let $val = $arg::from_value(args[$idx].clone())?;)*
                this.with_ref(|target: &T| (self)(target, $($val),*).into())
            }
        }

        impl<F, T, R, $($arg,)*> InstanceFn<T, (ByMut, ($($arg,)*))> for F
        where
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            T: Any,
            R: Into<Value>,
            $($arg: FromValue,)*
        {
            const ARITY: usize = $arity;

            fn invoke(&self, method: &str, this: &ObjectRef, args: &[Value]) -> Result<Option<Value>> {
                check_arity(method, $arity, args)?;
                $(let $val = $arg::from_value(args[$idx].clone())?;)*
                this.with_mut(|target: &mut T| (self)(target, $($val),*).into())
            }
        }
    };
}

impl_callables!(0;);
impl_callables!(1; A a 0);
impl_callables!(2; A a 0, B b 1);
impl_callables!(3; A a 0, B b 1, C c 2);
impl_callables!(4; A a 0, B b 1, C c 2, D d 3);
