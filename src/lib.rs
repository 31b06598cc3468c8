//! OneLang runtime - support library for transpiled code
//!
//! # Overview
//! Two facilities that generated code relies on but a statically typed target
//! does not provide directly:
//!
//! - [`reflect`]: a registry of classes whose fields and methods can be read,
//!   written and called by (normalized) name.
//! - [`matcher`]: regular-expression matching pinned to start at a byte offset
//!   inside a larger string.

pub mod error;
pub mod matcher;
pub mod reflect;
pub mod value;

pub use error::{MatchError, ReflectError};
pub use matcher::{match_from_offset, AnchoredRegex};
pub use reflect::{
    ClassDescriptor, FieldDescriptor, FieldSpec, MethodDescriptor, MethodSpec, Registry,
    TypeHandle,
};
pub use value::{FromValue, ObjectRef, Value};
