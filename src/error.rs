//! Error types for the OneLang runtime

use thiserror::Error;

/// Failures of dynamic field access and method dispatch.
///
/// Lookups (class, field, method) never produce these; a miss is `None`.
#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("Instance member '{member}' of {class} requires an instance")]
    MissingInstance { class: String, member: String },

    #[error("Receiver mismatch for {class}::{member}: expected {expected}, got {found}")]
    WrongReceiver {
        class: String,
        member: String,
        expected: String,
        found: String,
    },

    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Expected {expected} arguments, but got {found} in {method} call")]
    ArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("Reentrant access to a {class} instance already borrowed by this thread")]
    Reentrant { class: String },
}

impl ReflectError {
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ReflectError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Misuse of the anchored matcher. "No match" is not an error.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex_automata::meta::BuildError,
    },

    #[error("Offset {offset} is out of bounds for subject of length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("Offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },
}

pub type Result<T> = std::result::Result<T, ReflectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_error_display() {
        let err = ReflectError::ArityMismatch {
            method: "TargetClass::staticMethod".to_string(),
            expected: 1,
            found: 0,
        };
        assert_eq!(
            format!("{err}"),
            "Expected 1 arguments, but got 0 in TargetClass::staticMethod call"
        );
    }

    #[test]
    fn test_reentrant_error_display() {
        let err = ReflectError::Reentrant {
            class: "Node".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Reentrant access to a Node instance already borrowed by this thread"
        );
    }

    #[test]
    fn test_offset_error_display() {
        let err = MatchError::OffsetOutOfBounds { offset: 9, len: 7 };
        assert_eq!(
            format!("{err}"),
            "Offset 9 is out of bounds for subject of length 7"
        );
    }
}
