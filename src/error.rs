//! Error types for reconciliation, positioning and filtering.

use crate::store::{Operation, StoreError};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error is returned by every fallible engine operation.
///
/// Nothing is retried or recovered locally: a partially applied policy change
/// is worse than an aborted one, so each failure surfaces as soon as it occurs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("verb '{verb}' is not supported for {object_type}: {reason}")]
    Verb {
        verb: String,
        object_type: String,
        reason: String,
    },

    #[error("position error: {message}")]
    Position { message: String },

    #[error("{object_type} '{uid}' not found in {scope}")]
    NotFound {
        object_type: String,
        uid: String,
        scope: String,
    },

    #[error("filter syntax error: {message}")]
    FilterSyntax { message: String },

    #[error("remote {operation} failed for {target}{detail}: {source}")]
    RemoteOperation {
        operation: Operation,
        target: String,
        detail: String,
        #[source]
        source: StoreError,
    },

    #[error("timed out after {elapsed:?} waiting for {what}")]
    Timeout { what: String, elapsed: Duration },

    #[error("listing of {object_type} contains uid '{uid}' more than once")]
    DuplicateUid { object_type: String, uid: String },

    #[error("schema error: {message}")]
    Schema { message: String },
}

impl Error {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Creates an unsupported verb error.
    pub fn verb(verb: impl Into<String>, object_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Verb {
            verb: verb.into(),
            object_type: object_type.into(),
            reason: reason.into(),
        }
    }

    /// Creates a positioning precondition error.
    pub fn position(message: impl Into<String>) -> Self {
        Error::Position {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(object_type: impl Into<String>, uid: impl Into<String>, scope: impl Into<String>) -> Self {
        Error::NotFound {
            object_type: object_type.into(),
            uid: uid.into(),
            scope: scope.into(),
        }
    }

    /// Creates a filter syntax error.
    pub fn filter_syntax(message: impl Into<String>) -> Self {
        Error::FilterSyntax {
            message: message.into(),
        }
    }

    /// Wraps a store failure. `fields` names what the failed call touched, if anything.
    pub fn remote(operation: Operation, target: impl Into<String>, fields: &[String], source: StoreError) -> Self {
        let detail = if fields.is_empty() {
            String::new()
        } else {
            format!(" (fields: {})", fields.join(", "))
        };
        Error::RemoteOperation {
            operation,
            target: target.into(),
            detail,
            source,
        }
    }

    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema {
            message: message.into(),
        }
    }

    /// Returns true for the caller-input class of errors (bad verb, flag or
    /// parameter combinations).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. } | Error::Verb { .. } | Error::Position { .. }
        )
    }
}
