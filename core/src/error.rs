//! Error types for the SharePoint REST helper.
//!
//! # Design
//! Errors never cross the public boundary as panics or `Err` values of
//! network-backed operations; they travel inside envelopes (`Envelope`,
//! `Resource`, `ItemsPage`) so callers can keep a single result shape.
//! Only the pure builders and utilities return `Result<_, ApiError>`.
//!
//! `ApiError` is `Clone` because the same error is copied from a transport
//! envelope into the resource descriptor built on top of it.

use thiserror::Error;

use crate::types::FieldType;

/// Errors carried by envelopes and returned by the pure builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The caller supplied invalid input. No request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request never produced a remote status (DNS, connect, timeout,
    /// unreadable body).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// The response body did not match the expected schema.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A resource required by a write does not exist.
    #[error("{kind} '{title}' does not exist")]
    NotFound { kind: &'static str, title: String },

    /// A resource with the requested title exists but has a different shape.
    #[error("{kind} '{title}' exists with a different shape: {detail}")]
    ShapeMismatch {
        kind: &'static str,
        title: String,
        detail: String,
    },

    /// The field type has no creation template.
    #[error("no creation template for field type {0:?}")]
    UnsupportedFieldType(FieldType),

    /// The logger gave up validating its target list.
    #[error("log list validation attempts exhausted after {attempts} tries")]
    ValidationExhausted { attempts: u32 },

    /// The log list is missing or lacks one of its expected columns.
    #[error("log list schema invalid: {0}")]
    SchemaInvalid(String),
}
