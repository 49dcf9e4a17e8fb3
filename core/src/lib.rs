//! Synchronous client core for the SharePoint REST API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). A `Transport` executes the
//! round trip; `UreqTransport` is the stock one, and tests swap in scripted
//! transports so everything above it stays deterministic.
//!
//! # Design
//! - `SpClient` holds only the site configuration and its transport. Domain
//!   operations hang off borrowed views: `lists()`, `fields()`, `users()`,
//!   `icons()` and `batch()`.
//! - Every call returns data (`Envelope`, `Resource`, `ItemsPage`, ...) with
//!   an `ok` flag and a typed `ApiError`; nothing panics on remote failure.
//! - "Create if missing" operations look the resource up first and only
//!   create it when absent; existing resources with a different shape are
//!   handled according to `ShapePolicy`.
//! - `ListLogger` writes log records into a list, validating its schema once
//!   and giving up after a bounded number of failed validations.

pub mod batch;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fields;
mod gate;
pub mod http;
pub mod icons;
pub mod lists;
pub mod logger;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod types;
pub mod users;
pub mod util;

#[cfg(test)]
mod testing;

pub use client::SpClient;
pub use config::{LoggerConfig, SiteConfig};
pub use envelope::{Envelope, NO_REMOTE_STATUS};
pub use error::ApiError;
pub use fields::field_metadata;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use icons::{DocIcon, DocRef};
pub use logger::{ListLogger, LogOutcome, LogRecord, Severity};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{
    BaseTemplate, FieldCreation, FieldDescriptor, FieldInfo, FieldScope, FieldType, ItemResponse, ItemValue,
    ItemsPage, ListCreation, ListDescriptor, ListInfo, ODataCollection, Resource, ShapePolicy, UserInfo, ViewFields,
};
