//! Domain DTOs: request payload inputs, typed response schemas and the
//! resource descriptors handed back to callers.
//!
//! # Design
//! Response schemas (`ListInfo`, `FieldInfo`, `UserInfo`, `ViewFields`,
//! `ODataCollection`) name only the keys this crate relies on. Deserializing
//! into them fails if a required key is missing, so an unexpected payload
//! surfaces as `ApiError::Deserialization` instead of propagating silently.
//! Everything is owned (`String`, `Vec`) so values can be moved freely
//! between accessors and callers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;

/// The `__metadata` discriminator carried by every verbose-mode payload.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct TypeTag<'a> {
    #[serde(rename = "type")]
    pub(crate) kind: &'a str,
}

/// List templates this crate can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseTemplate {
    GenericList,
    DocumentLibrary,
    PictureLibrary,
}

impl BaseTemplate {
    /// Numeric template id used by the remote API.
    pub fn code(self) -> i32 {
        match self {
            BaseTemplate::GenericList => 100,
            BaseTemplate::DocumentLibrary => 101,
            BaseTemplate::PictureLibrary => 109,
        }
    }
}

/// Column types, named after the remote `FieldTypeKind` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Note,
    DateTime,
    Choice,
    Lookup,
    Boolean,
    Number,
    MultiChoice,
    User,
}

impl FieldType {
    /// Numeric `FieldTypeKind` used by the remote API.
    pub fn code(self) -> i32 {
        match self {
            FieldType::Text => 2,
            FieldType::Note => 3,
            FieldType::DateTime => 4,
            FieldType::Choice => 6,
            FieldType::Lookup => 7,
            FieldType::Boolean => 8,
            FieldType::Number => 9,
            FieldType::MultiChoice => 15,
            FieldType::User => 20,
        }
    }
}

/// Where a column is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    ListColumn,
    SiteColumn,
}

/// What to do when an existence-gated create finds a resource with the
/// requested title but a different shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Return the existing resource as if it matched.
    #[default]
    Lenient,
    /// Fail with `ApiError::ShapeMismatch`.
    Strict,
}

/// Input for creating a list or library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCreation {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub base_template: BaseTemplate,
    #[serde(default)]
    pub allow_content_types: bool,
    #[serde(default)]
    pub allow_folders: bool,
}

/// Input for creating a list or site column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCreation {
    pub title: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub lookup_list_id: Option<Uuid>,
    #[serde(default)]
    pub lookup_column_name: Option<String>,
    /// List the column is created in. Required for list columns.
    #[serde(default)]
    pub target_list_name: Option<String>,
    #[serde(default)]
    pub add_to_view: bool,
    #[serde(default)]
    pub view_name: Option<String>,
}

impl FieldCreation {
    pub fn new(title: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            title: title.into(),
            field_type,
            group: String::new(),
            description: String::new(),
            required: false,
            default_value: None,
            choices: None,
            lookup_list_id: None,
            lookup_column_name: None,
            target_list_name: None,
            add_to_view: false,
            view_name: None,
        }
    }
}

/// One column value for an item create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemValue {
    pub field_name: String,
    pub field_value: Value,
}

impl ItemValue {
    pub fn new(field_name: impl Into<String>, field_value: impl Into<Value>) -> Self {
        Self {
            field_name: field_name.into(),
            field_value: field_value.into(),
        }
    }
}

/// A list as returned by `/_api/web/lists`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListInfo {
    pub id: Uuid,
    pub title: String,
    pub base_template: i32,
    #[serde(default)]
    pub description: String,
    pub list_item_entity_type_full_name: String,
    #[serde(default)]
    pub item_count: u64,
}

/// A column as returned by a `fields` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldInfo {
    pub id: Uuid,
    pub title: String,
    pub internal_name: String,
    pub field_type_kind: i32,
    #[serde(default)]
    pub schema_xml: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub required: bool,
}

/// A site user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserInfo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub login_name: String,
}

/// Internal names of the fields shown in a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ViewFields {
    pub items: Vec<String>,
    #[serde(default)]
    pub schema_xml: String,
}

/// A `{"value": [...]}` collection with an optional continuation link.
#[derive(Debug, Clone, Deserialize)]
pub struct ODataCollection<T> {
    pub value: Vec<T>,
    #[serde(rename = "odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Result of looking up (or creating) one resource by title.
///
/// `exists` and `details` are only meaningful when `ok` is true.
#[derive(Debug, Clone)]
pub struct Resource<D> {
    pub title: String,
    pub ok: bool,
    pub exists: bool,
    pub details: Option<D>,
    pub error: Option<ApiError>,
}

impl<D> Resource<D> {
    pub fn found(title: impl Into<String>, details: D) -> Self {
        Self {
            title: title.into(),
            ok: true,
            exists: true,
            details: Some(details),
            error: None,
        }
    }

    pub fn absent(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ok: true,
            exists: false,
            details: None,
            error: None,
        }
    }

    pub fn failed(title: impl Into<String>, error: ApiError) -> Self {
        Self {
            title: title.into(),
            ok: false,
            exists: false,
            details: None,
            error: Some(error),
        }
    }
}

impl<D: DeserializeOwned> Resource<D> {
    /// Reads the first entry of a filtered `{"value": [...]}` lookup.
    /// An empty collection means the resource does not exist.
    pub(crate) fn from_first(title: &str, envelope: &Envelope) -> Self {
        match envelope.parse::<ODataCollection<D>>() {
            Ok(page) => match page.value.into_iter().next() {
                Some(details) => Self::found(title, details),
                None => Self::absent(title),
            },
            Err(err) => Self::failed(title, err),
        }
    }

    /// Reads a body that is the resource itself, e.g. a creation response.
    pub(crate) fn from_single(title: &str, envelope: &Envelope) -> Self {
        match envelope.parse::<D>() {
            Ok(details) => Self::found(title, details),
            Err(err) => Self::failed(title, err),
        }
    }
}

pub type ListDescriptor = Resource<ListInfo>;
pub type FieldDescriptor = Resource<FieldInfo>;

/// One page of list or library items.
#[derive(Debug, Clone)]
pub struct ItemsPage {
    pub ok: bool,
    pub items: Vec<Value>,
    /// Link to the next page, when the server returned one. Not followed
    /// automatically.
    pub next_link: Option<String>,
    pub error: Option<ApiError>,
}

impl ItemsPage {
    pub fn failed(error: ApiError) -> Self {
        Self {
            ok: false,
            items: Vec::new(),
            next_link: None,
            error: Some(error),
        }
    }
}

/// A single item read or written.
#[derive(Debug, Clone)]
pub struct ItemResponse {
    pub ok: bool,
    pub item: Option<Value>,
    pub error: Option<ApiError>,
}

impl ItemResponse {
    pub fn failed(error: ApiError) -> Self {
        Self {
            ok: false,
            item: None,
            error: Some(error),
        }
    }
}
