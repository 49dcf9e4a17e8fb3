//! Column lookups, column creation and view membership.
//!
//! # Design
//! Creation payloads are typed structs serialized with serde_json, so titles
//! and choices containing quotes are escaped by the encoder. The payload
//! shape depends on the field type and on the scope: only site columns carry
//! a `Group`, and lookup columns are wrapped in `parameters` because they go
//! to the `addfield` endpoint instead of `fields`.
//!
//! Column creation is existence-gated by title; a column counts as matching
//! when the found field has an internal name.

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::SpClient;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::gate::ensure_exists;
use crate::http::Transport;
use crate::types::{
    FieldCreation, FieldDescriptor, FieldInfo, FieldScope, FieldType, ODataCollection, Resource, TypeTag,
    ViewFields,
};
use crate::util::{filter_query, is_blank, odata_literal, odata_path_literal};

#[derive(Serialize)]
struct ChoiceSet<'a> {
    #[serde(rename = "__metadata")]
    metadata: TypeTag<'static>,
    results: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FieldSchema<'a> {
    #[serde(rename = "__metadata")]
    metadata: TypeTag<'static>,
    field_type_kind: i32,
    title: &'a str,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    choices: Option<ChoiceSet<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edit_format: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number_of_lines: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rich_text: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_hyperlink: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    restricted_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selection_mode: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lookup_list_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lookup_field_name: Option<&'a str>,
}

impl<'a> FieldSchema<'a> {
    fn base(type_tag: &'static str, field: &'a FieldCreation, scope: FieldScope) -> Self {
        Self {
            metadata: TypeTag { kind: type_tag },
            field_type_kind: field.field_type.code(),
            title: &field.title,
            required: field.required,
            group: (scope == FieldScope::SiteColumn).then_some(field.group.as_str()),
            default_value: None,
            choices: None,
            edit_format: None,
            number_of_lines: None,
            rich_text: None,
            allow_hyperlink: None,
            restricted_mode: None,
            selection_mode: None,
            presence: None,
            lookup_list_id: None,
            lookup_field_name: None,
        }
    }
}

#[derive(Serialize)]
struct CreationParameters<T> {
    parameters: T,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct XmlSchemaCreation<'a> {
    #[serde(rename = "__metadata")]
    metadata: TypeTag<'static>,
    options: u32,
    schema_xml: &'a str,
}

/// Builds the JSON creation payload for `field` at `scope`.
///
/// Errors on an empty title, on choice columns without choices, on lookup
/// columns without a target, and for `Boolean`/`DateTime`, which have no
/// template.
pub fn field_metadata(field: &FieldCreation, scope: FieldScope) -> Result<String, ApiError> {
    if is_blank(&field.title) {
        return Err(ApiError::InvalidInput("field title cannot be blank".to_string()));
    }

    let schema = match field.field_type {
        FieldType::Text => FieldSchema::base("SP.Field", field, scope),
        FieldType::Note => FieldSchema {
            number_of_lines: Some(12),
            rich_text: Some(true),
            allow_hyperlink: Some(true),
            restricted_mode: Some(true),
            ..FieldSchema::base("SP.FieldMultiLineText", field, scope)
        },
        FieldType::Number => FieldSchema::base("SP.FieldNumber", field, scope),
        FieldType::User => FieldSchema {
            selection_mode: Some(0),
            presence: Some(true),
            ..FieldSchema::base("SP.FieldUser", field, scope)
        },
        FieldType::Choice | FieldType::MultiChoice => {
            let choices = match field.choices.as_deref() {
                Some(choices) if !choices.is_empty() => choices,
                _ => {
                    return Err(ApiError::InvalidInput(format!(
                        "choice field '{}' needs at least one choice",
                        field.title
                    )))
                }
            };
            let default_value = match field.default_value.as_deref() {
                Some(value) if !is_blank(value) => value,
                _ => choices[0].as_str(),
            };
            let type_tag = if field.field_type == FieldType::Choice {
                "SP.FieldChoice"
            } else {
                "SP.FieldMultiChoice"
            };
            FieldSchema {
                default_value: Some(default_value),
                choices: Some(ChoiceSet {
                    metadata: TypeTag {
                        kind: "Collection(Edm.String)",
                    },
                    results: choices,
                }),
                edit_format: Some(0),
                ..FieldSchema::base(type_tag, field, scope)
            }
        }
        FieldType::Lookup => {
            let (Some(list_id), Some(column)) = (field.lookup_list_id, field.lookup_column_name.as_deref()) else {
                return Err(ApiError::InvalidInput(format!(
                    "lookup field '{}' needs a lookup list id and column name",
                    field.title
                )));
            };
            if is_blank(column) {
                return Err(ApiError::InvalidInput(format!(
                    "lookup field '{}' needs a lookup column name",
                    field.title
                )));
            }
            let schema = FieldSchema {
                lookup_list_id: Some(list_id),
                lookup_field_name: Some(column),
                ..FieldSchema::base("SP.FieldCreationInformation", field, scope)
            };
            return to_json(&CreationParameters { parameters: schema });
        }
        FieldType::Boolean | FieldType::DateTime => {
            return Err(ApiError::UnsupportedFieldType(field.field_type));
        }
    };

    to_json(&schema)
}

fn to_json<S: Serialize>(value: &S) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Column operations, borrowed from `SpClient::fields`.
pub struct Fields<'a, T> {
    client: &'a SpClient<T>,
}

impl<'a, T: Transport> Fields<'a, T> {
    pub(crate) fn new(client: &'a SpClient<T>) -> Self {
        Self { client }
    }

    /// Looks up a column of `list_title` by display title.
    pub fn get_by_list(&self, field_title: &str, list_title: &str) -> FieldDescriptor {
        if is_blank(field_title) || is_blank(list_title) {
            return Resource::failed(
                field_title,
                ApiError::InvalidInput("field and list titles cannot be blank".to_string()),
            );
        }
        let url = self.client.list_url(
            list_title,
            &format!("/fields?{}", filter_query(&format!("Title eq {}", odata_literal(field_title)))),
        );
        Resource::from_first(field_title, &self.client.get(&url))
    }

    /// Looks up a site column by display title.
    pub fn get_by_site(&self, field_title: &str) -> FieldDescriptor {
        if is_blank(field_title) {
            return Resource::failed(field_title, ApiError::InvalidInput("field title cannot be blank".to_string()));
        }
        let url = self
            .client
            .api_url(&format!("web/fields?{}", filter_query(&format!("Title eq {}", odata_literal(field_title)))));
        Resource::from_first(field_title, &self.client.get(&url))
    }

    /// All columns of `list_title`.
    pub fn list_fields(&self, list_title: &str) -> Resource<Vec<FieldInfo>> {
        let envelope = self.client.get(&self.client.list_url(list_title, "/fields"));
        match envelope.parse::<ODataCollection<FieldInfo>>() {
            Ok(page) => Resource::found(list_title, page.value),
            Err(err) => Resource::failed(list_title, err),
        }
    }

    /// Internal names of the columns shown in `view_title`.
    pub fn view_fields(&self, list_title: &str, view_title: &str) -> Resource<ViewFields> {
        let url = self.client.list_url(
            list_title,
            &format!("/views/getByTitle({})/ViewFields", odata_path_literal(view_title)),
        );
        Resource::from_single(view_title, &self.client.get(&url))
    }

    /// True if `internal_name` is shown in the view. Lookup failures count as
    /// not shown.
    pub fn is_in_view(&self, list_title: &str, view_title: &str, internal_name: &str) -> bool {
        self.view_fields(list_title, view_title)
            .details
            .is_some_and(|view| view.items.iter().any(|name| name == internal_name))
    }

    /// Adds a column to a view. Sends nothing when it is already shown.
    pub fn add_to_view(&self, list_title: &str, view_title: &str, internal_name: &str) -> Envelope {
        if self.is_in_view(list_title, view_title, internal_name) {
            debug!(source = %self.client.log_source(), internal_name, view_title, "field already in view");
            return Envelope::local_success("field already in view");
        }
        let url = self.client.list_url(
            list_title,
            &format!(
                "/views/getByTitle({})/ViewFields/addviewfield({})",
                odata_path_literal(view_title),
                odata_path_literal(internal_name)
            ),
        );
        self.client.post_empty(&url)
    }

    /// Creates a column in `field.target_list_name` unless a column with the
    /// same title already exists there.
    pub fn create_list_column(&self, field: &FieldCreation) -> FieldDescriptor {
        let Some(list_title) = field.target_list_name.as_deref().filter(|t| !is_blank(t)) else {
            return Resource::failed(
                &field.title,
                ApiError::InvalidInput("list column needs a target list name".to_string()),
            );
        };
        let body = match field_metadata(field, FieldScope::ListColumn) {
            Ok(body) => body,
            Err(err) => return Resource::failed(&field.title, err),
        };

        let lookup = self.get_by_list(&field.title, list_title);
        ensure_exists("field", lookup, self.client.config().shape_policy, missing_internal_name, || {
            let url = self.client.list_url(list_title, fields_endpoint(field.field_type));
            let created: FieldDescriptor = Resource::from_single(&field.title, &self.client.post(&url, &body));
            if let (true, Some(view), Some(info)) = (field.add_to_view, field.view_name.as_deref(), &created.details) {
                if !is_blank(view) {
                    let added = self.add_to_view(list_title, view, &info.internal_name);
                    if !added.ok {
                        warn!(
                            source = %self.client.log_source(),
                            field = %field.title,
                            view,
                            error = %added.error_or_status(),
                            "column created but not added to view"
                        );
                    }
                }
            }
            created
        })
    }

    /// Creates a site column unless one with the same title already exists.
    pub fn create_site_column(&self, field: &FieldCreation) -> FieldDescriptor {
        let body = match field_metadata(field, FieldScope::SiteColumn) {
            Ok(body) => body,
            Err(err) => return Resource::failed(&field.title, err),
        };

        let lookup = self.get_by_site(&field.title);
        ensure_exists("field", lookup, self.client.config().shape_policy, missing_internal_name, || {
            let url = self.client.api_url(&format!("web{}", fields_endpoint(field.field_type)));
            Resource::from_single(&field.title, &self.client.post(&url, &body))
        })
    }

    /// Copies an existing site column into a list through its schema XML.
    pub fn add_site_column_to_list(&self, field_title: &str, list_title: &str) -> FieldDescriptor {
        let site_column = self.get_by_site(field_title);
        if !site_column.ok {
            return site_column;
        }
        let Some(site_info) = site_column.details else {
            return Resource::failed(
                field_title,
                ApiError::NotFound {
                    kind: "site column",
                    title: field_title.to_string(),
                },
            );
        };

        let lookup = self.get_by_list(field_title, list_title);
        ensure_exists("field", lookup, self.client.config().shape_policy, missing_internal_name, || {
            let payload = CreationParameters {
                parameters: XmlSchemaCreation {
                    metadata: TypeTag {
                        kind: "SP.XmlSchemaFieldCreationInformation",
                    },
                    options: 8,
                    schema_xml: &site_info.schema_xml,
                },
            };
            let body = match to_json(&payload) {
                Ok(body) => body,
                Err(err) => return Resource::failed(field_title, err),
            };
            let url = self.client.list_url(list_title, "/fields/createfieldasxml");
            Resource::from_single(field_title, &self.client.post(&url, &body))
        })
    }
}

fn fields_endpoint(field_type: FieldType) -> &'static str {
    if field_type == FieldType::Lookup {
        "/fields/addfield"
    } else {
        "/fields"
    }
}

fn missing_internal_name(info: &FieldInfo) -> Option<String> {
    is_blank(&info.internal_name).then(|| "field has no internal name".to_string())
}
