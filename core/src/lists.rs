//! List, library and item operations.
//!
//! # Design
//! Lookups by title go through the filtered collection
//! (`web/lists?$filter=Title eq '...'`) rather than `getByTitle`, so a
//! missing list is `ok` with `exists == false` instead of a 404. Everything
//! addressed *inside* a list uses `getByTitle('...')`, where a 404 is a real
//! failure.
//!
//! Item writes need the list's `ListItemEntityTypeFullName` for the
//! `__metadata` discriminator, so each write starts with a list lookup.
//! Updates are MERGE with `if-match: *`: the last writer wins.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::client::SpClient;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::gate::ensure_exists;
use crate::http::{HttpRequest, Transport};
use crate::types::{
    BaseTemplate, ItemResponse, ItemValue, ItemsPage, ListCreation, ListDescriptor, ODataCollection, Resource,
    TypeTag,
};
use crate::util::{filter_query, is_blank, odata_folder_literal, odata_literal, odata_path_literal};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListPayload<'a> {
    #[serde(rename = "__metadata")]
    metadata: TypeTag<'static>,
    base_template: i32,
    title: &'a str,
    description: &'a str,
    allow_content_types: bool,
    content_types_enabled: bool,
    enable_folder_creation: bool,
}

/// List operations, borrowed from `SpClient::lists`.
pub struct Lists<'a, T> {
    client: &'a SpClient<T>,
}

impl<'a, T: Transport> Lists<'a, T> {
    pub(crate) fn new(client: &'a SpClient<T>) -> Self {
        Self { client }
    }

    /// Looks up a list of the current web by title.
    pub fn get_by_title(&self, title: &str) -> ListDescriptor {
        if is_blank(title) {
            return Resource::failed(title, ApiError::InvalidInput("list title cannot be blank".to_string()));
        }
        let url = self
            .client
            .api_url(&format!("web/lists?{}", filter_query(&format!("Title eq {}", odata_literal(title)))));
        Resource::from_first(title, &self.client.get(&url))
    }

    /// Builds the creation request for `list` without sending it.
    pub fn metadata(&self, list: &ListCreation) -> Result<HttpRequest, ApiError> {
        if is_blank(&list.title) {
            return Err(ApiError::InvalidInput("list title cannot be blank".to_string()));
        }
        let payload = ListPayload {
            metadata: TypeTag { kind: "SP.List" },
            base_template: list.base_template.code(),
            title: &list.title,
            description: &list.description,
            allow_content_types: list.allow_content_types,
            content_types_enabled: list.allow_content_types,
            enable_folder_creation: list.allow_folders,
        };
        let body = serde_json::to_string(&payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.client.build_post(&self.client.api_url("web/lists"), Some(&body))
    }

    /// Creates the list unless one with the same title exists. A list with
    /// the same title and base template is returned as is.
    pub fn create(&self, list: &ListCreation) -> ListDescriptor {
        let request = match self.metadata(list) {
            Ok(request) => request,
            Err(err) => return Resource::failed(&list.title, err),
        };

        let wanted = list.base_template.code();
        let lookup = self.get_by_title(&list.title);
        ensure_exists(
            "list",
            lookup,
            self.client.config().shape_policy,
            |info| (info.base_template != wanted).then(|| format!("base template {}, wanted {wanted}", info.base_template)),
            || Resource::from_single(&list.title, &self.client.send(&request)),
        )
    }

    /// Items of a list. `row_count == 0` returns the server's default page.
    pub fn items(&self, title: &str, row_count: u32) -> ItemsPage {
        self.items_by_query(title, &top_query(row_count))
    }

    /// Items of a list with a raw OData query such as `$top=5&$select=Title`.
    /// A leading `?` is optional.
    pub fn items_by_query(&self, title: &str, query: &str) -> ItemsPage {
        self.page(title, "/Items", query)
    }

    /// Follows a continuation link returned in `ItemsPage::next_link`.
    pub fn next_page(&self, next_link: &str) -> ItemsPage {
        items_page(&self.client.get(next_link))
    }

    pub fn item_by_id(&self, title: &str, item_id: i64) -> ItemResponse {
        let url = self.client.list_url(title, &format!("/Items({item_id})"));
        item_response(self.client.get(&url))
    }

    /// Files of a document library.
    pub fn library_items(&self, title: &str, row_count: u32) -> ItemsPage {
        self.page(title, "/Files", &top_query(row_count))
    }

    pub fn library_item_by_file_id(&self, title: &str, file_id: &str) -> ItemResponse {
        let url = self.client.list_url(title, &format!("/Files({})", odata_path_literal(file_id)));
        item_response(self.client.get(&url))
    }

    fn page(&self, title: &str, segment: &str, query: &str) -> ItemsPage {
        if is_blank(title) {
            return ItemsPage::failed(ApiError::InvalidInput("list title cannot be blank".to_string()));
        }
        let query = query.trim_start_matches('?');
        let url = if query.is_empty() {
            self.client.list_url(title, segment)
        } else {
            self.client.list_url(title, &format!("{segment}?{query}"))
        };
        items_page(&self.client.get(&url))
    }

    /// Creates an item with the given column values.
    pub fn create_item(&self, title: &str, values: &[ItemValue]) -> ItemResponse {
        match self.entity_type(title) {
            Ok(entity_type) => item_response(self.post_item(title, &entity_type, values)),
            Err(err) => ItemResponse::failed(err),
        }
    }

    /// Overwrites the given columns of an item, unconditionally.
    pub fn update_item(&self, title: &str, item_id: i64, values: &[ItemValue]) -> Envelope {
        let entity_type = match self.entity_type(title) {
            Ok(entity_type) => entity_type,
            Err(err) => return Envelope::local_failure(err),
        };
        let url = self.client.list_url(title, &format!("/items({item_id})"));
        self.client.merge(&url, &item_body(&entity_type, values))
    }

    /// Creates a folder in a document library. `library` is the library's
    /// URL name, not its title.
    pub fn create_folder_in_library(&self, library: &str, folder: &str) -> ItemResponse {
        if is_blank(library) || is_blank(folder) {
            return ItemResponse::failed(ApiError::InvalidInput(
                "library and folder names cannot be blank".to_string(),
            ));
        }
        let url = self
            .client
            .api_url(&format!("web/folders/add({})", odata_folder_literal(&format!("{library}/{folder}"))));
        item_response(self.client.post_empty(&url))
    }

    /// Creates a folder item in a list, then renames it so its title and
    /// leaf name match `folder`.
    pub fn create_folder_in_list(&self, title: &str, folder: &str) -> ItemResponse {
        if is_blank(folder) {
            return ItemResponse::failed(ApiError::InvalidInput("folder name cannot be blank".to_string()));
        }
        let entity_type = match self.entity_type(title) {
            Ok(entity_type) => entity_type,
            Err(err) => return ItemResponse::failed(err),
        };
        let values = [
            ItemValue::new("Title", folder),
            ItemValue::new("FileLeafRef", folder),
            ItemValue::new("FileSystemObjectType", "1"),
            ItemValue::new("ContentTypeId", "0x0120"),
        ];
        let created = item_response(self.post_item(title, &entity_type, &values));

        let item_id = created
            .item
            .as_ref()
            .and_then(|item| item.get("Id").or_else(|| item.get("ID")))
            .and_then(Value::as_i64);
        if let Some(item_id) = item_id {
            let rename = [ItemValue::new("Title", folder), ItemValue::new("FileLeafRef", folder)];
            let url = self.client.list_url(title, &format!("/items({item_id})"));
            let patched = self.client.patch(&url, &item_body(&entity_type, &rename));
            if !patched.ok {
                warn!(
                    source = %self.client.log_source(),
                    list = title,
                    folder,
                    error = %patched.error_or_status(),
                    "folder created but not renamed"
                );
            }
        }
        created
    }

    /// Raw lookup of every list built on `template`.
    pub fn by_base_template(&self, template: BaseTemplate) -> Envelope {
        let url = self
            .client
            .api_url(&format!("web/lists?{}", filter_query(&format!("BaseTemplate eq {}", template.code()))));
        self.client.get(&url)
    }

    /// Raw lookup of a list's views.
    pub fn views(&self, title: &str) -> Envelope {
        self.client.get(&self.client.list_url(title, "/views"))
    }

    /// Raw lookup of a list's content types.
    pub fn content_types(&self, title: &str) -> Envelope {
        self.client.get(&self.client.list_url(title, "/contentTypes"))
    }

    fn entity_type(&self, title: &str) -> Result<String, ApiError> {
        let list = self.get_by_title(title);
        if !list.ok {
            return Err(list.error.unwrap_or_else(|| ApiError::InvalidInput(title.to_string())));
        }
        list.details
            .map(|info| info.list_item_entity_type_full_name)
            .ok_or_else(|| ApiError::NotFound {
                kind: "list",
                title: title.to_string(),
            })
    }

    fn post_item(&self, title: &str, entity_type: &str, values: &[ItemValue]) -> Envelope {
        let url = self.client.list_url(title, "/items");
        self.client.post(&url, &item_body(entity_type, values))
    }
}

fn top_query(row_count: u32) -> String {
    if row_count > 0 {
        format!("$top={row_count}")
    } else {
        String::new()
    }
}

fn item_body(entity_type: &str, values: &[ItemValue]) -> String {
    let mut body = Map::new();
    body.insert("__metadata".to_string(), serde_json::json!({ "type": entity_type }));
    for value in values {
        body.insert(value.field_name.clone(), value.field_value.clone());
    }
    Value::Object(body).to_string()
}

fn items_page(envelope: &Envelope) -> ItemsPage {
    match envelope.parse::<ODataCollection<Value>>() {
        Ok(page) => ItemsPage {
            ok: true,
            items: page.value,
            next_link: page.next_link,
            error: None,
        },
        Err(err) => ItemsPage::failed(err),
    }
}

fn item_response(envelope: Envelope) -> ItemResponse {
    if envelope.ok {
        ItemResponse {
            ok: true,
            item: envelope.body,
            error: None,
        }
    } else {
        ItemResponse::failed(envelope.error_or_status())
    }
}
