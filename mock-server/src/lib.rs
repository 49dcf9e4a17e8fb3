//! In-memory stand-in for the SharePoint REST endpoints used by the client.
//!
//! Every request under `/_api/` is recorded, then dispatched on its parsed
//! path. Errors carry the service's `odata.error` body.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};

pub mod odata;
pub mod site;

use odata::{segments, Filter, Segment};
pub use site::{Field, Group, RecordedRequest, Site, SpList, User, View};

pub type Db = Arc<RwLock<Site>>;

pub fn app() -> Router {
    app_with_site(Arc::new(RwLock::new(Site::new())))
}

pub fn app_with_site(db: Db) -> Router {
    Router::new()
        .route("/_api/{*rest}", get(handle).post(handle))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_site(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_site(db)).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Get,
    Post,
    Merge,
}

struct ApiRequest {
    verb: Verb,
    /// Percent-decoded path below `/_api/`.
    path: String,
    /// The same path as sent, still encoded. Continuation links reuse it.
    raw_path: String,
    query: HashMap<String, String>,
    /// Encoded value of the `$filter` pair as sent.
    raw_filter: Option<String>,
    host: String,
    if_match: bool,
    body: String,
}

impl ApiRequest {
    fn json_body(&self) -> Result<Value, Failure> {
        serde_json::from_str(&self.body).map_err(|e| Failure::bad_request(format!("invalid JSON body: {e}")))
    }
}

enum Reply {
    Json(StatusCode, Value),
    NoContent,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Reply::Json(StatusCode::OK, body)
    }

    fn created(body: Value) -> Self {
        Reply::Json(StatusCode::CREATED, body)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(status, body) => (status, Json(body)).into_response(),
            Reply::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

#[derive(Debug)]
struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = json!({
            "odata.error": {
                "code": "-1, Microsoft.SharePoint.SPException",
                "message": { "lang": "en-US", "value": self.message }
            }
        });
        (self.status, Json(body)).into_response()
    }
}

async fn handle(
    method: Method,
    State(db): State<Db>,
    headers: HeaderMap,
    uri: Uri,
    Path(rest): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let tunnelled = header_value("x-http-method").map(|v| v.to_ascii_uppercase());
    let verb = match tunnelled.as_deref() {
        _ if method == Method::GET => Verb::Get,
        Some("MERGE") | Some("PATCH") => Verb::Merge,
        _ => Verb::Post,
    };
    let request = ApiRequest {
        verb,
        path: rest,
        raw_path: uri.path().strip_prefix("/_api/").unwrap_or(uri.path()).to_string(),
        query,
        raw_filter: uri.query().and_then(raw_filter),
        host: header_value(header::HOST.as_str()).unwrap_or_else(|| "localhost".to_string()),
        if_match: header_value("if-match").is_some(),
        body,
    };

    let mut site = db.write().await;
    let recorded_method = match (verb, tunnelled) {
        (Verb::Merge, Some(tunnelled)) => tunnelled,
        (Verb::Get, _) => "GET".to_string(),
        _ => "POST".to_string(),
    };
    site.requests.push(RecordedRequest {
        method: recorded_method,
        path: request.path.clone(),
    });
    debug!(verb = ?request.verb, path = %request.path, "request");

    match route(&mut site, &request) {
        Ok(reply) => reply.into_response(),
        Err(failure) => {
            warn!(status = failure.status.as_u16(), path = %request.path, message = %failure.message, "request failed");
            failure.into_response()
        }
    }
}

fn raw_filter(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        matches!(key, "$filter" | "%24filter").then(|| value.to_string())
    })
}

fn route(site: &mut Site, req: &ApiRequest) -> Result<Reply, Failure> {
    let segs = segments(&req.path);
    let names: Vec<String> = segs.iter().map(|s| s.name.to_ascii_lowercase()).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();

    match (req.verb, names.as_slice()) {
        (Verb::Get, ["web", "lists"]) => page(req, site.lists.iter().map(SpList::to_json).collect()),
        (Verb::Post, ["web", "lists"]) => create_list(site, req),
        (_, ["web", "lists", "getbytitle", ..]) => {
            let title = segs[2]
                .literal()
                .ok_or_else(|| Failure::bad_request("getByTitle expects a quoted title"))?;
            let Site { lists, site_fields, .. } = site;
            let list = lists
                .iter_mut()
                .find(|l| l.title.eq_ignore_ascii_case(&title))
                .ok_or_else(|| Failure::not_found(format!("List '{title}' does not exist at site.")))?;
            list_route(list, site_fields, req, &segs[3..], &names[3..])
        }
        (Verb::Get, ["web", "fields"]) => page(req, site.site_fields.iter().map(to_json).collect()),
        (Verb::Post, ["web", "fields"]) => {
            let field = new_field(&req.json_body()?, true)?;
            add_field(&mut site.site_fields, field)
        }
        (Verb::Post, ["web", "fields", "addfield"]) => {
            let field = new_field(&parameters(req)?, true)?;
            add_field(&mut site.site_fields, field)
        }
        (Verb::Get, ["web", "currentuser"]) => Ok(Reply::ok(to_json(&site.current_user))),
        (Verb::Get, ["web", "sitegroups", "getbyname", "users"]) => {
            let name = segs[2].literal().unwrap_or_default();
            let group = site
                .groups
                .iter()
                .find(|g| g.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| Failure::not_found("Group cannot be found."))?;
            page(req, group.users.iter().map(to_json).collect())
        }
        (Verb::Post, ["web", "folders", "add"]) => add_folder(site, &segs[2]),
        (Verb::Get, ["web", "maptoicon"]) => map_to_icon(&segs[1]),
        _ => Err(Failure::not_found(format!("Resource '{}' not found", req.path))),
    }
}

fn list_route(
    list: &mut SpList,
    site_fields: &[Field],
    req: &ApiRequest,
    segs: &[Segment],
    names: &[&str],
) -> Result<Reply, Failure> {
    let arg = segs.first().and_then(|s| s.args.as_ref());
    match (req.verb, names) {
        (Verb::Get, []) => Ok(Reply::ok(list.to_json())),
        (Verb::Get, ["items"]) if arg.is_none() => {
            page(req, list.items.iter().cloned().map(Value::Object).collect())
        }
        (Verb::Get, ["items"]) => {
            let id = item_id(&segs[0])?;
            list.item_mut(id)
                .map(|item| Reply::ok(Value::Object(item.clone())))
                .ok_or_else(|| Failure::not_found(format!("Item does not exist. id: {id}")))
        }
        (Verb::Post, ["items"]) if arg.is_none() => create_item(list, req),
        (Verb::Merge, ["items"]) => update_item(list, req, item_id(&segs[0])?),
        (Verb::Get, ["files"]) if arg.is_none() => page(req, list.files.clone()),
        (Verb::Get, ["files"]) => {
            let id = segs[0].literal().unwrap_or_default();
            list.files
                .iter()
                .find(|f| f["UniqueId"].as_str().is_some_and(|u| u.eq_ignore_ascii_case(&id)))
                .map(|f| Reply::ok(f.clone()))
                .ok_or_else(|| Failure::not_found("File Not Found."))
        }
        (Verb::Get, ["fields"]) => page(req, list.fields.iter().map(to_json).collect()),
        (Verb::Post, ["fields"]) => {
            let field = new_field(&req.json_body()?, false)?;
            add_field(&mut list.fields, field)
        }
        (Verb::Post, ["fields", "addfield"]) => {
            let field = new_field(&parameters(req)?, false)?;
            add_field(&mut list.fields, field)
        }
        (Verb::Post, ["fields", "createfieldasxml"]) => {
            let params = parameters(req)?;
            let schema = params["SchemaXml"].as_str().unwrap_or_default();
            let field = site_fields
                .iter()
                .find(|f| f.schema_xml == schema)
                .cloned()
                .ok_or_else(|| Failure::bad_request("SchemaXml does not match a site column"))?;
            add_field(&mut list.fields, field)
        }
        (Verb::Get, ["views"]) => page(
            req,
            list.views.iter().map(|v| json!({ "Id": v.id, "Title": v.title })).collect(),
        ),
        (Verb::Get, ["views", "getbytitle", "viewfields"]) => {
            let view = view_of(list, &segs[1])?;
            let schema = view
                .fields
                .iter()
                .map(|name| format!(r#"<FieldRef Name="{name}" />"#))
                .collect::<String>();
            Ok(Reply::ok(json!({ "Items": view.fields, "SchemaXml": schema })))
        }
        (Verb::Post, ["views", "getbytitle", "viewfields", "addviewfield"]) => {
            let internal_name = segs[3].literal().unwrap_or_default();
            if !list.fields.iter().any(|f| f.internal_name == internal_name) {
                return Err(Failure::not_found(format!("Column '{internal_name}' does not exist.")));
            }
            let view = view_of(list, &segs[1])?;
            if !view.fields.contains(&internal_name) {
                view.fields.push(internal_name);
            }
            Ok(Reply::ok(json!({ "odata.null": true })))
        }
        (Verb::Get, ["contenttypes"]) => page(
            req,
            vec![
                json!({ "Name": "Item", "StringId": "0x01" }),
                json!({ "Name": "Folder", "StringId": "0x0120" }),
            ],
        ),
        _ => Err(Failure::not_found(format!("Resource '{}' not found", req.path))),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Applies `$filter`, `$skip` and `$top` and wraps the result in a
/// `{"value": [...]}` page, with a continuation link when rows remain.
fn page(req: &ApiRequest, entries: Vec<Value>) -> Result<Reply, Failure> {
    let filter = match req.query.get("$filter") {
        Some(raw) => Some(Filter::parse(raw).ok_or_else(|| Failure::bad_request(format!("unsupported $filter '{raw}'")))?),
        None => None,
    };
    let matching: Vec<Value> = entries
        .into_iter()
        .filter(|e| filter.as_ref().map_or(true, |f| f.matches(e)))
        .collect();

    let skip = query_number(req, "$skip")?.unwrap_or(0);
    let top = query_number(req, "$top")?;
    let total = matching.len();
    let value: Vec<Value> = matching.into_iter().skip(skip).take(top.unwrap_or(usize::MAX)).collect();

    let mut body = json!({ "value": value });
    if let Some(top) = top.filter(|top| skip + top < total) {
        let mut link = format!("http://{}/_api/{}?$top={top}&$skip={}", req.host, req.raw_path, skip + top);
        if let Some(raw) = &req.raw_filter {
            link.push_str(&format!("&$filter={raw}"));
        }
        body["odata.nextLink"] = Value::String(link);
    }
    Ok(Reply::ok(body))
}

fn query_number(req: &ApiRequest, key: &str) -> Result<Option<usize>, Failure> {
    req.query
        .get(key)
        .map(|raw| raw.parse().map_err(|_| Failure::bad_request(format!("{key} must be a number"))))
        .transpose()
}

fn parameters(req: &ApiRequest) -> Result<Value, Failure> {
    match req.json_body()?.get("parameters") {
        Some(params) if params.is_object() => Ok(params.clone()),
        _ => Err(Failure::bad_request("body must carry a 'parameters' object")),
    }
}

fn item_id(seg: &Segment) -> Result<i64, Failure> {
    seg.number().ok_or_else(|| Failure::bad_request("item id must be a number"))
}

fn view_of<'a>(list: &'a mut SpList, seg: &Segment) -> Result<&'a mut View, Failure> {
    let title = seg.literal().unwrap_or_default();
    list.view_mut(&title)
        .ok_or_else(|| Failure::not_found(format!("View '{title}' does not exist.")))
}

fn create_list(site: &mut Site, req: &ApiRequest) -> Result<Reply, Failure> {
    let body = req.json_body()?;
    let title = body["Title"].as_str().filter(|t| !t.trim().is_empty());
    let Some(title) = title else {
        return Err(Failure::bad_request("Title is required"));
    };
    if site.list(title).is_some() {
        return Err(Failure::conflict(
            "A list, survey, discussion board, or document library with the specified title already exists in this Web site.",
        ));
    }
    let base_template = body["BaseTemplate"].as_i64().unwrap_or(100);
    let description = body["Description"].as_str().unwrap_or_default();
    let list = SpList::new(title, base_template, description);
    let created = list.to_json();
    site.lists.push(list);
    site.lists_created += 1;
    Ok(Reply::created(created))
}

fn new_field(body: &Value, site_scope: bool) -> Result<Field, Failure> {
    let Some(title) = body["Title"].as_str().filter(|t| !t.trim().is_empty()) else {
        return Err(Failure::bad_request("Title is required"));
    };
    if !site_scope && body.get("Group").is_some() {
        return Err(Failure::bad_request(
            "The property 'Group' cannot be set on a list column.",
        ));
    }
    let mut field = Field::new(title, body["FieldTypeKind"].as_i64().unwrap_or(2));
    field.group = body["Group"].as_str().unwrap_or_default().to_string();
    field.required = body["Required"].as_bool().unwrap_or(false);
    Ok(field)
}

fn add_field(fields: &mut Vec<Field>, field: Field) -> Result<Reply, Failure> {
    if fields.iter().any(|f| f.title.eq_ignore_ascii_case(&field.title)) {
        return Err(Failure::conflict(format!(
            "A duplicate field name \"{}\" was found.",
            field.internal_name
        )));
    }
    let created = to_json(&field);
    fields.push(field);
    Ok(Reply::created(created))
}

const BUILTIN_ITEM_KEYS: [&str; 4] = ["Title", "FileLeafRef", "FileSystemObjectType", "ContentTypeId"];

/// Column values of an item payload, checked against the list's entity type
/// and columns.
fn item_values(list: &SpList, req: &ApiRequest) -> Result<Map<String, Value>, Failure> {
    let Value::Object(mut body) = req.json_body()? else {
        return Err(Failure::bad_request("item body must be an object"));
    };
    let entity_type = body
        .remove("__metadata")
        .and_then(|m| m.get("type").and_then(Value::as_str).map(str::to_string));
    if entity_type.as_deref() != Some(list.entity_type.as_str()) {
        return Err(Failure::bad_request(format!(
            "A type named '{}' could not be resolved by the model.",
            entity_type.unwrap_or_default()
        )));
    }
    if let Some(unknown) = body
        .keys()
        .find(|k| !BUILTIN_ITEM_KEYS.contains(&k.as_str()) && !list.fields.iter().any(|f| &f.internal_name == *k))
    {
        return Err(Failure::bad_request(format!(
            "The property '{unknown}' does not exist on type '{}'.",
            list.entity_type
        )));
    }
    Ok(body)
}

fn create_item(list: &mut SpList, req: &ApiRequest) -> Result<Reply, Failure> {
    let values = item_values(list, req)?;
    let created = list.add_item(values);
    Ok(Reply::created(Value::Object(created)))
}

fn update_item(list: &mut SpList, req: &ApiRequest, id: i64) -> Result<Reply, Failure> {
    if !req.if_match {
        return Err(Failure::new(
            StatusCode::PRECONDITION_FAILED,
            "The request ETag value does not match the object's ETag value.",
        ));
    }
    let values = item_values(list, req)?;
    let item = list
        .item_mut(id)
        .ok_or_else(|| Failure::not_found(format!("Item does not exist. id: {id}")))?;
    item.extend(values);
    Ok(Reply::NoContent)
}

fn add_folder(site: &mut Site, seg: &Segment) -> Result<Reply, Failure> {
    let target = seg.literal().unwrap_or_default();
    let Some((library, folder)) = target.split_once('/').filter(|(_, f)| !f.is_empty()) else {
        return Err(Failure::bad_request("folder url must be '<library>/<folder>'"));
    };
    let list = site
        .lists
        .iter_mut()
        .filter(|l| l.base_template != 100)
        .find(|l| l.title.eq_ignore_ascii_case(library) || l.title.replace(' ', "").eq_ignore_ascii_case(library))
        .ok_or_else(|| Failure::not_found("File Not Found."))?;
    if !list.folders.iter().any(|f| f == folder) {
        list.folders.push(folder.to_string());
    }
    Ok(Reply::ok(json!({
        "Name": folder,
        "ServerRelativeUrl": format!("/{library}/{folder}"),
        "ItemCount": 0,
        "Exists": true,
    })))
}

fn map_to_icon(seg: &Segment) -> Result<Reply, Failure> {
    let file_name = seg
        .named("filename")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Failure::bad_request("filename is required"))?;
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let icon = match extension.as_str() {
        "docx" | "doc" => "icdocx.png",
        "xlsx" | "xls" => "icxlsx.png",
        "pptx" | "ppt" => "icpptx.png",
        "pdf" => "icpdf.png",
        "txt" => "ictxt.gif",
        "zip" => "iczip.gif",
        _ => "icgen.gif",
    };
    Ok(Reply::ok(json!({ "value": icon })))
}
