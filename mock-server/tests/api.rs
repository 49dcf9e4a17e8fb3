use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with_site, Db, Site};
use serde_json::Value;
use tokio::sync::RwLock;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json;odata=verbose")
        .body(body.to_string())
        .unwrap()
}

fn merge(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json;odata=verbose")
        .header("if-match", "*")
        .header("x-http-method", "MERGE")
        .body(body.to_string())
        .unwrap()
}

fn shared_site() -> (Db, Router) {
    let db: Db = Arc::new(RwLock::new(Site::new()));
    (db.clone(), app_with_site(db))
}

const TASKS: &str = r#"{"__metadata":{"type":"SP.List"},"Title":"Tasks","BaseTemplate":100,"Description":"","AllowContentTypes":true,"ContentTypesEnabled":true,"EnableFolderCreation":false}"#;

// --- lists ---

#[tokio::test]
async fn missing_list_filter_is_empty_collection() {
    let resp = app()
        .oneshot(get("/_api/web/lists?$filter=Title%20eq%20%27Tasks%27"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["value"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn missing_list_by_title_is_odata_error() {
    let resp = app()
        .oneshot(get("/_api/web/lists/getByTitle('Nope')/items"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["odata.error"]["message"]["value"], "List 'Nope' does not exist at site.");
}

#[tokio::test]
async fn create_list_returns_201_with_entity_type() {
    let (db, app) = shared_site();
    let resp = app.oneshot(post("/_api/web/lists", TASKS)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["Title"], "Tasks");
    assert_eq!(body["BaseTemplate"], 100);
    assert_eq!(body["ListItemEntityTypeFullName"], "SP.Data.TasksListItem");
    assert_eq!(db.read().await.lists_created, 1);
}

#[tokio::test]
async fn encoded_titles_are_decoded() {
    let (db, app) = shared_site();
    db.write().await.add_list("C# Notes", 100);

    let resp = app
        .clone()
        .oneshot(get("/_api/web/lists?%24filter=Title+eq+%27C%23+Notes%27"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["value"].as_array().unwrap().len(), 1);

    let resp = app
        .oneshot(get("/_api/web/lists/getByTitle('C%23%20Notes')/items"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_endpoint_is_404() {
    let resp = app().oneshot(get("/_api/web/nothing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- fields ---

#[tokio::test]
async fn site_column_can_be_copied_into_list() {
    let (db, app) = shared_site();
    db.write().await.add_list("Tasks", 100);

    let resp = app
        .clone()
        .oneshot(post(
            "/_api/web/fields",
            r#"{"__metadata":{"type":"SP.Field"},"Title":"Region","FieldTypeKind":2,"Group":"Custom"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let site_column = body_json(resp).await;
    assert_eq!(site_column["Group"], "Custom");

    let payload = serde_json::json!({
        "parameters": {
            "__metadata": { "type": "SP.XmlSchemaFieldCreationInformation" },
            "Options": 8,
            "SchemaXml": site_column["SchemaXml"],
        }
    });
    let resp = app
        .oneshot(post(
            "/_api/web/lists/getByTitle('Tasks')/fields/createfieldasxml",
            &payload.to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let site = db.read().await;
    assert!(site.list("Tasks").unwrap().field("Region").is_some());
}

#[tokio::test]
async fn add_view_field_is_idempotent() {
    let (db, app) = shared_site();
    db.write().await.add_list("Tasks", 100);

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(post(
                "/_api/web/lists/getByTitle('Tasks')/views/getByTitle('All%20Items')/ViewFields/addviewfield('Title')",
                "",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .oneshot(get("/_api/web/lists/getByTitle('Tasks')/views/getByTitle('All%20Items')/ViewFields"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["Items"], serde_json::json!(["LinkTitle", "Title"]));
}

// --- items ---

#[tokio::test]
async fn item_lifecycle() {
    let (db, app) = shared_site();
    db.write().await.add_list("Tasks", 100);

    let resp = app
        .clone()
        .oneshot(post(
            "/_api/web/lists/getByTitle('Tasks')/items",
            r#"{"__metadata":{"type":"SP.Data.TasksListItem"},"Title":"Walk dog"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["Id"], 1);

    let resp = app
        .clone()
        .oneshot(merge(
            "/_api/web/lists/getByTitle('Tasks')/items(1)",
            r#"{"__metadata":{"type":"SP.Data.TasksListItem"},"Title":"Walk cat"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = app
        .clone()
        .oneshot(get("/_api/web/lists/getByTitle('Tasks')/Items(1)"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["Title"], "Walk cat");

    let resp = app
        .oneshot(get("/_api/web/lists/getByTitle('Tasks')/Items(42)"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let site = db.read().await;
    let methods: Vec<&str> = site.requests.iter().map(|r| r.method.as_str()).collect();
    assert_eq!(methods, ["POST", "MERGE", "GET", "GET"]);
}

#[tokio::test]
async fn wrong_entity_type_is_rejected() {
    let (db, app) = shared_site();
    db.write().await.add_list("Tasks", 100);

    let resp = app
        .oneshot(post(
            "/_api/web/lists/getByTitle('Tasks')/items",
            r#"{"__metadata":{"type":"SP.Data.OtherListItem"},"Title":"x"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- users, folders, icons ---

#[tokio::test]
async fn current_user_and_group_membership() {
    let app = app();
    let resp = app.clone().oneshot(get("/_api/web/currentuser")).await.unwrap();
    assert_eq!(body_json(resp).await["Email"], "admin@contoso.com");

    let resp = app
        .clone()
        .oneshot(get("/_api/web/sitegroups/getByName('Owners')/users?$filter=Email%20eq%20%27admin@contoso.com%27"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["value"].as_array().unwrap().len(), 1);

    let resp = app
        .oneshot(get("/_api/web/sitegroups/getByName('Nobody')/users"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn folder_is_added_to_library() {
    let (db, app) = shared_site();
    db.write().await.add_list("Shared Documents", 101);

    let resp = app
        .oneshot(post("/_api/web/folders/add('Shared%20Documents/Reports')", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["Name"], "Reports");
    assert_eq!(db.read().await.list("Shared Documents").unwrap().folders, ["Reports"]);
}

#[tokio::test]
async fn icon_depends_on_extension() {
    let resp = app()
        .oneshot(get("/_api/web/maptoicon(filename='Plan.DOCX',%20progid='',%20size='3')"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["value"], "icdocx.png");
}
