//! In-memory transport for unit tests: replays queued responses in order and
//! records every request it was asked to execute.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: HttpResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub(crate) fn push_failure(&self, message: &str) {
        self.responses.lock().push_back(Err(TransportError(message.to_string())));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted response left".to_string())))
    }
}

pub(crate) fn response(status: u16, status_text: &str, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        status_text: status_text.to_string(),
        headers: Vec::new(),
        body: body.to_string(),
    }
}

pub(crate) fn ok_json(body: &str) -> HttpResponse {
    response(200, "OK", body)
}

pub(crate) fn created_json(body: &str) -> HttpResponse {
    response(201, "Created", body)
}

pub(crate) fn no_content() -> HttpResponse {
    response(204, "No Content", "")
}

pub(crate) fn not_found(message: &str) -> HttpResponse {
    let body = serde_json::json!({
        "odata.error": { "code": "-1, System.ArgumentException", "message": { "lang": "en-US", "value": message } }
    });
    response(404, "Not Found", &body.to_string())
}

pub(crate) fn list_json(title: &str, base_template: i32) -> String {
    serde_json::json!({
        "Id": "6f1d2c1a-0000-4000-8000-000000000001",
        "Title": title,
        "BaseTemplate": base_template,
        "Description": "",
        "ListItemEntityTypeFullName": format!("SP.Data.{}ListItem", title.replace(' ', "_x0020_")),
        "ItemCount": 0
    })
    .to_string()
}

pub(crate) fn collection(items: &[String]) -> String {
    format!(r#"{{"value":[{}]}}"#, items.join(","))
}

pub(crate) fn field_json(title: &str, kind: i32) -> String {
    serde_json::json!({
        "Id": "6f1d2c1a-0000-4000-8000-000000000002",
        "Title": title,
        "InternalName": title.replace(' ', "_x0020_"),
        "FieldTypeKind": kind,
        "SchemaXml": format!("<Field DisplayName=\"{title}\" />"),
        "Group": "",
        "Required": false
    })
    .to_string()
}
