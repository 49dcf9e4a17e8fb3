//! Transport adapter: request builders plus the four verbs.
//!
//! # Design
//! `SpClient` holds a `SiteConfig` and a `Transport` and nothing else; it
//! carries no mutable state between calls. Each verb is split into a pure
//! `build_*` method that produces an `HttpRequest` and a call that executes
//! it and normalizes the result through `Envelope::from_response`. One call
//! is one round trip, with no retries.
//!
//! The resource accessors (`lists()`, `fields()`, `users()`, `icons()`) are
//! thin views borrowing the client, so they share its transport and config.

use tracing::{debug, warn};

use crate::batch::Batch;
use crate::config::SiteConfig;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::fields::Fields;
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::icons::Icons;
use crate::lists::Lists;
use crate::users::Users;
use crate::util::{normalize_url, odata_path_literal};

const ACCEPT: &str = "application/json;odata=nometadata";
const CONTENT_TYPE: &str = "application/json;odata=verbose";

/// Client for one SharePoint web.
#[derive(Debug, Clone)]
pub struct SpClient<T> {
    config: SiteConfig,
    transport: T,
}

impl<T> SpClient<T> {
    pub fn new(web_url: &str, transport: T) -> Self {
        Self::with_config(SiteConfig::new(web_url), transport)
    }

    /// Trailing slashes on `config.web_url` are dropped.
    pub fn with_config(mut config: SiteConfig, transport: T) -> Self {
        config.web_url = config.web_url.trim_end_matches('/').to_string();
        Self { config, transport }
    }

    pub fn web_url(&self) -> &str {
        &self.config.web_url
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn log_source(&self) -> &str {
        &self.config.log_source
    }

    /// `{web_url}/_api/{path}`
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/_api/{path}", self.config.web_url)
    }

    /// `{web_url}/_api/web/lists/getByTitle('{title}'){suffix}`
    pub(crate) fn list_url(&self, title: &str, suffix: &str) -> String {
        format!(
            "{}/_api/web/lists/getByTitle({}){suffix}",
            self.config.web_url,
            odata_path_literal(title)
        )
    }

    pub fn build_get(&self, url: &str) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: normalize_url(url)?,
            headers: vec![header("accept", ACCEPT)],
            body: None,
        })
    }

    /// POST with an optional JSON body.
    pub fn build_post(&self, url: &str, body: Option<&str>) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![header("accept", ACCEPT)];
        if body.is_some() {
            headers.push(header("content-type", CONTENT_TYPE));
        }
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: normalize_url(url)?,
            headers,
            body: body.map(str::to_string),
        })
    }

    /// Unconditional MERGE update, tunnelled through POST.
    pub fn build_merge(&self, url: &str, body: &str) -> Result<HttpRequest, ApiError> {
        self.build_overwrite(url, body, "MERGE")
    }

    /// Unconditional PATCH update, tunnelled through POST.
    pub fn build_patch(&self, url: &str, body: &str) -> Result<HttpRequest, ApiError> {
        self.build_overwrite(url, body, "PATCH")
    }

    fn build_overwrite(&self, url: &str, body: &str, verb: &str) -> Result<HttpRequest, ApiError> {
        let mut request = self.build_post(url, Some(body))?;
        request.headers.push(header("if-match", "*"));
        request.headers.push(header("x-http-method", verb));
        Ok(request)
    }
}

impl<T: Transport> SpClient<T> {
    /// Executes an already-built request.
    pub fn send(&self, request: &HttpRequest) -> Envelope {
        debug!(
            source = %self.config.log_source,
            method = request.method.as_str(),
            url = %request.url,
            "sending request"
        );
        match self.transport.execute(request) {
            Ok(response) => {
                let envelope = Envelope::from_response(response);
                if let Some(err) = &envelope.error {
                    warn!(source = %self.config.log_source, url = %request.url, error = %err, "request failed");
                }
                envelope
            }
            Err(err) => {
                warn!(source = %self.config.log_source, url = %request.url, error = %err, "transport failed");
                Envelope::from_transport_error(err)
            }
        }
    }

    pub fn get(&self, url: &str) -> Envelope {
        self.dispatch(self.build_get(url))
    }

    pub fn post(&self, url: &str, body: &str) -> Envelope {
        self.dispatch(self.build_post(url, Some(body)))
    }

    pub fn post_empty(&self, url: &str) -> Envelope {
        self.dispatch(self.build_post(url, None))
    }

    pub fn merge(&self, url: &str, body: &str) -> Envelope {
        self.dispatch(self.build_merge(url, body))
    }

    pub fn patch(&self, url: &str, body: &str) -> Envelope {
        self.dispatch(self.build_patch(url, body))
    }

    pub(crate) fn dispatch(&self, request: Result<HttpRequest, ApiError>) -> Envelope {
        match request {
            Ok(request) => self.send(&request),
            Err(err) => Envelope::local_failure(err),
        }
    }

    pub fn lists(&self) -> Lists<'_, T> {
        Lists::new(self)
    }

    pub fn fields(&self) -> Fields<'_, T> {
        Fields::new(self)
    }

    pub fn users(&self) -> Users<'_, T> {
        Users::new(self)
    }

    pub fn icons(&self) -> Icons<'_, T> {
        Icons::new(self)
    }

    pub fn batch(&self) -> Batch<'_, T> {
        Batch::new(self)
    }
}

fn header(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}
