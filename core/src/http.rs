//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `SpClient::build_*` produces an
//! `HttpRequest`; a `Transport` executes it and hands back an `HttpResponse`
//! (or a `TransportError` when no response was received). Everything that
//! interprets the response lives in `Envelope::from_response`, so request
//! construction and response parsing stay deterministic and testable without
//! a network.
//!
//! SharePoint's MERGE and PATCH verbs are tunnelled through POST with an
//! `x-http-method` override header, so only GET and POST exist on the wire.

use std::sync::Arc;

use thiserror::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute, percent-encoded URL.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Returns the value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The request was not answered by the remote (connect, DNS, timeout, or an
/// unreadable body).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Executes `HttpRequest` values against the network.
///
/// Implementations must not retry and must return non-2xx responses as
/// `Ok(HttpResponse)`; only failures that produced no remote status are
/// `Err`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Executes a group of requests. The default runs them one after another
    /// in order; transports with a native batching primitive override this.
    fn execute_batch(&self, requests: &[HttpRequest]) -> Vec<Result<HttpResponse, TransportError>> {
        requests.iter().map(|request| self.execute(request)).collect()
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }

    fn execute_batch(&self, requests: &[HttpRequest]) -> Vec<Result<HttpResponse, TransportError>> {
        (**self).execute_batch(requests)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }

    fn execute_batch(&self, requests: &[HttpRequest]) -> Vec<Result<HttpResponse, TransportError>> {
        (**self).execute_batch(requests)
    }
}
