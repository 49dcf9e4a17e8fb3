//! Blocking `Transport` backed by ureq.
//!
//! 4xx/5xx responses are returned as data rather than errors; only failures
//! that produced no response at all become `TransportError`.

use std::time::Duration;

use tracing::trace;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

/// Executes requests with a shared `ureq::Agent`.
///
/// Authentication is the host's concern: pass a bearer token or cookie with
/// `with_header` and it is added to every request.
pub struct UreqTransport {
    agent: ureq::Agent,
    default_headers: Vec<(String, String)>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Caps each call, connect to last body byte, at `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            default_headers: Vec::new(),
        }
    }

    fn headers<'r>(&'r self, req: &'r HttpRequest) -> impl Iterator<Item = (&'r str, &'r str)> {
        self.default_headers
            .iter()
            .chain(req.headers.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        trace!(method = req.method.as_str(), url = %req.url, "sending");

        let result = match req.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&req.url);
                for (name, value) in self.headers(req) {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&req.url);
                for (name, value) in self.headers(req) {
                    builder = builder.header(name, value);
                }
                match &req.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(format!("reading response body: {e}")))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_transport_error() {
        let transport = UreqTransport::with_timeout(Duration::from_secs(2));
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://127.0.0.1:1/_api/web".to_string(),
            headers: Vec::new(),
            body: None,
        };
        assert!(transport.execute(&req).is_err());
    }
}
