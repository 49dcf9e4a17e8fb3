//! Normalized success/failure wrapper for every network-backed call.
//!
//! # Design
//! An `Envelope` is built exactly once per round trip, either from an
//! `HttpResponse` or from a `TransportError`, and is never mutated
//! afterwards. `status_code` is `-1` whenever no remote status exists
//! (transport failure, or a local failure before any request was sent).
//!
//! Remote error messages are read from SharePoint's error envelope through a
//! typed schema; if the body does not match it, the status text is used.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpResponse, TransportError};

/// Status code used when the remote never answered.
pub const NO_REMOTE_STATUS: i32 = -1;

/// Result of one transport round trip.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub ok: bool,
    pub status_code: i32,
    pub status_text: String,
    /// Parsed JSON body, when the body was valid JSON.
    pub body: Option<Value>,
    /// Raw body text, when the body was non-empty.
    pub raw_body: Option<String>,
    pub error: Option<ApiError>,
}

#[derive(Deserialize)]
struct RemoteErrorBody {
    #[serde(rename = "odata.error", alias = "error")]
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    message: RemoteMessage,
}

#[derive(Deserialize)]
struct RemoteMessage {
    value: String,
}

impl Envelope {
    pub fn from_response(response: HttpResponse) -> Self {
        let ok = (200..300).contains(&response.status);
        let body: Option<Value> = serde_json::from_str(&response.body).ok();
        let raw_body = (!response.body.is_empty()).then_some(response.body);

        let error = (!ok).then(|| ApiError::Remote {
            status: response.status,
            message: remote_message(body.as_ref(), &response.status_text, response.status),
        });

        Self {
            ok,
            status_code: i32::from(response.status),
            status_text: response.status_text,
            body,
            raw_body,
            error,
        }
    }

    pub fn from_transport_error(err: TransportError) -> Self {
        Self::local_failure(ApiError::Transport(err.0))
    }

    /// A failure decided without a remote status.
    pub fn local_failure(error: ApiError) -> Self {
        Self {
            ok: false,
            status_code: NO_REMOTE_STATUS,
            status_text: error.to_string(),
            body: None,
            raw_body: None,
            error: Some(error),
        }
    }

    /// A success decided without a request, e.g. a write that was already
    /// in place.
    pub fn local_success(status_text: impl Into<String>) -> Self {
        Self {
            ok: true,
            status_code: NO_REMOTE_STATUS,
            status_text: status_text.into(),
            body: None,
            raw_body: None,
            error: None,
        }
    }

    /// The error of a failed envelope. Falls back to the status line if no
    /// error was recorded.
    pub fn error_or_status(&self) -> ApiError {
        self.error.clone().unwrap_or_else(|| ApiError::Remote {
            status: u16::try_from(self.status_code).unwrap_or_default(),
            message: self.status_text.clone(),
        })
    }

    /// Deserializes the body into `T`. Fails closed: a failed envelope,
    /// a missing body, or a body of the wrong shape are all errors.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if !self.ok {
            return Err(self.error_or_status());
        }
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| ApiError::Deserialization("response body is empty or not JSON".to_string()))?;
        T::deserialize(body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

fn remote_message(body: Option<&Value>, status_text: &str, status: u16) -> String {
    if let Some(parsed) = body.and_then(|b| RemoteErrorBody::deserialize(b).ok()) {
        if !parsed.error.message.value.is_empty() {
            return parsed.error.message.value;
        }
    }
    if !status_text.is_empty() {
        return status_text.to_string();
    }
    format!("request failed with status {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, status_text: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            status_text: status_text.to_string(),
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn success_keeps_parsed_and_raw_body() {
        let env = Envelope::from_response(response(200, "OK", r#"{"value":[]}"#));
        assert!(env.ok);
        assert_eq!(env.status_code, 200);
        assert_eq!(env.body.as_ref().unwrap()["value"], serde_json::json!([]));
        assert_eq!(env.raw_body.as_deref(), Some(r#"{"value":[]}"#));
        assert!(env.error.is_none());
    }

    #[test]
    fn no_content_has_no_body() {
        let env = Envelope::from_response(response(204, "No Content", ""));
        assert!(env.ok);
        assert!(env.body.is_none());
        assert!(env.raw_body.is_none());
    }

    #[test]
    fn odata_error_message_is_extracted() {
        let body = r#"{"odata.error":{"code":"-1, Microsoft.SharePoint.SPException","message":{"lang":"en-US","value":"List 'X' does not exist."}}}"#;
        let env = Envelope::from_response(response(404, "Not Found", body));
        assert!(!env.ok);
        assert_eq!(
            env.error,
            Some(ApiError::Remote {
                status: 404,
                message: "List 'X' does not exist.".to_string()
            })
        );
    }

    #[test]
    fn verbose_error_message_is_extracted() {
        let body = r#"{"error":{"code":"x","message":{"lang":"en-US","value":"Access denied."}}}"#;
        let env = Envelope::from_response(response(403, "Forbidden", body));
        assert_eq!(env.error.unwrap().to_string(), "HTTP 403: Access denied.");
    }

    #[test]
    fn unstructured_error_falls_back_to_status_text() {
        let env = Envelope::from_response(response(500, "Internal Server Error", "boom"));
        assert_eq!(
            env.error,
            Some(ApiError::Remote {
                status: 500,
                message: "Internal Server Error".to_string()
            })
        );
    }

    #[test]
    fn non_2xx_without_status_text_still_has_message() {
        let env = Envelope::from_response(response(502, "", ""));
        let message = env.error.unwrap().to_string();
        assert!(message.contains("502"));
    }

    #[test]
    fn transport_error_uses_reserved_status() {
        let env = Envelope::from_transport_error(TransportError("connection refused".to_string()));
        assert!(!env.ok);
        assert_eq!(env.status_code, NO_REMOTE_STATUS);
        assert_eq!(env.error, Some(ApiError::Transport("connection refused".to_string())));
    }

    #[test]
    fn parse_fails_closed_on_wrong_shape() {
        #[derive(Debug, Deserialize)]
        struct Needs {
            #[allow(dead_code)]
            value: Vec<u32>,
        }
        let env = Envelope::from_response(response(200, "OK", r#"{"other":1}"#));
        assert!(matches!(env.parse::<Needs>(), Err(ApiError::Deserialization(_))));
    }

    #[test]
    fn parse_of_failed_envelope_returns_its_error() {
        let env = Envelope::from_response(response(404, "Not Found", ""));
        assert!(matches!(
            env.parse::<Value>(),
            Err(ApiError::Remote { status: 404, .. })
        ));
    }
}
