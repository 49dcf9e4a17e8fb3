//! Best-effort logging into a SharePoint list.
//!
//! # Design
//! Before the first write, `ListLogger` checks that the target list exists
//! and has its two expected columns. A successful check is remembered for
//! the lifetime of the logger; a failed one counts as an attempt, and once
//! `max_attempts` checks have failed every later call fails locally without
//! touching the network.
//!
//! The validation state sits behind a mutex that is held for the whole
//! check, so concurrent callers never validate twice. Every outcome, failed
//! or not, comes back as a `LogOutcome`; logging never panics and never
//! returns an error into the caller's own control flow.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::client::SpClient;
use crate::config::LoggerConfig;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::Transport;

/// Severity stored in the type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Debug,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Debug => "DEBUG",
        }
    }
}

/// One log entry, written as one list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub source_method: String,
    pub severity: Severity,
    pub message: String,
}

/// What happened to a log call.
#[derive(Debug, Clone)]
pub enum LogOutcome {
    /// The item was created.
    Written(Envelope),
    /// Debug record while debug writing is off.
    Skipped,
    Failed(ApiError),
}

impl LogOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, LogOutcome::Written(_))
    }
}

/// Entity type and column internal names of a validated log list.
#[derive(Debug, Clone)]
struct LogTarget {
    entity_type: String,
    type_column: String,
    description_column: String,
}

#[derive(Debug, Default)]
struct ValidationState {
    target: Option<LogTarget>,
    attempts: u32,
}

/// Writes `LogRecord`s into the list named by `LoggerConfig::list_title`.
pub struct ListLogger<T> {
    client: SpClient<T>,
    config: LoggerConfig,
    state: Mutex<ValidationState>,
}

impl<T> ListLogger<T> {
    pub fn new(client: SpClient<T>, config: LoggerConfig) -> Self {
        Self {
            client,
            config,
            state: Mutex::new(ValidationState::default()),
        }
    }

    pub fn client(&self) -> &SpClient<T> {
        &self.client
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Failed validations so far.
    pub fn attempts(&self) -> u32 {
        self.state.lock().attempts
    }

    pub fn is_validated(&self) -> bool {
        self.state.lock().target.is_some()
    }
}

impl<T: Transport> ListLogger<T> {
    pub fn log_error(&self, source_method: &str, message: &str) -> LogOutcome {
        self.log(&LogRecord {
            source_method: source_method.to_string(),
            severity: Severity::Error,
            message: message.to_string(),
        })
    }

    /// Writes only when `LoggerConfig::write_debug` is set.
    pub fn log_debug(&self, source_method: &str, message: &str) -> LogOutcome {
        self.log(&LogRecord {
            source_method: source_method.to_string(),
            severity: Severity::Debug,
            message: message.to_string(),
        })
    }

    pub fn log(&self, record: &LogRecord) -> LogOutcome {
        if record.severity == Severity::Debug && !self.config.write_debug {
            return LogOutcome::Skipped;
        }

        let target = match self.validated_target() {
            Ok(target) => target,
            Err(err) => {
                warn!(source = %self.client.log_source(), list = %self.config.list_title, error = %err, "log list unavailable");
                return LogOutcome::Failed(err);
            }
        };

        let mut body = Map::new();
        body.insert("__metadata".to_string(), serde_json::json!({ "type": target.entity_type }));
        body.insert("Title".to_string(), Value::from(record.source_method.as_str()));
        body.insert(target.type_column, Value::from(record.severity.as_str()));
        body.insert(target.description_column, Value::from(record.message.as_str()));

        let url = self.client.list_url(&self.config.list_title, "/items");
        let envelope = self.client.post(&url, &Value::Object(body).to_string());
        if envelope.ok {
            LogOutcome::Written(envelope)
        } else {
            LogOutcome::Failed(envelope.error_or_status())
        }
    }

    fn validated_target(&self) -> Result<LogTarget, ApiError> {
        let mut state = self.state.lock();
        if let Some(target) = &state.target {
            return Ok(target.clone());
        }
        if state.attempts >= self.config.max_attempts {
            return Err(ApiError::ValidationExhausted {
                attempts: state.attempts,
            });
        }

        match self.validate() {
            Ok(target) => {
                debug!(source = %self.client.log_source(), list = %self.config.list_title, "log list validated");
                state.target = Some(target.clone());
                Ok(target)
            }
            Err(err) => {
                state.attempts += 1;
                Err(err)
            }
        }
    }

    fn validate(&self) -> Result<LogTarget, ApiError> {
        let list_title = &self.config.list_title;
        let list = self.client.lists().get_by_title(list_title);
        if !list.ok {
            return Err(list.error.unwrap_or_else(|| ApiError::SchemaInvalid(format!("lookup of '{list_title}' failed"))));
        }
        let Some(info) = list.details else {
            return Err(ApiError::SchemaInvalid(format!("list '{list_title}' does not exist")));
        };

        let description_column = self.column(&self.config.description_column)?;
        let type_column = self.column(&self.config.type_column)?;
        Ok(LogTarget {
            entity_type: info.list_item_entity_type_full_name,
            type_column,
            description_column,
        })
    }

    /// Internal name of a required column of the log list.
    fn column(&self, title: &str) -> Result<String, ApiError> {
        let list_title = &self.config.list_title;
        let field = self.client.fields().get_by_list(title, list_title);
        if !field.ok {
            return Err(field.error.unwrap_or_else(|| ApiError::SchemaInvalid(format!("lookup of '{title}' failed"))));
        }
        field
            .details
            .map(|info| info.internal_name)
            .ok_or_else(|| ApiError::SchemaInvalid(format!("column '{title}' is missing from '{list_title}'")))
    }
}
