//! Client and logger configuration.
//!
//! Both structs deserialize from JSON with defaults for everything except
//! the site URL, so a host can keep them in its own settings file.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::types::ShapePolicy;

fn default_log_source() -> String {
    "sprest".to_string()
}

/// Settings for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute URL of the web, e.g. `https://contoso.sharepoint.com/sites/dev`.
    pub web_url: String,
    /// Value of the `source` field on every tracing event.
    #[serde(default = "default_log_source")]
    pub log_source: String,
    #[serde(default)]
    pub shape_policy: ShapePolicy,
}

impl SiteConfig {
    pub fn new(web_url: &str) -> Self {
        Self {
            web_url: web_url.trim_end_matches('/').to_string(),
            log_source: default_log_source(),
            shape_policy: ShapePolicy::default(),
        }
    }

    pub fn with_shape_policy(mut self, policy: ShapePolicy) -> Self {
        self.shape_policy = policy;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        let mut config: Self = serde_json::from_str(raw).map_err(|e| ApiError::Deserialization(e.to_string()))?;
        config.web_url = config.web_url.trim_end_matches('/').to_string();
        Ok(config)
    }
}

fn default_list_title() -> String {
    "Error Logs".to_string()
}

fn default_type_column() -> String {
    "Error Type".to_string()
}

fn default_description_column() -> String {
    "Error Description".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

/// Settings for `ListLogger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_list_title")]
    pub list_title: String,
    #[serde(default = "default_type_column")]
    pub type_column: String,
    #[serde(default = "default_description_column")]
    pub description_column: String,
    /// Debug records are only written when set.
    #[serde(default)]
    pub write_debug: bool,
    /// Failed validations tolerated before the logger stops trying.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            list_title: default_list_title(),
            type_column: default_type_column(),
            description_column: default_description_column(),
            write_debug: false,
            max_attempts: default_max_attempts(),
        }
    }
}
