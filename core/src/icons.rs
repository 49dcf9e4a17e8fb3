//! Default document icons by file type.
//!
//! # Design
//! The icon depends only on the file extension, so `for_files` issues one
//! `maptoicon` lookup per distinct extension and reuses the answer for every
//! other file sharing it. Lookups run one after another; results come back
//! in input order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::client::SpClient;
use crate::envelope::NO_REMOTE_STATUS;
use crate::error::ApiError;
use crate::http::Transport;
use crate::util::{is_blank, odata_path_literal};

const IMAGE_ROOT: &str = "/_layouts/15/images/";

/// A document to resolve an icon for. Either `file_name` or `file_url` must
/// be set; the name is taken from the last URL segment otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRef {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl DocRef {
    pub fn named(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            ..Self::default()
        }
    }

    fn resolved_name(&self) -> Option<String> {
        if let Some(name) = self.file_name.as_deref().filter(|n| !is_blank(n)) {
            return Some(name.to_string());
        }
        self.file_url
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !is_blank(name))
            .map(str::to_string)
    }
}

/// Icon lookup result for one document.
#[derive(Debug, Clone)]
pub struct DocIcon {
    pub ok: bool,
    pub status_code: i32,
    pub status_text: String,
    /// Server-relative icon path, e.g. `/_layouts/15/images/icdocx.png`.
    pub image: Option<String>,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub id: Option<String>,
    pub success: bool,
    pub error: Option<ApiError>,
}

impl DocIcon {
    fn local_failure(doc: Option<&DocRef>, file_name: Option<String>, error: ApiError) -> Self {
        Self {
            ok: false,
            status_code: NO_REMOTE_STATUS,
            status_text: error.to_string(),
            image: None,
            file_name,
            file_url: doc.and_then(|d| d.file_url.clone()),
            id: doc.and_then(|d| d.id.clone()),
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Deserialize)]
struct IconName {
    value: String,
}

#[derive(Clone)]
struct Lookup {
    ok: bool,
    status_code: i32,
    status_text: String,
    image: Option<String>,
    error: Option<ApiError>,
}

/// Icon operations, borrowed from `SpClient::icons`.
pub struct Icons<'a, T> {
    client: &'a SpClient<T>,
}

impl<'a, T: Transport> Icons<'a, T> {
    pub(crate) fn new(client: &'a SpClient<T>) -> Self {
        Self { client }
    }

    /// Resolves the icon of every document in `files`.
    pub fn for_files(&self, files: &[DocRef]) -> Vec<DocIcon> {
        if files.is_empty() {
            let error = ApiError::InvalidInput("files cannot be empty".to_string());
            return vec![DocIcon::local_failure(None, None, error)];
        }

        let mut by_extension: HashMap<String, Lookup> = HashMap::new();
        files
            .iter()
            .map(|doc| {
                let Some(name) = doc.resolved_name() else {
                    let error = ApiError::InvalidInput("both file name and file url are empty".to_string());
                    return DocIcon::local_failure(Some(doc), None, error);
                };
                let lookup = by_extension
                    .entry(extension_key(&name))
                    .or_insert_with(|| self.lookup(&name))
                    .clone();
                DocIcon {
                    ok: lookup.ok,
                    status_code: lookup.status_code,
                    status_text: lookup.status_text,
                    success: lookup.image.is_some(),
                    image: lookup.image,
                    file_name: Some(name),
                    file_url: doc.file_url.clone(),
                    id: doc.id.clone(),
                    error: lookup.error,
                }
            })
            .collect()
    }

    fn lookup(&self, file_name: &str) -> Lookup {
        let url = self.client.api_url(&format!(
            "web/maptoicon(filename={}, progid='', size='3')",
            odata_path_literal(file_name)
        ));
        let envelope = self.client.get(&url);
        let (image, error) = match envelope.parse::<IconName>() {
            Ok(icon) => (Some(format!("{IMAGE_ROOT}{}", icon.value)), None),
            Err(err) => (None, Some(err)),
        };
        Lookup {
            ok: envelope.ok,
            status_code: envelope.status_code,
            status_text: envelope.status_text,
            image,
            error,
        }
    }
}

fn extension_key(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => file_name.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ok_json, response, ScriptedTransport};

    fn client() -> SpClient<ScriptedTransport> {
        SpClient::new("http://localhost:3000", ScriptedTransport::new())
    }

    #[test]
    fn empty_input_yields_single_failure() {
        let c = client();
        let icons = c.icons().for_files(&[]);
        assert_eq!(icons.len(), 1);
        assert!(!icons[0].ok);
        assert!(!icons[0].success);
        assert!(c.transport().requests().is_empty());
    }

    #[test]
    fn one_lookup_per_extension_in_input_order() {
        let c = client();
        c.transport().push(ok_json(r#"{"value":"icdocx.png"}"#));
        c.transport().push(ok_json(r#"{"value":"icxlsx.png"}"#));
        let files = [
            DocRef::named("a.docx"),
            DocRef::named("b.xlsx"),
            DocRef {
                file_url: Some("/sites/dev/Shared Documents/C.DOCX".to_string()),
                id: Some("3".to_string()),
                ..DocRef::default()
            },
        ];
        let icons = c.icons().for_files(&files);
        assert_eq!(icons.len(), 3);
        assert_eq!(icons[0].image.as_deref(), Some("/_layouts/15/images/icdocx.png"));
        assert_eq!(icons[1].image.as_deref(), Some("/_layouts/15/images/icxlsx.png"));
        assert_eq!(icons[2].image.as_deref(), Some("/_layouts/15/images/icdocx.png"));
        assert_eq!(icons[2].file_name.as_deref(), Some("C.DOCX"));
        assert_eq!(icons[2].id.as_deref(), Some("3"));
        assert!(icons.iter().all(|i| i.success));
        assert_eq!(c.transport().requests().len(), 2);
        assert_eq!(
            c.transport().requests()[0].url,
            "http://localhost:3000/_api/web/maptoicon(filename='a.docx',%20progid='',%20size='3')"
        );
    }

    #[test]
    fn nameless_entry_fails_without_request() {
        let c = client();
        c.transport().push(ok_json(r#"{"value":"icpdf.png"}"#));
        let icons = c.icons().for_files(&[DocRef::default(), DocRef::named("x.pdf")]);
        assert!(!icons[0].ok);
        assert!(icons[1].success);
        assert_eq!(c.transport().requests().len(), 1);
    }

    #[test]
    fn failed_lookup_is_reported_per_file() {
        let c = client();
        c.transport().push(response(500, "Internal Server Error", ""));
        let icons = c.icons().for_files(&[DocRef::named("x.zip")]);
        assert!(!icons[0].ok);
        assert!(!icons[0].success);
        assert_eq!(icons[0].status_code, 500);
        assert!(icons[0].error.is_some());
    }

    #[test]
    fn extension_key_ignores_case() {
        assert_eq!(extension_key("A.DocX"), "docx");
        assert_eq!(extension_key("README"), "readme");
        assert_eq!(extension_key("trailing."), "trailing.");
    }
}
