//! Small pure helpers shared by the accessors.

use url::{form_urlencoded, Url};

use crate::error::ApiError;

/// Internal name of a column created from a display title: spaces become
/// `_x0020_`.
pub fn field_internal_name(title: &str) -> String {
    title.replace(' ', "_x0020_")
}

/// Quotes `value` as an OData string literal, doubling embedded quotes.
pub fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `odata_literal` for use inside a URL path. The quoted text is
/// percent-encoded, so reserved characters such as `#` or `&` stay part of
/// the value.
pub fn odata_path_literal(value: &str) -> String {
    format!("'{}'", encode_path_text(&value.replace('\'', "''")))
}

/// Like `odata_path_literal`, but keeps `/` between the segments of a
/// server-relative path.
pub fn odata_folder_literal(path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .map(|segment| encode_path_text(&segment.replace('\'', "''")))
        .collect();
    format!("'{}'", segments.join("/"))
}

/// `$filter={expression}` as a form-encoded query string.
pub fn filter_query(expression: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("$filter", expression)
        .finish()
}

fn encode_path_text(text: &str) -> String {
    // byte_serialize leaves no literal '+', so every '+' is an encoded space.
    form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// True for empty or whitespace-only strings.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Returns the decoded value of query parameter `name` in `url`.
///
/// Errors if `url` is not an absolute URL.
pub fn query_parameter(url: &str, name: &str) -> Result<Option<String>, ApiError> {
    let parsed = Url::parse(url).map_err(|e| ApiError::InvalidInput(format!("invalid url '{url}': {e}")))?;
    Ok(parsed
        .query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.into_owned()))
}

/// Parses and percent-encodes an absolute URL.
pub(crate) fn normalize_url(url: &str) -> Result<String, ApiError> {
    Url::parse(url)
        .map(String::from)
        .map_err(|e| ApiError::InvalidInput(format!("invalid url '{url}': {e}")))
}
