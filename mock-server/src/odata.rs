//! Parsing of REST paths and `$filter` expressions.

use serde_json::Value;

/// One path segment: `lists`, `getByTitle('Tasks')`, `items(3)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub args: Option<String>,
}

impl Segment {
    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// The single quoted argument, unescaped: `getByTitle('Bob''s')` gives `Bob's`.
    pub fn literal(&self) -> Option<String> {
        self.args.as_deref().and_then(unquote)
    }

    pub fn number(&self) -> Option<i64> {
        self.args.as_deref()?.trim().parse().ok()
    }

    /// A named argument of `fn(a='x', b='y')`.
    pub fn named(&self, key: &str) -> Option<String> {
        split_outside_quotes(self.args.as_deref()?, ',')
            .into_iter()
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .and_then(|(_, v)| unquote(v))
    }
}

/// Splits a decoded path into segments. Slashes inside quoted literals do
/// not split.
pub fn segments(path: &str) -> Vec<Segment> {
    split_outside_quotes(path, '/')
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(|part| match part.find('(') {
            Some(open) if part.ends_with(')') => Segment {
                name: part[..open].to_string(),
                args: Some(part[open + 1..part.len() - 1].to_string()),
            },
            _ => Segment {
                name: part.to_string(),
                args: None,
            },
        })
        .collect()
}

fn split_outside_quotes(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        if c == '\'' {
            in_quote = !in_quote;
        } else if c == separator && !in_quote {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

fn unquote(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let inner = raw.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

/// A `$filter` of the form `Field eq 'text'` or `Field eq 42`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field: String,
    value: FilterValue,
}

#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    Text(String),
    Number(i64),
}

impl Filter {
    pub fn parse(raw: &str) -> Option<Self> {
        let (field, value) = raw.split_once(" eq ")?;
        let value = match unquote(value) {
            Some(text) => FilterValue::Text(text),
            None => FilterValue::Number(value.trim().parse().ok()?),
        };
        Some(Self {
            field: field.trim().to_string(),
            value,
        })
    }

    /// Text compares case-insensitively, as the real service does.
    pub fn matches(&self, entry: &Value) -> bool {
        let Some(actual) = entry.get(&self.field) else {
            return false;
        };
        match (&self.value, actual) {
            (FilterValue::Text(want), Value::String(have)) => have.eq_ignore_ascii_case(want),
            (FilterValue::Number(want), Value::Number(have)) => have.as_i64() == Some(*want),
            (FilterValue::Number(want), Value::String(have)) => have.parse::<i64>().ok() == Some(*want),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quoted_slashes_do_not_split() {
        let segs = segments("web/folders/add('Shared Documents/Reports')");
        assert_eq!(segs.len(), 3);
        assert!(segs[2].is("ADD"));
        assert_eq!(segs[2].literal().as_deref(), Some("Shared Documents/Reports"));
    }

    #[test]
    fn literal_unescapes_doubled_quotes() {
        let segs = segments("web/lists/getByTitle('Bob''s list')/items(7)");
        assert_eq!(segs[2].literal().as_deref(), Some("Bob's list"));
        assert_eq!(segs[3].number(), Some(7));
    }

    #[test]
    fn named_arguments() {
        let segs = segments("web/maptoicon(filename='a,b.docx', progid='', size='3')");
        assert_eq!(segs[1].named("filename").as_deref(), Some("a,b.docx"));
        assert_eq!(segs[1].named("size").as_deref(), Some("3"));
        assert_eq!(segs[1].named("missing"), None);
    }

    #[test]
    fn filters_text_and_numbers() {
        let text = Filter::parse("Title eq 'tasks'").unwrap();
        assert!(text.matches(&json!({"Title": "Tasks"})));
        assert!(!text.matches(&json!({"Title": "Other"})));

        let number = Filter::parse("BaseTemplate eq 101").unwrap();
        assert!(number.matches(&json!({"BaseTemplate": 101})));
        assert!(!number.matches(&json!({"Title": "x"})));

        assert!(Filter::parse("Title gt 3").is_none());
    }
}
