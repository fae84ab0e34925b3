//! Template parsing and expansion
//!
//! Templates interleave literal text with `{reference}` placeholders.
//! `\{`, `\}` and `\\` escape literal braces and backslashes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RmlError, RmlResult};

/// Escapes, placeholders, and any brace left over (which is a syntax error)
static TEMPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(.)|\{([^{}\\]*)\}|[{}\\]").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Reference(String),
}

/// Parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string
    pub fn parse(template: &str) -> RmlResult<Self> {
        let invalid = |message: &str| RmlError::InvalidTemplate {
            template: template.to_string(),
            message: message.to_string(),
        };

        let mut segments = Vec::new();
        let mut text = String::new();
        let mut last = 0;

        for cap in TEMPLATE_RE.captures_iter(template) {
            let whole = cap.get(0).expect("group 0 always matches");
            text.push_str(&template[last..whole.start()]);
            last = whole.end();

            if let Some(escaped) = cap.get(1) {
                text.push_str(escaped.as_str());
            } else if let Some(reference) = cap.get(2) {
                let reference = reference.as_str();
                if reference.is_empty() {
                    return Err(invalid("empty placeholder"));
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Reference(reference.to_string()));
            } else if whole.as_str() == "\\" {
                return Err(invalid("dangling escape at end of template"));
            } else {
                return Err(invalid("unbalanced brace"));
            }
        }
        text.push_str(&template[last..]);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// The template string as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// References in placeholder order
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Reference(r) => Some(r.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Expand the template for one record
    ///
    /// `lookup` returns the lexical values of a reference. When a reference has
    /// several values, one string is produced per combination. When any
    /// reference has no value the template produces nothing at all. With
    /// `iri_safe`, substituted values are percent-encoded.
    pub fn expand<F>(&self, mut lookup: F, iri_safe: bool) -> RmlResult<Vec<String>>
    where
        F: FnMut(&str) -> RmlResult<Vec<String>>,
    {
        let mut results = vec![String::new()];

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => {
                    for result in &mut results {
                        result.push_str(text);
                    }
                }
                Segment::Reference(reference) => {
                    let values = lookup(reference)?;
                    if values.is_empty() {
                        return Ok(Vec::new());
                    }
                    let values: Vec<String> = if iri_safe {
                        values.iter().map(|v| iri_escape(v)).collect()
                    } else {
                        values
                    };
                    results = results
                        .iter()
                        .flat_map(|prefix| values.iter().map(move |v| format!("{prefix}{v}")))
                        .collect();
                }
            }
        }

        Ok(results)
    }
}

/// IRI-safe encoding of a string value for use in templates
///
/// Every character outside RFC 3987 `iunreserved` is percent-encoded as UTF-8.
pub fn iri_escape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());

    for c in value.chars() {
        if is_iunreserved(c) {
            result.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }

    result
}

fn is_iunreserved(c: char) -> bool {
    match c {
        'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' => true,
        c if c.is_ascii() => false,
        c => is_ucschar(c),
    }
}

fn is_ucschar(c: char) -> bool {
    matches!(c as u32,
        0xA0..=0xD7FF
        | 0xF900..=0xFDCF
        | 0xFDF0..=0xFFEF
        | 0x10000..=0x1FFFD
        | 0x20000..=0x2FFFD
        | 0x30000..=0x3FFFD
        | 0x40000..=0x4FFFD
        | 0x50000..=0x5FFFD
        | 0x60000..=0x6FFFD
        | 0x70000..=0x7FFFD
        | 0x80000..=0x8FFFD
        | 0x90000..=0x9FFFD
        | 0xA0000..=0xAFFFD
        | 0xB0000..=0xBFFFD
        | 0xC0000..=0xCFFFD
        | 0xD0000..=0xDFFFD
        | 0xE1000..=0xEFFFD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    type Values = HashMap<&'static str, Vec<&'static str>>;

    fn lookup(values: &Values) -> impl FnMut(&str) -> RmlResult<Vec<String>> + '_ {
        move |reference| {
            Ok(values
                .get(reference)
                .map(|vs| vs.iter().map(|v| v.to_string()).collect())
                .unwrap_or_default())
        }
    }

    #[test]
    fn test_parse_references() {
        let t = Template::parse("http://example.org/{ns}/{id}").unwrap();
        assert_eq!(t.references().collect::<Vec<_>>(), vec!["ns", "id"]);
        assert_eq!(t.as_str(), "http://example.org/{ns}/{id}");
    }

    #[test]
    fn test_references_kept_verbatim() {
        let t = Template::parse("http://ex/{ id }/{first name}").unwrap();
        assert_eq!(
            t.references().collect::<Vec<_>>(),
            vec![" id ", "first name"]
        );

        let values = HashMap::from([("id", vec!["1"]), ("first name", vec!["Ann"])]);
        assert!(t.expand(lookup(&values), false).unwrap().is_empty());
    }

    #[test]
    fn test_parse_escapes() {
        let t = Template::parse(r"\{literal\} {id}").unwrap();
        let values = HashMap::from([("id", vec!["1"])]);
        assert_eq!(t.expand(lookup(&values), false).unwrap(), vec!["{literal} 1"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Template::parse("http://ex/{id").is_err());
        assert!(Template::parse("http://ex/id}").is_err());
        assert!(Template::parse("http://ex/{}").is_err());
        assert!(Template::parse("trailing\\").is_err());
    }

    #[test]
    fn test_expand_template_simple() {
        let t = Template::parse("http://example.org/item/{id}").unwrap();
        let values = HashMap::from([("id", vec!["123"])]);
        assert_eq!(
            t.expand(lookup(&values), true).unwrap(),
            vec!["http://example.org/item/123"]
        );
    }

    #[test]
    fn test_expand_template_escaping() {
        let t = Template::parse("http://example.org/{name}").unwrap();
        let values = HashMap::from([("name", vec!["hello world/x"])]);
        assert_eq!(
            t.expand(lookup(&values), true).unwrap(),
            vec!["http://example.org/hello%20world%2Fx"]
        );
        // Literal templates keep values verbatim
        assert_eq!(
            t.expand(lookup(&values), false).unwrap(),
            vec!["http://example.org/hello world/x"]
        );
    }

    #[test]
    fn test_expand_missing_reference_produces_nothing() {
        let t = Template::parse("http://example.org/{a}/{b}").unwrap();
        let values = HashMap::from([("a", vec!["1"])]);
        assert!(t.expand(lookup(&values), true).unwrap().is_empty());
    }

    #[test]
    fn test_expand_multi_valued_cartesian() {
        let t = Template::parse("{a}-{b}").unwrap();
        let values = HashMap::from([("a", vec!["1", "2"]), ("b", vec!["x", "y"])]);
        assert_eq!(
            t.expand(lookup(&values), false).unwrap(),
            vec!["1-x", "1-y", "2-x", "2-y"]
        );
    }

    #[test]
    fn test_iri_escape_keeps_ucschar() {
        assert_eq!(iri_escape("Ghent-é"), "Ghent-é");
        assert_eq!(iri_escape("a&b=c"), "a%26b%3Dc");
        assert_eq!(iri_escape("\u{E000}"), "%EE%80%80");
    }
}
