//! One node of an address template

use std::fmt;

use crate::error::{TemplateError, TemplateResult};
use crate::placeholder::Placeholder;

/// Value standing for every instance of a resource type
pub const WILDCARD: &str = "*";

/// Characters escaped with a backslash inside values
const ESCAPED: [char; 3] = ['/', ':', '='];

/// A `key=value` pair or a bare `{placeholder}`
///
/// Values starting with `{` and ending with `}` are placeholders. A segment
/// without key is always a bare placeholder occupying the whole node.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    key: Option<String>,
    value: String,
}

impl Segment {
    /// A keyed segment
    ///
    /// Fails for an empty key or value, and for a key or value ending in a
    /// backslash: that backslash would escape the separator written after
    /// it, so the segment could not be read back.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> TemplateResult<Self> {
        let (key, value) = (key.into(), value.into());
        match check_pair(&key, &value) {
            Ok(()) => Ok(Self::keyed(key, value)),
            Err(reason) => Err(TemplateError::malformed(
                format!("{}={}", escape(&key), escape(&value)),
                reason,
            )),
        }
    }

    /// A keyed segment from parts known to be valid
    pub(crate) const fn keyed(key: String, value: String) -> Self {
        Self {
            key: Some(key),
            value,
        }
    }

    /// A bare placeholder segment, `{name}`
    #[must_use]
    pub fn placeholder(placeholder: &Placeholder) -> Self {
        Self {
            key: None,
            value: placeholder.expression(),
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.value == WILDCARD
    }

    /// Name of the placeholder in the value, if any
    #[must_use]
    pub fn placeholder_name(&self) -> Option<&str> {
        self.value
            .strip_prefix('{')
            .and_then(|v| v.strip_suffix('}'))
            .filter(|name| !name.is_empty())
    }

    #[must_use]
    pub fn has_placeholder(&self) -> bool {
        self.placeholder_name().is_some()
    }

    /// The key this segment stands for, including the implicit key of a
    /// bare placeholder with a resource type
    #[must_use]
    pub fn effective_key(&self) -> Option<&str> {
        self.key().or_else(|| {
            self.placeholder_name()
                .and_then(Placeholder::lookup)
                .and_then(Placeholder::resource_type)
        })
    }

    /// Copy with another value, keeping the (effective) key
    ///
    /// A bare placeholder without resource type has no key to keep and is
    /// returned unchanged.
    pub fn with_value(&self, value: impl Into<String>) -> TemplateResult<Self> {
        match self.effective_key() {
            Some(key) => Self::new(key, value),
            None => Ok(self.clone()),
        }
    }

    /// Copy with the value `*`, keeping the (effective) key
    #[must_use]
    pub fn to_wildcard(&self) -> Self {
        match self.effective_key() {
            Some(key) => Self::keyed(key.to_string(), WILDCARD.to_string()),
            None => self.clone(),
        }
    }

    /// Parse one segment of template text (already split on `/`)
    pub(crate) fn parse(template: &str, raw: &str) -> TemplateResult<Self> {
        if raw.is_empty() {
            return Err(TemplateError::malformed(template, "empty segment"));
        }
        match find_unescaped(raw, '=') {
            Some(pos) => {
                let key = &raw[..pos];
                let value = &raw[pos + 1..];
                if key.is_empty() {
                    return Err(TemplateError::malformed(
                        template,
                        format!("empty key in segment '{raw}'"),
                    ));
                }
                if value.is_empty() {
                    return Err(TemplateError::malformed(
                        template,
                        format!("key '{key}' without a value"),
                    ));
                }
                let (key, value) = (unescape(key), unescape(value));
                check_pair(&key, &value).map_err(|reason| TemplateError::malformed(template, reason))?;
                Ok(Self::keyed(key, value))
            }
            None => {
                let segment = Self {
                    key: None,
                    value: raw.to_string(),
                };
                if segment.has_placeholder() {
                    Ok(segment)
                } else {
                    Err(TemplateError::malformed(
                        template,
                        format!("key '{raw}' without a value"),
                    ))
                }
            }
        }
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segment({self})")
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}={}", escape(key), escape(&self.value)),
            None => f.write_str(&self.value),
        }
    }
}

/// Reason why `key=value` cannot be written as template text, if any
fn check_pair(key: &str, value: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    if value.is_empty() {
        return Err(format!("key '{key}' without a value"));
    }
    if key.ends_with('\\') || value.ends_with('\\') {
        return Err(format!("unterminated escape in segment '{key}={value}'"));
    }
    Ok(())
}

/// Escape `/`, `:` and `=` with a backslash
#[must_use]
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if ESCAPED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reverse of [`escape`]; other backslashes are kept as they are
#[must_use]
pub fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if ESCAPED.contains(&next) {
                    unescaped.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        unescaped.push(c);
    }
    unescaped
}

/// Byte offset of the first `separator` not preceded by an escaping backslash
pub(crate) fn find_unescaped(text: &str, separator: char) -> Option<usize> {
    let mut escaped = false;
    for (pos, c) in text.char_indices() {
        if escaped {
            escaped = false;
            if ESCAPED.contains(&c) {
                continue;
            }
        }
        if c == '\\' {
            escaped = true;
        } else if c == separator {
            return Some(pos);
        }
    }
    None
}

/// Split on every unescaped `separator`
pub(crate) fn split_unescaped(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(pos) = find_unescaped(rest, separator) {
        parts.push(&rest[..pos]);
        rest = &rest[pos + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_segment() {
        let segment = Segment::parse("/", "subsystem=logging").unwrap();
        assert_eq!(segment.key(), Some("subsystem"));
        assert_eq!(segment.value(), "logging");
        assert!(!segment.has_placeholder());
        assert_eq!(segment.to_string(), "subsystem=logging");
    }

    #[test]
    fn test_bare_placeholder() {
        let segment = Segment::parse("/", "{selected-host}").unwrap();
        assert!(!segment.has_key());
        assert_eq!(segment.placeholder_name(), Some("selected-host"));
        assert_eq!(segment.effective_key(), Some("host"));
        assert_eq!(segment.to_string(), "{selected-host}");
    }

    #[test]
    fn test_keyed_placeholder() {
        let segment = Segment::parse("/", "server={selected-server}").unwrap();
        assert_eq!(segment.key(), Some("server"));
        assert_eq!(segment.placeholder_name(), Some("selected-server"));
        assert_eq!(segment.to_wildcard().to_string(), "server=*");
        assert_eq!(segment.with_value("server-one").unwrap().to_string(), "server=server-one");
    }

    #[test]
    fn test_malformed_segments() {
        assert!(Segment::parse("/", "subsystem").is_err());
        assert!(Segment::parse("/", "=logging").is_err());
        assert!(Segment::parse("/", "subsystem=").is_err());
        assert!(Segment::parse("/", "").is_err());
        assert!(Segment::parse("/", "{}").is_err());
        assert!(Segment::parse("/", "path=c:\\temp\\").is_err());
    }

    #[test]
    fn test_trailing_backslash_rejected() {
        assert!(matches!(
            Segment::new("path", "x\\"),
            Err(TemplateError::MalformedTemplate { .. })
        ));
        assert!(Segment::new("path\\", "x").is_err());
        assert!(Segment::new("", "x").is_err());
        assert!(Segment::new("path", "").is_err());
        assert!(Segment::new("path", "x\\y").is_ok());

        let selected = Segment::parse("/", "{selected-host}").unwrap();
        assert!(selected.with_value("primary\\").is_err());
        assert_eq!(selected.with_value("primary").unwrap().to_string(), "host=primary");
    }

    #[test]
    fn test_escape_unescape() {
        assert_eq!(escape("java:/jboss/ExampleDS"), "java\\:\\/jboss\\/ExampleDS");
        assert_eq!(escape("a=b"), "a\\=b");
        assert_eq!(escape("plain-value_1.0"), "plain-value_1.0");
        assert_eq!(unescape("java\\:\\/jboss\\/ExampleDS"), "java:/jboss/ExampleDS");
        assert_eq!(unescape("c:\\temp"), "c:\\temp");
    }

    #[test]
    fn test_escaped_value_segment() {
        let segment = Segment::parse("/", "jndi=java\\:\\/jboss\\/ExampleDS").unwrap();
        assert_eq!(segment.value(), "java:/jboss/ExampleDS");
        assert_eq!(segment.to_string(), "jndi=java\\:\\/jboss\\/ExampleDS");
    }

    #[test]
    fn test_split_unescaped() {
        assert_eq!(
            split_unescaped("a=b/c=d\\/e", '/'),
            vec!["a=b", "c=d\\/e"]
        );
        assert_eq!(split_unescaped("a\\=b=c", '='), vec!["a\\=b", "c"]);
    }
}
