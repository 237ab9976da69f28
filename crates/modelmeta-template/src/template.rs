//! Address templates
//!
//! Canonical text form:
//!
//! ```text
//! template := "/" | segment ("/" segment)*
//! segment  := key "=" value | "{" placeholder-name "}"
//! ```
//!
//! `/`, `:` and `=` inside values are escaped as `\/`, `\:` and `\=`.

use modelmeta_common::ResourceAddress;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{TemplateError, TemplateResult};
use crate::segment::{Segment, split_unescaped};

/// Immutable, possibly parametric path to a resource
///
/// Equality, ordering and hashing use the canonical string.
#[derive(Clone)]
pub struct AddressTemplate {
    segments: Vec<Segment>,
    template: String,
}

impl AddressTemplate {
    /// The root template, `/`
    #[must_use]
    pub fn root() -> Self {
        Self::from_segments(Vec::new())
    }

    /// Parse template text
    ///
    /// Relative and absolute forms are accepted; surrounding whitespace and
    /// a trailing slash are ignored.
    pub fn of(text: &str) -> TemplateResult<Self> {
        let trimmed = text.trim();
        let mut body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if body.ends_with('/') && !body.ends_with("\\/") {
            body = &body[..body.len() - 1];
        }
        if body.is_empty() {
            return Ok(Self::root());
        }
        let segments = split_unescaped(body, '/')
            .into_iter()
            .map(|raw| Segment::parse(text, raw))
            .collect::<TemplateResult<Vec<_>>>()?;
        Ok(Self::from_segments(segments))
    }

    /// Build from already parsed segments
    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let template = format_segments(&segments);
        Self { segments, template }
    }

    /// Canonical text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// `true` for the root template
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Template with the segments of `other` appended
    #[must_use]
    pub fn append(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self::from_segments(segments)
    }

    /// Template with the parsed `text` appended
    pub fn append_str(&self, text: &str) -> TemplateResult<Self> {
        Ok(self.append(&Self::of(text)?))
    }

    /// Template with one more segment
    #[must_use]
    pub fn append_segment(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self::from_segments(segments)
    }

    /// Template without its last segment; the root's parent is the root
    #[must_use]
    pub fn parent(&self) -> Self {
        if self.segments.is_empty() {
            return self.clone();
        }
        self.sub_template(0, self.segments.len() - 1)
    }

    /// Segments in the half-open range `from..to`
    ///
    /// `to` is clamped to the length; an empty range yields the root.
    #[must_use]
    pub fn sub_template(&self, from: usize, to: usize) -> Self {
        let to = to.min(self.segments.len());
        let from = from.min(to);
        Self::from_segments(self.segments[from..to].to_vec())
    }

    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        self.segments.iter().any(Segment::has_placeholder)
    }

    #[must_use]
    pub fn has_wildcards(&self) -> bool {
        self.segments.iter().any(Segment::is_wildcard)
    }

    /// No wildcard and no placeholder left
    #[must_use]
    pub fn is_fully_qualified(&self) -> bool {
        !self.has_wildcards() && !self.has_placeholders()
    }

    /// Convert to a wire address; fails while placeholders remain
    pub fn to_resource_address(&self) -> TemplateResult<ResourceAddress> {
        let mut segments = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let unresolved = |placeholder: &str| TemplateError::UnresolvedPlaceholder {
                template: self.template.clone(),
                placeholder: placeholder.to_string(),
            };
            if let Some(name) = segment.placeholder_name() {
                return Err(unresolved(name));
            }
            let Some(key) = segment.key() else {
                return Err(unresolved(segment.value()));
            };
            segments.push((key.to_string(), segment.value().to_string()));
        }
        Ok(ResourceAddress::new(segments))
    }
}

fn format_segments(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut template = String::new();
    for segment in segments {
        template.push('/');
        template.push_str(&segment.to_string());
    }
    template
}

/// Fails for addresses whose keys or values cannot be written as template
/// text, see [`Segment::new`]
impl TryFrom<&ResourceAddress> for AddressTemplate {
    type Error = TemplateError;

    fn try_from(address: &ResourceAddress) -> Result<Self, Self::Error> {
        let segments = address
            .segments()
            .iter()
            .map(|(k, v)| Segment::new(k.as_str(), v.as_str()))
            .collect::<TemplateResult<Vec<_>>>()?;
        Ok(Self::from_segments(segments))
    }
}

impl FromStr for AddressTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::of(s)
    }
}

impl fmt::Display for AddressTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl fmt::Debug for AddressTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddressTemplate({})", self.template)
    }
}

impl PartialEq for AddressTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
    }
}

impl Eq for AddressTemplate {}

impl Hash for AddressTemplate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.template.hash(state);
    }
}

impl PartialOrd for AddressTemplate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AddressTemplate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.template.cmp(&other.template)
    }
}

impl Serialize for AddressTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.template)
    }
}

impl<'de> Deserialize<'de> for AddressTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::of(&text).map_err(serde::de::Error::custom)
    }
}
