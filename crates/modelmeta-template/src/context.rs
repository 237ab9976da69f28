//! Current selection state used to fill in placeholders

use std::collections::HashMap;

use crate::placeholder::Placeholder;
use crate::segment::Segment;

/// Placeholder values of the current session
///
/// Selection changes (picking a host, server or profile) assign values;
/// resolution reads them. The context is passed explicitly to every
/// resolver rather than living in global state.
#[derive(Debug, Clone, Default)]
pub struct StatementContext {
    values: HashMap<String, String>,
}

impl StatementContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value, replacing any previous one
    pub fn assign(&mut self, placeholder: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(placeholder.into(), value.into());
        self
    }

    /// Builder-style [`assign`](Self::assign)
    #[must_use]
    pub fn with(mut self, placeholder: impl Into<String>, value: impl Into<String>) -> Self {
        self.assign(placeholder, value);
        self
    }

    /// Current value of a placeholder
    #[must_use]
    pub fn value(&self, placeholder: &str) -> Option<&str> {
        self.values.get(placeholder).map(String::as_str)
    }

    /// Forget a value, returning it
    pub fn remove(&mut self, placeholder: &str) -> Option<String> {
        self.values.remove(placeholder)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Substitute the placeholder of `segment` with its current value
    ///
    /// Bare placeholders become `resource-type=value`; keyed segments keep
    /// their key. Without a value a bare placeholder is expanded to its
    /// implicit key (`{selected-host}` → `host={selected-host}`), or left
    /// as it is when the placeholder has no resource type. Segments without
    /// placeholder are returned unchanged. A value that cannot be written
    /// as template text (empty, or ending in a backslash) counts as unset.
    #[must_use]
    pub fn resolve(&self, segment: &Segment) -> Segment {
        let Some(name) = segment.placeholder_name() else {
            return segment.clone();
        };
        let value = self.value(name).and_then(|value| segment.with_value(value).ok());
        if let Some(resolved) = value {
            return resolved;
        }
        match Placeholder::lookup(name).and_then(Placeholder::resource_type) {
            Some(key) if !segment.has_key() => {
                Segment::keyed(key.to_string(), segment.value().to_string())
            }
            _ => segment.clone(),
        }
    }
}
