//! Named slots filled in from the current selection

use std::borrow::Cow;
use std::fmt;

/// A named slot in an address template
///
/// `resource_type` is the key a bare placeholder stands for: `{selected-host}`
/// resolves to `host=<value>`. Placeholders without resource type can only
/// be used as the value of a keyed segment (`data-source={selection}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    name: Cow<'static, str>,
    resource_type: Option<Cow<'static, str>>,
    requires_value: bool,
}

impl Placeholder {
    pub const DOMAIN_CONTROLLER: Self = Self::known("domain-controller", Some("host"), true);
    pub const SELECTED_HOST: Self = Self::known("selected-host", Some("host"), true);
    pub const SELECTED_SERVER: Self = Self::known("selected-server", Some("server"), true);
    pub const SELECTED_SERVER_GROUP: Self =
        Self::known("selected-server-group", Some("server-group"), true);
    pub const SELECTED_PROFILE: Self = Self::known("selected-profile", Some("profile"), true);
    pub const SELECTED_SERVER_CONFIG: Self =
        Self::known("selected-server-config", Some("server-config"), true);
    pub const SELECTED_DEPLOYMENT: Self =
        Self::known("selected-deployment", Some("deployment"), true);
    pub const SELECTED_RESOURCE: Self = Self::known("selected-resource", None, true);
    pub const SELECTION: Self = Self::known("selection", None, false);

    /// All placeholders with built-in resolution behavior
    pub const KNOWN: [Self; 9] = [
        Self::DOMAIN_CONTROLLER,
        Self::SELECTED_HOST,
        Self::SELECTED_SERVER,
        Self::SELECTED_SERVER_GROUP,
        Self::SELECTED_PROFILE,
        Self::SELECTED_SERVER_CONFIG,
        Self::SELECTED_DEPLOYMENT,
        Self::SELECTED_RESOURCE,
        Self::SELECTION,
    ];

    const fn known(name: &'static str, resource_type: Option<&'static str>, requires: bool) -> Self {
        let resource_type = match resource_type {
            Some(rt) => Some(Cow::Borrowed(rt)),
            None => None,
        };
        Self {
            name: Cow::Borrowed(name),
            resource_type,
            requires_value: requires,
        }
    }

    /// Create an application specific placeholder
    pub fn new(
        name: impl Into<String>,
        resource_type: Option<String>,
        requires_value: bool,
    ) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            resource_type: resource_type.map(Cow::Owned),
            requires_value,
        }
    }

    /// Find a known placeholder by name
    #[must_use]
    pub fn lookup(name: &str) -> Option<&'static Self> {
        KNOWN_PLACEHOLDERS.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    #[must_use]
    pub const fn requires_value(&self) -> bool {
        self.requires_value
    }

    /// Whether permissions are scoped by this placeholder's value
    ///
    /// Security contexts differ per host, server group and server, so
    /// these placeholders keep their concrete value when security context
    /// keys are built.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(
            self.name(),
            "domain-controller" | "selected-host" | "selected-server-group" | "selected-server"
        )
    }

    /// The segment value form, `{name}`
    #[must_use]
    pub fn expression(&self) -> String {
        format!("{{{}}}", self.name)
    }
}

static KNOWN_PLACEHOLDERS: [Placeholder; 9] = Placeholder::KNOWN;

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known() {
        let host = Placeholder::lookup("selected-host").unwrap();
        assert_eq!(host.resource_type(), Some("host"));
        assert!(host.requires_value());
        assert!(host.is_identity());

        let profile = Placeholder::lookup("selected-profile").unwrap();
        assert!(!profile.is_identity());

        assert!(Placeholder::lookup("selected-planet").is_none());
    }

    #[test]
    fn test_selection_needs_no_value() {
        assert!(!Placeholder::SELECTION.requires_value());
        assert!(Placeholder::SELECTION.resource_type().is_none());
    }

    #[test]
    fn test_expression() {
        assert_eq!(Placeholder::SELECTED_SERVER.expression(), "{selected-server}");
        assert_eq!(
            Placeholder::new("tenant", Some("tenant".into()), true).to_string(),
            "{tenant}"
        );
    }
}
