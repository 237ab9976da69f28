//! Combined metadata of one resource

use modelmeta_template::AddressTemplate;
use serde::Serialize;

use crate::description::ResourceDescription;
use crate::security::SecurityContext;

/// Resource description and security context of one template
///
/// [`Metadata::empty`] stands for "no single result", returned when a
/// request spans several or wildcarded templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    template: AddressTemplate,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_description: Option<ResourceDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_context: Option<SecurityContext>,
}

impl Metadata {
    #[must_use]
    pub const fn new(
        template: AddressTemplate,
        resource_description: Option<ResourceDescription>,
        security_context: Option<SecurityContext>,
    ) -> Self {
        Self {
            template,
            resource_description,
            security_context,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(AddressTemplate::root(), None, None)
    }

    /// Neither description nor security context
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.resource_description.is_none() && self.security_context.is_none()
    }

    #[must_use]
    pub const fn template(&self) -> &AddressTemplate {
        &self.template
    }

    #[must_use]
    pub const fn resource_description(&self) -> Option<&ResourceDescription> {
        self.resource_description.as_ref()
    }

    #[must_use]
    pub const fn security_context(&self) -> Option<&SecurityContext> {
        self.security_context.as_ref()
    }
}
