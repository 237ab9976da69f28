//! Presence of metadata per requested template

use modelmeta_template::AddressTemplate;

/// Per-template bitmask of the metadata found in the registries
///
/// | bits   | meaning                          |
/// |--------|----------------------------------|
/// | `0b00` | nothing present                  |
/// | `0b01` | security context                 |
/// | `0b10` | resource description             |
/// | `0b11` | both                             |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatus {
    entries: Vec<(AddressTemplate, u8)>,
}

impl RepositoryStatus {
    pub const NOTHING_PRESENT: u8 = 0b00;
    pub const SECURITY_CONTEXT_PRESENT: u8 = 0b01;
    pub const RESOURCE_DESCRIPTION_PRESENT: u8 = 0b10;
    pub const ALL_PRESENT: u8 = 0b11;

    /// Status with every template at [`NOTHING_PRESENT`](Self::NOTHING_PRESENT)
    ///
    /// Duplicate templates are tracked once, in first-seen order.
    pub fn new<'a>(templates: impl IntoIterator<Item = &'a AddressTemplate>) -> Self {
        let mut entries: Vec<(AddressTemplate, u8)> = Vec::new();
        for template in templates {
            if !entries.iter().any(|(t, _)| t == template) {
                entries.push((template.clone(), Self::NOTHING_PRESENT));
            }
        }
        Self { entries }
    }

    pub fn mark_security_context(&mut self, template: &AddressTemplate) {
        self.mark(template, Self::SECURITY_CONTEXT_PRESENT);
    }

    pub fn mark_resource_description(&mut self, template: &AddressTemplate) {
        self.mark(template, Self::RESOURCE_DESCRIPTION_PRESENT);
    }

    fn mark(&mut self, template: &AddressTemplate, bit: u8) {
        if let Some((_, bits)) = self.entries.iter_mut().find(|(t, _)| t == template) {
            *bits |= bit;
        }
    }

    /// Bits of `template`, `None` if it was not requested
    #[must_use]
    pub fn bits(&self, template: &AddressTemplate) -> Option<u8> {
        self.entries
            .iter()
            .find(|(t, _)| t == template)
            .map(|(_, bits)| *bits)
    }

    /// True iff every template has both kinds of metadata
    #[must_use]
    pub fn all_present(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, bits)| *bits == Self::ALL_PRESENT)
    }

    /// Templates still missing something, with their bits
    pub fn missing(&self) -> impl Iterator<Item = (&AddressTemplate, u8)> {
        self.entries
            .iter()
            .filter(|(_, bits)| *bits != Self::ALL_PRESENT)
            .map(|(t, bits)| (t, *bits))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
