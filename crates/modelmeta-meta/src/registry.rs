//! Bounded metadata registries
//!
//! A registry maps address templates to metadata values. Templates are
//! turned into keys by the registry's [`TemplateResolver`], so every
//! template naming the same key shares one entry. Entries are kept in an
//! [`LruCache`] behind a `parking_lot` mutex; the lock is held only for the
//! lookup or insert itself.

use modelmeta_cache::{CacheError, CacheStats, LruCache};
use modelmeta_template::{
    AddressTemplate, ResourceDescriptionResolver, SecurityContextResolver, StatementContext,
    TemplateResolver,
};
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, trace};

use crate::description::ResourceDescription;
use crate::security::SecurityContext;

/// Value stored in a [`Registry`]
pub trait MetadataEntry: Clone + Send + 'static {
    /// Whether the value covers recursive descendants
    fn is_recursive(&self) -> bool;
}

impl MetadataEntry for ResourceDescription {
    fn is_recursive(&self) -> bool {
        Self::is_recursive(self)
    }
}

impl MetadataEntry for SecurityContext {
    fn is_recursive(&self) -> bool {
        Self::is_recursive(self)
    }
}

/// Registry of resource descriptions, keyed by [`ResourceDescriptionResolver`]
pub type ResourceDescriptionRegistry = Registry<ResourceDescription>;

/// Registry of security contexts, keyed by [`SecurityContextResolver`]
pub type SecurityContextRegistry = Registry<SecurityContext>;

/// First-write-wins metadata store with LRU eviction
pub struct Registry<V> {
    name: &'static str,
    resolver: Box<dyn TemplateResolver>,
    cache: Mutex<LruCache<String, V>>,
}

impl Registry<ResourceDescription> {
    /// Resource description registry with the given capacity
    pub fn resource_descriptions(capacity: usize) -> Result<Self, CacheError> {
        Self::new("resource-description", ResourceDescriptionResolver, capacity)
    }
}

impl Registry<SecurityContext> {
    /// Security context registry with the given capacity
    pub fn security_contexts(capacity: usize) -> Result<Self, CacheError> {
        Self::new("security-context", SecurityContextResolver, capacity)
    }
}

impl<V: MetadataEntry> Registry<V> {
    /// Create a registry using `resolver` to compute keys
    pub fn new(
        name: &'static str,
        resolver: impl TemplateResolver + 'static,
        capacity: usize,
    ) -> Result<Self, CacheError> {
        let cache = LruCache::new(capacity)?.with_removal_listener(move |key: String, _| {
            debug!(registry = name, key = %key, "Evicted metadata");
        });
        Ok(Self {
            name,
            resolver: Box::new(resolver),
            cache: Mutex::new(cache),
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Key under which `template` is stored
    #[must_use]
    pub fn key(&self, template: &AddressTemplate, context: &StatementContext) -> String {
        self.resolver.resolve(template, context).to_string()
    }

    /// Store `value` unless the key is already taken
    ///
    /// The first write for a key wins, whatever the depth of later values.
    /// Returns whether the value was stored.
    pub fn add(&self, template: &AddressTemplate, context: &StatementContext, value: V) -> bool {
        let key = self.key(template, context);
        let mut cache = self.cache.lock();
        if cache.contains(&key) {
            trace!(registry = self.name, key = %key, "Metadata already registered, dropping write");
            return false;
        }
        trace!(registry = self.name, key = %key, recursive = value.is_recursive(), "Registered metadata");
        cache.put(key, value);
        true
    }

    /// Look up the value for `template`, marking it recently used
    #[must_use]
    pub fn get(&self, template: &AddressTemplate, context: &StatementContext) -> Option<V> {
        let key = self.key(template, context);
        self.cache.lock().get(&key).cloned()
    }

    #[must_use]
    pub fn contains(&self, template: &AddressTemplate, context: &StatementContext) -> bool {
        let key = self.key(template, context);
        self.cache.lock().contains(&key)
    }

    /// Whether a value usable for the request is present
    ///
    /// With `recursive`, only values covering recursive descendants count.
    #[must_use]
    pub fn satisfies(
        &self,
        template: &AddressTemplate,
        context: &StatementContext,
        recursive: bool,
    ) -> bool {
        self.get(template, context)
            .is_some_and(|value| !recursive || value.is_recursive())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl<V> fmt::Debug for Registry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
