//! Slab-backed LRU cache
//!
//! Entries live in a `Vec` of slots linked into a doubly linked recency list
//! (head = most recently used, tail = least recently used). A hash index maps
//! keys to slots, so `get`, `put` and `remove` are O(1). Freed slots are
//! reused before the slab grows.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Called with every entry evicted to make room for a new key
pub type RemovalListener<K, V> = Box<dyn FnMut(K, V) + Send>;

/// Errors raised when constructing a cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache capacity must be at least 1")]
    ZeroCapacity,
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of `get` calls that found an entry
    pub hits: u64,
    /// Number of `get` calls that found nothing
    pub misses: u64,
    /// Number of entries evicted for capacity
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit ratio (0.0 to 1.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Fixed capacity least-recently-used cache
pub struct LruCache<K, V> {
    capacity: usize,
    index: HashMap<K, usize>,
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    listener: Option<RemovalListener<K, V>>,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Create an empty cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            listener: None,
            stats: CacheStats::default(),
        })
    }

    /// Install the eviction listener
    ///
    /// The listener runs inside [`put`](Self::put), after the evicted entry
    /// is unlinked and before the new entry is inserted. [`remove`](Self::remove)
    /// and [`clear`](Self::clear) never call it.
    #[must_use]
    pub fn with_removal_listener(mut self, listener: impl FnMut(K, V) + Send + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Look up a value and mark it most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let Some(&idx) = self.index.get(key) else {
            self.stats.misses += 1;
            return None;
        };
        self.stats.hits += 1;
        self.promote(idx);
        self.slot(idx).map(|node| &node.value)
    }

    /// Look up a value without touching recency or statistics
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.slot(idx).map(|node| &node.value)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or update a value and mark it most recently used
    ///
    /// Returns the previous value when the key was present. A new key in a
    /// full cache evicts the least recently used entry first.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.index.get(&key) {
            let previous = self
                .slot_mut(idx)
                .map(|node| std::mem::replace(&mut node.value, value));
            self.promote(idx);
            return previous;
        }

        if self.index.len() >= self.capacity {
            self.evict();
        }

        let node = Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let idx = if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        };
        self.index.insert(key, idx);
        self.attach_front(idx);
        None
    }

    /// Remove an entry without notifying the removal listener
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        self.take(idx).map(|node| node.value)
    }

    /// Keys from most to least recently used
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            cache: self,
            next: self.head,
        }
    }

    /// Drop every entry without notifying the removal listener
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    fn evict(&mut self) {
        let Some(idx) = self.tail else {
            return;
        };
        let Some(node) = self.take(idx) else {
            return;
        };
        self.index.remove(&node.key);
        self.stats.evictions += 1;
        if let Some(listener) = self.listener.as_mut() {
            listener(node.key, node.value);
        }
    }

    /// Unlink and free a slot
    fn take(&mut self, idx: usize) -> Option<Node<K, V>> {
        self.detach(idx);
        let node = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);
        Some(node)
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    fn detach(&mut self, idx: usize) {
        let Some((prev, next)) = self.slot(idx).map(|node| (node.prev, node.next)) else {
            return;
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.slot_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.slot_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(node) = self.slot_mut(idx) {
            node.prev = None;
            node.next = None;
        }
    }

    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.slot_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head
            && let Some(node) = self.slot_mut(h)
        {
            node.prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn slot(&self, idx: usize) -> Option<&Node<K, V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, idx: usize) -> Option<&mut Node<K, V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.index.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Iterator over cache keys in recency order
pub struct Keys<'a, K, V> {
    cache: &'a LruCache<K, V>,
    next: Option<usize>,
}

impl<'a, K: Eq + Hash + Clone, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cache.slot(self.next?)?;
        self.next = node.next;
        Some(&node.key)
    }
}
