//! modelmeta Cache - Bounded least-recently-used cache
//!
//! [`LruCache`] keeps at most `capacity` entries. Inserting a new key into a
//! full cache evicts the least recently used entry and hands it to the
//! removal listener before the insert completes.

pub mod lru;

pub use lru::{CacheError, CacheStats, Keys, LruCache, RemovalListener};
