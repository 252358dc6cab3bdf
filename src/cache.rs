//! Content-addressed memoization.
//!
//! Keys are SHA-256 digests of everything a computation depends on, so a
//! table can be shared between sessions: equal keys always map to equal
//! values and entries are never modified after insertion.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    pub fn of(bytes: &[u8]) -> Self {
        Self::builder().update(bytes).finish()
    }

    pub fn builder() -> KeyBuilder {
        KeyBuilder(Sha256::new())
    }

    pub fn to_hex(&self) -> String {
        format!("{self:x}")
    }
}

impl fmt::LowerHex for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are plenty to tell entries apart in logs
        f.write_str("ContentKey(")?;
        self.0[..8].iter().try_for_each(|b| write!(f, "{b:02x}"))?;
        f.write_str("…)")
    }
}

/// Feeds the parts of a key into the hasher, in order
pub struct KeyBuilder(Sha256);

impl KeyBuilder {
    pub fn update(mut self, bytes: &[u8]) -> Self {
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart
        self.0.update((bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
        self
    }

    pub fn finish(self) -> ContentKey {
        ContentKey(self.0.finalize().into())
    }
}

/// Bounded memo table keyed by content hash
pub struct MemoCache<V> {
    name: &'static str,
    entries: Mutex<LruCache<ContentKey, Arc<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> MemoCache<V> {
    /// A capacity of zero is treated as one
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<ContentKey, Arc<V>>> {
        // Entries are immutable, so a panic elsewhere cannot leave one half-written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &ContentKey) -> Option<Arc<V>> {
        self.lock().get(key).cloned()
    }

    /// Store `value` unless the key is already present; returns the stored entry
    pub fn insert(&self, key: ContentKey, value: V) -> Arc<V> {
        let mut entries = self.lock();
        if let Some(existing) = entries.get(&key) {
            return Arc::clone(existing);
        }
        let value = Arc::new(value);
        entries.put(key, Arc::clone(&value));
        value
    }

    /// Return the cached value or compute, store and return it
    ///
    /// The computation runs without holding the lock, so other keys stay
    /// available while it is in progress. Errors are not cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: ContentKey, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("{} cache hit {:?}", self.name, key);
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("{} cache miss {:?}", self.name, key);

        let value = compute()?;
        Ok(self.insert(key, value))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn key_depends_on_every_part() {
        let a = ContentKey::builder().update(b"ab").update(b"c").finish();
        let b = ContentKey::builder().update(b"a").update(b"bc").finish();
        let c = ContentKey::builder().update(b"ab").update(b"c").finish();
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(ContentKey::of(b"x").to_hex().len(), 64);
    }

    #[test]
    fn hex_is_lowercase_and_debug_shows_its_prefix() {
        let key = ContentKey::of(b"x");
        let hex = key.to_hex();
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(format!("{key:?}"), format!("ContentKey({}…)", &hex[..16]));
    }

    #[test]
    fn computes_once_per_key() {
        let cache: MemoCache<u32> = MemoCache::new("test", 4);
        let calls = Cell::new(0);
        let compute = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(42)
        };

        let key = ContentKey::of(b"input");
        assert_eq!(*cache.get_or_try_insert_with(key, compute).unwrap(), 42);
        assert_eq!(*cache.get_or_try_insert_with(key, compute).unwrap(), 42);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: MemoCache<u32> = MemoCache::new("test", 4);
        let key = ContentKey::of(b"input");

        let err = cache.get_or_try_insert_with(key, || Err::<u32, _>("boom"));
        assert_eq!(err.unwrap_err(), "boom");
        assert!(cache.is_empty());

        let ok = cache.get_or_try_insert_with(key, || Ok::<_, &str>(7)).unwrap();
        assert_eq!(*ok, 7);
    }

    #[test]
    fn first_insert_wins() {
        let cache: MemoCache<&str> = MemoCache::new("test", 4);
        let key = ContentKey::of(b"k");
        cache.insert(key, "first");
        assert_eq!(*cache.insert(key, "second"), "first");
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache: MemoCache<u8> = MemoCache::new("test", 2);
        let (a, b, c) = (ContentKey::of(b"a"), ContentKey::of(b"b"), ContentKey::of(b"c"));
        cache.insert(a, 1);
        cache.insert(b, 2);
        assert!(cache.get(&a).is_some());
        cache.insert(c, 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&a).is_some());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache: MemoCache<u8> = MemoCache::new("test", 0);
        cache.insert(ContentKey::of(b"a"), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn shared_between_threads() {
        let cache: Arc<MemoCache<usize>> = Arc::new(MemoCache::new("test", 16));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let key = ContentKey::of(&[i as u8]);
                    *cache
                        .get_or_try_insert_with(key, || Ok::<_, ()>(i * 10))
                        .unwrap()
                })
            })
            .collect();

        let mut results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, vec![0, 10, 20, 30]);
        assert_eq!(cache.len(), 4);
    }
}
