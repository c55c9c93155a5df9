//! Revocable handles to extracted images.
//!
//! Every successful extraction registers its encoded bytes in a
//! [`HandleRegistry`] and hands the caller a [`FrameHandle`]: an
//! addressable URL that stays resolvable until the handle is revoked.
//! Revocation happens exactly once, either explicitly through
//! [`FrameHandle::revoke`] or when the handle is dropped, so repeated
//! extractions cannot accumulate stale entries.
//!
//! # Example
//!
//! ```
//! use framegrab::HandleRegistry;
//!
//! let registry = HandleRegistry::new();
//! let handle = registry.register(vec![1, 2, 3]);
//! assert!(registry.resolve(handle.url()).is_some());
//!
//! let url = handle.url().to_string();
//! handle.revoke();
//! assert!(registry.resolve(&url).is_none());
//! assert!(registry.is_empty());
//! ```

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Scheme and path prefix of handle URLs.
pub const URL_PREFIX: &str = "framegrab://frame/";

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Arc<[u8]>>>,
}

impl RegistryInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<u64, Arc<[u8]>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Store of live image handles.
///
/// Cheap to clone; clones share the same entries.
#[derive(Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<RegistryInner>,
}

impl Debug for HandleRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("HandleRegistry")
            .field("live_handles", &self.len())
            .finish()
    }
}

impl HandleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return the guard that owns the entry.
    pub fn register(&self, bytes: impl Into<Arc<[u8]>>) -> FrameHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let bytes = bytes.into();
        self.inner.entries().insert(id, Arc::clone(&bytes));

        FrameHandle {
            id,
            url: format!("{URL_PREFIX}{id}"),
            bytes,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Look up the bytes behind a live handle URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        let id = url.strip_prefix(URL_PREFIX)?.parse::<u64>().ok()?;
        self.inner.entries().get(&id).cloned()
    }

    /// Number of live (unrevoked) handles.
    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    /// Returns `true` when no handles are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Guard over one registered image.
///
/// Not `Clone`: there is exactly one owner, and the registry entry is
/// removed exactly once when that owner revokes or drops it.
pub struct FrameHandle {
    id: u64,
    url: String,
    bytes: Arc<[u8]>,
    registry: Arc<RegistryInner>,
}

impl Debug for FrameHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameHandle")
            .field("url", &self.url)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FrameHandle {
    /// Addressable URL of this handle (`framegrab://frame/<id>`).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The registered bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Release the handle now. Equivalent to dropping it.
    pub fn revoke(self) {
        drop(self);
    }
}

impl Drop for FrameHandle {
    fn drop(&mut self) {
        if self.registry.entries().remove(&self.id).is_some() {
            log::debug!("Revoked {}", self.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_independent() {
        let registry = HandleRegistry::new();
        let first = registry.register(vec![1_u8]);
        let second = registry.register(vec![1_u8]);
        assert_ne!(first.url(), second.url());
        assert_eq!(registry.len(), 2);

        first.revoke();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve(second.url()).as_deref(), Some(&[1_u8][..]));
    }

    #[test]
    fn drop_revokes() {
        let registry = HandleRegistry::new();
        {
            let _handle = registry.register(vec![9_u8; 3]);
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn foreign_urls_do_not_resolve() {
        let registry = HandleRegistry::new();
        let _handle = registry.register(vec![0_u8]);
        assert!(registry.resolve("blob:somewhere/0").is_none());
        assert!(registry.resolve("framegrab://frame/not-a-number").is_none());
    }

    #[test]
    fn bytes_outlive_revocation() {
        let registry = HandleRegistry::new();
        let handle = registry.register(vec![5_u8, 6]);
        let url = handle.url().to_string();
        let shared = registry.resolve(&url).expect("live");
        handle.revoke();
        assert_eq!(&*shared, &[5_u8, 6]);
        assert!(registry.resolve(&url).is_none());
    }
}
