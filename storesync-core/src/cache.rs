//! Process-wide TTL cache for catalog data.
//!
//! One flat namespace of string keys. Every write replaces the whole value and
//! stamps a fresh expiry. Expired entries are never purged proactively: they
//! still answer [`TtlCache::get`] but fail [`TtlCache::has_valid`], so callers
//! can fall back to stale data when a refresh fails.

use std::any::{Any, type_name};
use std::sync::Arc;
use std::time::Duration;

use scc::HashMap;
use tokio::time::Instant;
use tracing::debug;

/// Store metadata ([`crate::StoreInfo`]).
pub const INFORMATION: &str = "information";
/// Ordered category listing.
pub const CATEGORIES: &str = "categories";
/// Ordered package listing.
pub const PACKAGES: &str = "packages";
/// Short code (`P1`, `P2`, ...) to package map derived from [`PACKAGES`].
pub const PACKAGE_SHORT_CODES: &str = "packageShortCodes";

/// Longest lifetime an entry gets; larger TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// A cached value and the instant it stops being valid.
#[derive(Clone)]
pub struct CachedObject {
  value: Arc<dyn Any + Send + Sync>,
  expires_at: Instant,
}

impl CachedObject {
  pub fn expires_at(&self) -> Instant {
    self.expires_at
  }

  fn is_valid(&self, now: Instant) -> bool {
    now < self.expires_at
  }
}

/// Lock-free key/value store with per-entry expiry. Last write wins.
pub struct TtlCache {
  entries: HashMap<String, CachedObject>,
  lifetime: Duration,
}

impl TtlCache {
  /// Create a cache whose default writes live for `lifetime`.
  pub fn new(lifetime: Duration) -> Self {
    Self {
      entries: HashMap::new(),
      lifetime,
    }
  }

  pub fn lifetime(&self) -> Duration {
    self.lifetime
  }

  /// Store `value` under `key` for the configured lifetime.
  pub async fn set<T: Any + Send + Sync>(&self, key: &str, value: T) {
    self.set_with_ttl(key, value, self.lifetime).await;
  }

  /// Store `value` under `key`, replacing any previous entry.
  pub async fn set_with_ttl<T: Any + Send + Sync>(&self, key: &str, value: T, ttl: Duration) {
    let now = Instant::now();
    let expires_at = now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now);
    let object = CachedObject {
      value: Arc::new(value),
      expires_at,
    };
    let _ = self.entries.upsert_async(key.to_string(), object).await;
    debug!(key, ttl_secs = ttl.as_secs(), "cache entry stored");
  }

  /// Last value stored under `key`, expired or not.
  ///
  /// Fails when the entry holds a different type than requested.
  pub async fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>, CacheError> {
    let Some(object) = self.entries.read_async(key, |_, object| object.clone()).await else {
      return Ok(None);
    };

    object
      .value
      .downcast::<T>()
      .map(Some)
      .map_err(|_| CacheError::TypeMismatch {
        key: key.to_string(),
        expected: type_name::<T>(),
      })
  }

  /// True when `key` is present and has not expired.
  pub async fn has_valid(&self, key: &str) -> bool {
    let now = Instant::now();
    self
      .entries
      .read_async(key, |_, object| object.is_valid(now))
      .await
      .unwrap_or(false)
  }

  /// Expiry instant of `key`, if present.
  pub async fn expires_at(&self, key: &str) -> Option<Instant> {
    self
      .entries
      .read_async(key, |_, object| object.expires_at())
      .await
  }

  /// Remove `key`. Returns whether an entry was present.
  pub async fn remove(&self, key: &str) -> bool {
    self.entries.remove_async(key).await.is_some()
  }

  /// Drop every entry.
  pub async fn clear(&self) {
    let _ = self.entries.clear_async().await;
    debug!("cache cleared");
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CacheError {
  #[error("cache entry '{key}' does not hold a {expected}")]
  TypeMismatch { key: String, expected: &'static str },
}
