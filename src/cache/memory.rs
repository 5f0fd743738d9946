//! Thread-safe in-memory [`TokenCache`] implementation.

// self
use crate::{
	_prelude::*,
	cache::{CacheEntry, CacheError, CacheFuture, CacheKey, TokenCache},
};

type CacheMap = Arc<RwLock<HashMap<CacheKey, CacheEntry>>>;

/// Process-local cache; clone or share the `Arc` to let several clients reuse one token.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Returns `true` when an entry exists under `key`, regardless of freshness.
	pub fn contains(&self, key: &CacheKey) -> bool {
		self.0.read().contains_key(key)
	}

	fn get_now(map: CacheMap, key: CacheKey) -> Option<CacheEntry> {
		map.read().get(&key).cloned()
	}

	fn put_now(map: CacheMap, key: CacheKey, entry: CacheEntry) -> Result<(), CacheError> {
		map.write().insert(key, entry);

		Ok(())
	}

	fn forget_now(map: CacheMap, key: CacheKey) -> bool {
		map.write().remove(&key).is_some()
	}
}
impl TokenCache for MemoryCache {
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<CacheEntry>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}

	fn put<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry) -> CacheFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::put_now(map, key, entry) })
	}

	fn forget<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::forget_now(map, key)) })
	}

	fn flush(&self) -> CacheFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().clear();

			Ok(())
		})
	}
}
