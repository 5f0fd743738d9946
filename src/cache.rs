//! Token cache contract and built-in backends.
//!
//! The token manager owns the freshness policy: a cached entry is usable only when the token's
//! own expiry has not passed and the entry is younger than the configured TTL. Backends only
//! store and return entries, so swapping the in-memory cache for a shared or persistent one never
//! changes which tokens are accepted.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// self
use crate::{
	_prelude::*,
	auth::{Token, token},
};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Storage backend contract implemented by token caches.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Fetches the entry stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<CacheEntry>>;

	/// Stores or replaces the entry under `key`.
	fn put<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry) -> CacheFuture<'a, ()>;

	/// Evicts the entry under `key`, returning `true` when something was removed.
	fn forget<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool>;

	/// Removes every entry.
	fn flush(&self) -> CacheFuture<'_, ()>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Key identifying a cached token.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);
impl CacheKey {
	/// Key used when the configuration does not override it.
	pub const DEFAULT: &'static str = "oauth_token";

	/// Wraps a custom key, e.g. to partition a shared cache per client.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Default for CacheKey {
	fn default() -> Self {
		Self::new(Self::DEFAULT)
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Cached token plus the wall-clock instant it was stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
	/// Cached token.
	pub token: Token,
	/// Instant the entry was written, at whole-second precision.
	#[serde(with = "time::serde::timestamp")]
	pub stored_at: OffsetDateTime,
}
impl CacheEntry {
	/// Creates an entry stored at the provided instant.
	pub fn new(token: Token, stored_at: OffsetDateTime) -> Self {
		Self { token, stored_at: token::whole_seconds(stored_at) }
	}

	/// Creates an entry stamped with the current clock.
	pub fn stored_now(token: Token) -> Self {
		Self::new(token, OffsetDateTime::now_utc())
	}

	/// Classifies the entry at `now` for the provided TTL.
	///
	/// The token's own expiry wins over the TTL: an expired token is [`Freshness::Expired`] even
	/// when the entry is young, and a live token in an old entry is [`Freshness::Stale`].
	pub fn freshness_at(&self, now: OffsetDateTime, ttl: Duration) -> Freshness {
		if self.token.is_expired_at(now) {
			return Freshness::Expired;
		}

		let age = Duration::try_from(now - self.stored_at).unwrap_or(Duration::ZERO);

		if age >= ttl { Freshness::Stale } else { Freshness::Usable }
	}
}

/// Outcome of [`CacheEntry::freshness_at`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
	/// Entry may be adopted as the current token.
	Usable,
	/// Entry outlived the cache TTL and must be evicted.
	Stale,
	/// Cached token is expired and must be evicted.
	Expired,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::{Duration as TimeDelta, macros};
	// self
	use super::*;

	const TTL: Duration = Duration::from_secs(3600);

	#[test]
	fn freshness_prefers_token_expiry_over_ttl() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let entry = CacheEntry::new(Token::new("a", "Bearer", 600, issued), issued);

		assert_eq!(entry.freshness_at(issued + TimeDelta::minutes(5), TTL), Freshness::Usable);
		assert_eq!(entry.freshness_at(issued + TimeDelta::minutes(9), TTL), Freshness::Expired);
	}

	#[test]
	fn freshness_evicts_entries_older_than_ttl() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let entry = CacheEntry::new(Token::new("a", "Bearer", 86_400, issued), issued);

		assert_eq!(entry.freshness_at(issued + TimeDelta::minutes(59), TTL), Freshness::Usable);
		assert_eq!(entry.freshness_at(issued + TimeDelta::hours(1), TTL), Freshness::Stale);
	}

	#[test]
	fn future_stored_at_counts_as_fresh() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let entry =
			CacheEntry::new(Token::new("a", "Bearer", 600, issued), issued + TimeDelta::minutes(1));

		assert_eq!(entry.freshness_at(issued, TTL), Freshness::Usable);
	}

	#[test]
	fn entry_round_trips_through_json() {
		let entry = CacheEntry::stored_now(Token::issued_now("a", "Bearer", 600));
		let encoded = serde_json::to_string(&entry).expect("Entry should serialize to JSON.");
		let decoded: CacheEntry =
			serde_json::from_str(&encoded).expect("Entry should deserialize from JSON.");

		assert_eq!(decoded, entry);
		assert_eq!(decoded.stored_at, entry.stored_at);
		assert_eq!(decoded.token.expires_at(), entry.token.expires_at());
	}

	#[test]
	fn default_key_matches_constant() {
		assert_eq!(CacheKey::default().as_str(), "oauth_token");
		assert_eq!(CacheKey::new("tenant-a").to_string(), "tenant-a");
	}
}
