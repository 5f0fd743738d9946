//! Token lifecycle orchestration with cache hydration and a singleflight guard.
//!
//! [`TokenManager::get_valid_token`] serves the in-memory token while it is unexpired, then
//! tries the configured [`TokenCache`], and only then calls the token endpoint. All slow paths
//! run under one async mutex and re-check the in-memory slot after acquiring it, so concurrent
//! callers piggy-back on the same in-flight request instead of stampeding the endpoint.

// self
use crate::{
	_prelude::*,
	auth::{Secret, Token},
	cache::{CacheEntry, Freshness, TokenCache},
	config::Config,
	http::ReqwestHttpClient,
	oauth::ClientCredentialsExchange,
	obs::{self, Operation, OperationSpan, Outcome},
};

/// Obtains, caches, and refreshes the bearer token for one set of client credentials.
pub struct TokenManager {
	config: Arc<Config>,
	exchange: ClientCredentialsExchange,
	cache: Arc<dyn TokenCache>,
	current: RwLock<Option<Token>>,
	refresh_guard: AsyncMutex<()>,
}
impl TokenManager {
	/// Creates a manager that shares `http` with the request pipeline.
	pub fn new(
		config: Arc<Config>,
		http: ReqwestHttpClient,
		cache: Arc<dyn TokenCache>,
	) -> Result<Self> {
		let exchange = ClientCredentialsExchange::from_config(&config, http)?;

		Ok(Self {
			config,
			exchange,
			cache,
			current: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
		})
	}

	/// Settings the manager was built with.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Backing cache shared with other managers configured with the same key.
	pub fn cache(&self) -> &Arc<dyn TokenCache> {
		&self.cache
	}

	/// Returns the in-memory token when it is still unexpired; never performs I/O.
	pub fn current(&self) -> Option<Token> {
		self.current.read().as_ref().filter(|token| !token.is_expired()).cloned()
	}

	/// Returns a valid token, consulting memory, then the cache, then the token endpoint.
	pub async fn get_valid_token(&self) -> Result<Token> {
		if let Some(token) = self.current() {
			obs::record_outcome(Operation::TokenRequest, Outcome::CacheHit);

			return Ok(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		if let Some(token) = self.current() {
			obs::record_outcome(Operation::TokenRequest, Outcome::CacheHit);

			return Ok(token);
		}
		if let Some(token) = self.hydrate().await? {
			obs::record_outcome(Operation::TokenRequest, Outcome::CacheHit);

			return Ok(token);
		}

		self.fetch_and_store().await
	}

	/// Access token of a valid bearer token.
	pub async fn token(&self) -> Result<Secret> {
		self.get_valid_token().await.map(|token| token.access_token().to_owned())
	}

	/// Forces a token request, replacing whatever is held in memory and in the cache.
	pub async fn request_token(&self) -> Result<Token> {
		let _singleflight = self.refresh_guard.lock().await;

		self.fetch_and_store().await
	}

	/// Drops the in-memory token and evicts the cache entry. Calling it twice is harmless.
	pub async fn revoke(&self) -> Result<()> {
		let _singleflight = self.refresh_guard.lock().await;

		self.current.write().take();
		self.cache.forget(self.config.cache_key()).await?;
		obs::token_event("revoked", None);

		Ok(())
	}

	async fn hydrate(&self) -> Result<Option<Token>> {
		let key = self.config.cache_key();
		let Some(entry) = self.cache.get(key).await? else {
			return Ok(None);
		};

		match entry.freshness_at(OffsetDateTime::now_utc(), self.config.cache_ttl()) {
			Freshness::Usable => {
				obs::token_event("hydrated", Some(entry.token.expires_in()));
				*self.current.write() = Some(entry.token.clone());

				Ok(Some(entry.token))
			},
			Freshness::Stale | Freshness::Expired => {
				obs::token_event("evicted", Some(entry.token.expires_in()));
				self.cache.forget(key).await?;

				Ok(None)
			},
		}
	}

	async fn fetch_and_store(&self) -> Result<Token> {
		const OPERATION: Operation = Operation::TokenRequest;

		let span = OperationSpan::new(OPERATION, "request_token");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async {
				let token = self.exchange.exchange().await?;

				self.cache
					.put(self.config.cache_key(), CacheEntry::stored_now(token.clone()))
					.await?;
				*self.current.write() = Some(token.clone());
				obs::token_event("fetched", Some(token.expires_in()));

				Ok::<_, Error>(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_outcome(OPERATION, Outcome::Failure),
		}

		result
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("token_url", &self.exchange.token_url())
			.field("cache_key", self.config.cache_key())
			.field("current", &*self.current.read())
			.finish_non_exhaustive()
	}
}
