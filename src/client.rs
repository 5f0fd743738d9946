//! Top-level client that wires configuration, token manager, and request pipeline together.

// self
use crate::{
	_prelude::*,
	auth::TokenManager,
	cache::{MemoryCache, TokenCache},
	config::Config,
	http::ReqwestHttpClient,
	pipeline::{ApiRequest, RequestPipeline},
	retry::{Sleeper, TokioSleeper},
};

/// Entry point for the TouristeSIM partner API.
///
/// Cloning is cheap; clones share the HTTP connection pool and the token.
///
/// ```no_run
/// # async fn demo() -> touristesim::Result<()> {
/// let client = touristesim::TouristEsim::new("client-id", "client-secret")?;
/// let plans = client.get("/plans", &[("country", "FR")]).await?;
///
/// println!("{plans}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct TouristEsim {
	config: Arc<Config>,
	pipeline: RequestPipeline,
}
impl TouristEsim {
	/// Crate version reported in the default user agent.
	pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

	/// Builds a client with default settings and an in-memory token cache.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
		Self::with_config(Config::new(client_id, client_secret)?)
	}

	/// Builds a client from explicit settings and an in-memory token cache.
	pub fn with_config(config: Config) -> Result<Self> {
		Self::with_cache(config, Arc::new(MemoryCache::default()))
	}

	/// Builds a client that stores its token in `cache`, e.g. one shared by several clients.
	pub fn with_cache(config: Config, cache: Arc<dyn TokenCache>) -> Result<Self> {
		Self::from_parts(config, cache, Arc::new(TokioSleeper))
	}

	/// Builds a client from every replaceable part.
	pub fn from_parts(
		config: Config,
		cache: Arc<dyn TokenCache>,
		sleeper: Arc<dyn Sleeper>,
	) -> Result<Self> {
		let config = Arc::new(config);
		let http = ReqwestHttpClient::from_config(&config)?;
		let tokens = Arc::new(TokenManager::new(config.clone(), http.clone(), cache)?);
		let pipeline = RequestPipeline::with_sleeper(config.clone(), http, tokens, sleeper);

		Ok(Self { config, pipeline })
	}

	/// Crate version.
	pub fn version(&self) -> &'static str {
		Self::VERSION
	}

	/// Active settings.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Token manager, for callers that need the bearer token directly.
	pub fn tokens(&self) -> &TokenManager {
		self.pipeline.tokens()
	}

	/// Request pipeline.
	pub fn pipeline(&self) -> &RequestPipeline {
		&self.pipeline
	}

	/// Sends `method path` with optional query parameters and JSON body.
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		query: &[(&str, &str)],
		body: Option<Value>,
	) -> Result<Value> {
		self.pipeline.request(method, path, query, body).await
	}

	/// Executes a prepared [`ApiRequest`].
	pub async fn execute(&self, request: &ApiRequest) -> Result<Value> {
		self.pipeline.execute(request).await
	}

	/// `GET path?query`.
	pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
		self.pipeline.get(path, query).await
	}

	/// `POST path` with a JSON body.
	pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
		self.pipeline.post(path, body).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
		self.pipeline.put(path, body).await
	}

	/// `DELETE path`.
	pub async fn delete(&self, path: &str) -> Result<Value> {
		self.pipeline.delete(path).await
	}
}
