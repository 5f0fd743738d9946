//! Immutable client settings and their builder.

// self
use crate::{_prelude::*, auth::Secret, cache::CacheKey, error::ConfigError};

/// Production API root used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.touristesim.net/v1";

/// Operating mode reported by the configuration.
///
/// The mode is informational: it never rewrites endpoints on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	/// Partner sandbox account.
	#[default]
	Sandbox,
	/// Live partner account.
	Production,
}
impl Mode {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Mode::Sandbox => "sandbox",
			Mode::Production => "production",
		}
	}
}
impl Display for Mode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Validated, read-only client settings.
///
/// Build one through [`Config::builder`]; every SDK component holds it behind an `Arc`.
#[derive(Clone)]
pub struct Config {
	client_id: String,
	client_secret: Secret,
	base_url: Url,
	token_url: Url,
	mode: Mode,
	timeout: Duration,
	connect_timeout: Duration,
	verify_ssl: bool,
	user_agent: String,
	max_retries: u32,
	retry_base_delay: Duration,
	default_retry_after: Duration,
	cache_ttl: Duration,
	cache_key: CacheKey,
}
impl Config {
	/// Returns a builder seeded with the default settings.
	pub fn builder(client_id: impl Into<String>, client_secret: impl Into<String>) -> ConfigBuilder {
		ConfigBuilder::new(client_id, client_secret)
	}

	/// Builds a configuration that uses every default.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		Self::builder(client_id, client_secret).build()
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// OAuth client secret; never log it.
	pub fn client_secret(&self) -> &Secret {
		&self.client_secret
	}

	/// API root that resource paths are appended to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// OAuth token endpoint.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}

	/// Operating mode.
	pub fn mode(&self) -> Mode {
		self.mode
	}

	/// Returns `true` in sandbox mode.
	pub fn is_sandbox(&self) -> bool {
		self.mode == Mode::Sandbox
	}

	/// Returns `true` in production mode.
	pub fn is_production(&self) -> bool {
		self.mode == Mode::Production
	}

	/// Total per-request timeout.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Connection establishment timeout.
	pub fn connect_timeout(&self) -> Duration {
		self.connect_timeout
	}

	/// Whether TLS certificates are verified.
	pub fn verify_ssl(&self) -> bool {
		self.verify_ssl
	}

	/// `User-Agent` sent with every request.
	pub fn user_agent(&self) -> &str {
		&self.user_agent
	}

	/// Retries after the first attempt; `max_retries + 1` attempts in total.
	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	/// Base of the linear backoff applied to server and network failures.
	pub fn retry_base_delay(&self) -> Duration {
		self.retry_base_delay
	}

	/// Wait applied to HTTP 429 responses without a usable `Retry-After` header.
	pub fn default_retry_after(&self) -> Duration {
		self.default_retry_after
	}

	/// Age after which a cached token entry is evicted even if the token is still live.
	pub fn cache_ttl(&self) -> Duration {
		self.cache_ttl
	}

	/// Cache key under which the token is stored.
	pub fn cache_key(&self) -> &CacheKey {
		&self.cache_key
	}

	/// Resolves an API path against the base URL.
	pub fn api_url(&self, path: &str) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = if path.is_empty() || path.starts_with('/') {
			format!("{base}{path}")
		} else {
			format!("{base}/{path}")
		};

		Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl {
			field: "request path",
			value: path.to_owned(),
			source,
		})
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("base_url", &self.base_url.as_str())
			.field("token_url", &self.token_url.as_str())
			.field("mode", &self.mode)
			.field("timeout", &self.timeout)
			.field("connect_timeout", &self.connect_timeout)
			.field("verify_ssl", &self.verify_ssl)
			.field("user_agent", &self.user_agent)
			.field("max_retries", &self.max_retries)
			.field("retry_base_delay", &self.retry_base_delay)
			.field("default_retry_after", &self.default_retry_after)
			.field("cache_ttl", &self.cache_ttl)
			.field("cache_key", &self.cache_key)
			.finish()
	}
}

/// Builder for [`Config`] values.
#[derive(Clone)]
pub struct ConfigBuilder {
	client_id: String,
	client_secret: Secret,
	base_url: String,
	token_url: Option<String>,
	mode: Mode,
	timeout: Duration,
	connect_timeout: Duration,
	verify_ssl: bool,
	user_agent: Option<String>,
	max_retries: u32,
	retry_base_delay: Duration,
	default_retry_after: Duration,
	cache_ttl: Duration,
	cache_key: CacheKey,
}
impl ConfigBuilder {
	const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
	const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
	const DEFAULT_MAX_RETRIES: u32 = 3;
	const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);
	const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(100);
	const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

	fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: Secret::new(client_secret),
			base_url: DEFAULT_BASE_URL.into(),
			token_url: None,
			mode: Mode::default(),
			timeout: Self::DEFAULT_TIMEOUT,
			connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
			verify_ssl: true,
			user_agent: None,
			max_retries: Self::DEFAULT_MAX_RETRIES,
			retry_base_delay: Self::DEFAULT_RETRY_BASE_DELAY,
			default_retry_after: Self::DEFAULT_RETRY_AFTER,
			cache_ttl: Self::DEFAULT_CACHE_TTL,
			cache_key: CacheKey::default(),
		}
	}

	/// Overrides the API root.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = url.into();

		self
	}

	/// Overrides the token endpoint (defaults to `<base_url>/../oauth/token`).
	pub fn token_url(mut self, url: impl Into<String>) -> Self {
		self.token_url = Some(url.into());

		self
	}

	/// Sets the operating mode.
	pub fn mode(mut self, mode: Mode) -> Self {
		self.mode = mode;

		self
	}

	/// Sets the total per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Sets the connection establishment timeout.
	pub fn connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;

		self
	}

	/// Enables or disables TLS certificate verification.
	pub fn verify_ssl(mut self, verify: bool) -> Self {
		self.verify_ssl = verify;

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Sets how many times a transient failure is retried.
	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Sets the linear backoff base (defaults to 100ms).
	pub fn retry_base_delay(mut self, delay: Duration) -> Self {
		self.retry_base_delay = delay;

		self
	}

	/// Sets the wait used for HTTP 429 without a `Retry-After` header (defaults to 60s).
	pub fn default_retry_after(mut self, delay: Duration) -> Self {
		self.default_retry_after = delay;

		self
	}

	/// Sets the cache entry TTL (defaults to one hour).
	pub fn cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache_ttl = ttl;

		self
	}

	/// Overrides the cache key, e.g. to share one cache between several clients.
	pub fn cache_key(mut self, key: CacheKey) -> Self {
		self.cache_key = key;

		self
	}

	/// Validates the settings and produces a [`Config`].
	pub fn build(self) -> Result<Config, ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingCredential { field: "client id" });
		}
		if self.client_secret.is_blank() {
			return Err(ConfigError::MissingCredential { field: "client secret" });
		}

		let base_trimmed = self.base_url.trim().trim_end_matches('/');
		let base_url = parse_http_url("base URL", base_trimmed)?;
		let token_url = match &self.token_url {
			Some(custom) => parse_http_url("token URL", custom.trim())?,
			None => parse_http_url("token URL", &format!("{base_trimmed}/../oauth/token"))?,
		};
		let user_agent = self.user_agent.unwrap_or_else(default_user_agent);

		Ok(Config {
			client_id: self.client_id,
			client_secret: self.client_secret,
			base_url,
			token_url,
			mode: self.mode,
			timeout: self.timeout,
			connect_timeout: self.connect_timeout,
			verify_ssl: self.verify_ssl,
			user_agent,
			max_retries: self.max_retries,
			retry_base_delay: self.retry_base_delay,
			default_retry_after: self.default_retry_after,
			cache_ttl: self.cache_ttl,
			cache_key: self.cache_key,
		})
	}
}
impl Debug for ConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConfigBuilder")
			.field("client_id", &self.client_id)
			.field("base_url", &self.base_url)
			.field("token_url", &self.token_url)
			.field("mode", &self.mode)
			.finish_non_exhaustive()
	}
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
		field,
		value: value.to_owned(),
		source,
	})?;

	match url.scheme() {
		"http" | "https" => Ok(url),
		_ => Err(ConfigError::UnsupportedScheme { field, value: value.to_owned() }),
	}
}

fn default_user_agent() -> String {
	format!("TouristeSIM-SDK/{} (Rust)", env!("CARGO_PKG_VERSION"))
}
