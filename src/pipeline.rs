//! Retrying request pipeline for resource endpoints.
//!
//! Each logical call runs up to `max_retries + 1` sequential attempts. Every attempt re-reads
//! the token from the [`TokenManager`], so a refresh that happens between attempts is picked up
//! without extra bookkeeping. Failures are classified by [`RetryPolicy::decide`].

// crates.io
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::TokenManager,
	config::Config,
	http::{self, ReqwestHttpClient},
	obs::{self, Operation, OperationSpan, Outcome},
	retry::{RetryDecision, RetryPolicy, Sleeper},
};

const JSON: &str = "application/json";

/// One logical API call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	method: Method,
	path: String,
	query: Vec<(String, String)>,
	body: Option<Value>,
	deadline: Option<Instant>,
}
impl ApiRequest {
	/// Creates a request for `path`, resolved against the configured base URL.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None, deadline: None }
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets the JSON body.
	pub fn json(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Stops retrying once the next backoff would end after `deadline`.
	///
	/// An attempt already in flight is never aborted; only the waits between attempts are
	/// checked.
	pub fn deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(deadline);

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Path relative to the base URL.
	pub fn path(&self) -> &str {
		&self.path
	}

	fn allows_wait(&self, delay: Duration) -> bool {
		self.deadline
			.is_none_or(|deadline| deadline.saturating_duration_since(Instant::now()) >= delay)
	}
}

/// Executes API calls with authentication, retries, and status mapping.
#[derive(Clone)]
pub struct RequestPipeline {
	config: Arc<Config>,
	http: ReqwestHttpClient,
	tokens: Arc<TokenManager>,
	sleeper: Arc<dyn Sleeper>,
	policy: RetryPolicy,
}
impl RequestPipeline {
	/// Creates a pipeline that sleeps on the tokio timer.
	pub fn new(config: Arc<Config>, http: ReqwestHttpClient, tokens: Arc<TokenManager>) -> Self {
		Self::with_sleeper(config, http, tokens, Arc::new(crate::retry::TokioSleeper))
	}

	/// Creates a pipeline with a custom [`Sleeper`], e.g. one that records delays in tests.
	pub fn with_sleeper(
		config: Arc<Config>,
		http: ReqwestHttpClient,
		tokens: Arc<TokenManager>,
		sleeper: Arc<dyn Sleeper>,
	) -> Self {
		let policy = RetryPolicy::from_config(&config);

		Self { config, http, tokens, sleeper, policy }
	}

	/// Token manager used to authenticate attempts.
	pub fn tokens(&self) -> &Arc<TokenManager> {
		&self.tokens
	}

	/// Retry policy derived from the configuration.
	pub fn policy(&self) -> RetryPolicy {
		self.policy
	}

	/// Sends `method path` with optional query parameters and JSON body.
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		query: &[(&str, &str)],
		body: Option<Value>,
	) -> Result<Value> {
		let mut request = ApiRequest::new(method, path);

		for (key, value) in query {
			request = request.query(*key, *value);
		}
		if let Some(body) = body {
			request = request.json(body);
		}

		self.execute(&request).await
	}

	/// `GET path?query`.
	pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
		self.request(Method::GET, path, query, None).await
	}

	/// `POST path` with a JSON body.
	pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
		self.request(Method::POST, path, &[], Some(body)).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
		self.request(Method::PUT, path, &[], Some(body)).await
	}

	/// `DELETE path`.
	pub async fn delete(&self, path: &str) -> Result<Value> {
		self.request(Method::DELETE, path, &[], None).await
	}

	/// Runs the retry loop for `request` and returns the decoded JSON payload.
	pub async fn execute(&self, request: &ApiRequest) -> Result<Value> {
		const OPERATION: Operation = Operation::ApiRequest;

		let span = OperationSpan::new(OPERATION, "execute");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span.instrument(self.run(request)).await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	async fn run(&self, request: &ApiRequest) -> Result<Value> {
		let url = self.config.api_url(&request.path)?;
		let mut attempt = 0;

		loop {
			let err = match self.attempt(request, &url).await {
				Ok(value) => return Ok(value),
				Err(e) => e,
			};
			let delay = match self.policy.decide(&err, attempt) {
				RetryDecision::Retry(delay) if request.allows_wait(delay) => delay,
				_ => return Err(err),
			};

			attempt += 1;

			obs::retry_scheduled(Operation::ApiRequest, attempt, delay, &err);
			obs::record_outcome(Operation::ApiRequest, Outcome::Retry);
			self.sleeper.sleep(delay).await;
		}
	}

	async fn attempt(&self, request: &ApiRequest, url: &Url) -> Result<Value> {
		let token = self.tokens.get_valid_token().await?;
		let mut builder = self
			.http
			.request(request.method.clone(), url.clone())
			.header(AUTHORIZATION, token.authorization_header())
			.header(ACCEPT, JSON)
			.header(CONTENT_TYPE, JSON);

		if !request.query.is_empty() {
			builder = builder.query(&request.query);
		}
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(http::map_reqwest_error)?;
		let status = response.status();
		let retry_after = http::parse_retry_after(response.headers())
			.unwrap_or(self.config.default_retry_after());
		let bytes = response.bytes().await.map_err(http::map_reqwest_error)?;

		if !status.is_success() {
			return Err(Error::from_status(
				status.as_u16(),
				retry_after,
				&String::from_utf8_lossy(&bytes),
			));
		}
		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Value::Null);
		}

		serde_json::from_slice(&bytes)
			.map_err(|source| Error::Decode { status: status.as_u16(), source })
	}
}
impl Debug for RequestPipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestPipeline")
			.field("base_url", &self.config.base_url().as_str())
			.field("policy", &self.policy)
			.finish_non_exhaustive()
	}
}
