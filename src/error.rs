//! Client-level error types shared by the token manager, the request pipeline, and caches.
//!
//! HTTP failures are mapped by [`Error::from_status`], a pure function of the status code, the
//! resolved `Retry-After` delay, and the raw response body. The token manager and the request
//! pipeline both go through it so every surfaced error carries the same payload shape.

// crates.io
use reqwest::StatusCode;
// self
use crate::{_prelude::*, cache::CacheError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credentials or bearer token were rejected (HTTP 401).
	#[error("Authentication failed: {}", .0.message)]
	Authentication(ErrorResponse),
	/// Request payload failed server-side validation (HTTP 422).
	#[error("Validation failed: {}", .response.message)]
	Validation {
		/// Parsed response details.
		response: ErrorResponse,
		/// Field-level messages keyed by field name.
		errors: BTreeMap<String, Vec<String>>,
	},
	/// Rate limit exceeded and no retries remain (HTTP 429).
	#[error("Rate limit exceeded; retry after {}s: {}", .retry_after.as_secs(), .response.message)]
	RateLimited {
		/// Parsed response details.
		response: ErrorResponse,
		/// Server-directed delay before the next call.
		retry_after: Duration,
	},
	/// Requested resource does not exist (HTTP 404).
	#[error("Resource not found: {}", .0.message)]
	NotFound(ErrorResponse),
	/// Upstream failure and no retries remain (HTTP 5xx).
	#[error("Server error ({}): {}", .response.status, .response.message)]
	Server {
		/// Parsed response details.
		response: ErrorResponse,
		/// Set when the API reported maintenance mode (HTTP 503).
		maintenance: bool,
	},
	/// Uncategorized client error (any other HTTP 4xx).
	#[error("API error ({}): {}", .0.status, .0.message)]
	Api(ErrorResponse),
	/// Network failure (timeout, refused connection, reset) and no retries remain.
	#[error(transparent)]
	Connection(#[from] ConnectionError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token cache backend failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		CacheError,
	),
	/// Token endpoint answered 2xx with a payload that is not a usable token.
	#[error(transparent)]
	TokenResponse(#[from] TokenResponseError),
	/// A successful API response carried a body that is not valid JSON.
	#[error("Response body with status {status} is not valid JSON.")]
	Decode {
		/// HTTP status code of the response.
		status: u16,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
}
impl Error {
	/// Maps an unsuccessful HTTP response onto the error taxonomy.
	///
	/// `retry_after` is the already-resolved delay (header value or the configured default) and
	/// is only used for HTTP 429. The function never fails: bodies that are not JSON fall back to
	/// their raw text as the message.
	pub fn from_status(status: u16, retry_after: Duration, text: &str) -> Self {
		let response = ErrorResponse::from_body(status, text);

		match status {
			401 => Self::Authentication(response),
			404 => Self::NotFound(response),
			422 => {
				let errors = field_errors(&response.body);

				Self::Validation { response, errors }
			},
			429 => Self::RateLimited { response, retry_after },
			503 => Self::Server { response, maintenance: true },
			500.. => Self::Server { response, maintenance: false },
			_ => Self::Api(response),
		}
	}

	/// Returns the HTTP status code that produced the error, when one exists.
	pub fn status(&self) -> Option<u16> {
		self.response().map(|response| response.status)
	}

	/// Returns the parsed response details for HTTP-originated errors.
	pub fn response(&self) -> Option<&ErrorResponse> {
		match self {
			Self::Authentication(response)
			| Self::NotFound(response)
			| Self::Api(response)
			| Self::Validation { response, .. }
			| Self::RateLimited { response, .. }
			| Self::Server { response, .. } => Some(response),
			_ => None,
		}
	}

	/// Field-level validation messages for [`Error::Validation`].
	pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
		match self {
			Self::Validation { errors, .. } => Some(errors),
			_ => None,
		}
	}

	/// Server-directed delay carried by [`Error::RateLimited`].
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::RateLimited { retry_after, .. } => Some(*retry_after),
			_ => None,
		}
	}

	/// Returns `true` for transient failures (429, 5xx, network) the pipeline retries locally.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::RateLimited { .. } | Self::Server { .. } | Self::Connection(_))
	}
}

/// Parsed details of an unsuccessful HTTP response.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorResponse {
	/// HTTP status code.
	pub status: u16,
	/// Human-readable message (`message` field, raw body text, or the status reason).
	pub message: String,
	/// Parsed JSON body, or [`Value::Null`] when the body is not JSON.
	pub body: Value,
}
impl ErrorResponse {
	/// Builds the response details from a status code and raw body text.
	pub fn from_body(status: u16, text: &str) -> Self {
		let body = serde_json::from_str::<Value>(text).unwrap_or(Value::Null);
		let message = body
			.get("message")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.or_else(|| Some(text.trim()).filter(|raw| !raw.is_empty()).map(str::to_owned))
			.unwrap_or_else(|| {
				StatusCode::from_u16(status)
					.ok()
					.and_then(|code| code.canonical_reason())
					.unwrap_or("Unknown error")
					.to_owned()
			});

		Self { status, message, body }
	}

	/// Overrides the message while keeping status and body.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();

		self
	}
}

/// Network-level failures, split by cause.
#[derive(Debug, ThisError)]
pub enum ConnectionError {
	/// Connect or read timeout elapsed.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Connection could not be established (refused, DNS, TLS handshake).
	#[error("Connection failed.")]
	ConnectFailed {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Any other transport failure (reset, truncated body, I/O).
	#[error("Network error occurred.")]
	Other {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}
impl ConnectionError {
	/// Wraps a transport failure that is neither a timeout nor a connect failure.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Other { source: Box::new(src) }
	}

	/// Returns `true` when the failure was a timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}

	/// Returns `true` when the connection could not be established.
	pub fn is_connect(&self) -> bool {
		matches!(self, Self::ConnectFailed { .. })
	}
}
impl From<ReqwestError> for ConnectionError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout { source: Box::new(e) }
		} else if e.is_connect() {
			Self::ConnectFailed { source: Box::new(e) }
		} else {
			Self::network(e)
		}
	}
}
impl From<std::io::Error> for ConnectionError {
	fn from(e: std::io::Error) -> Self {
		Self::network(e)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A required credential is empty.
	#[error("The {field} must not be empty.")]
	MissingCredential {
		/// Which credential was empty.
		field: &'static str,
	},
	/// A configured URL cannot be parsed.
	#[error("The {field} is not a valid URL: {value}.")]
	InvalidUrl {
		/// Which setting failed validation.
		field: &'static str,
		/// Offending value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token endpoint URL was rejected by the OAuth client.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// A URL scheme other than http(s) was configured.
	#[error("The {field} must use http or https: {value}.")]
	UnsupportedScheme {
		/// Which setting failed validation.
		field: &'static str,
		/// Offending value.
		value: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token endpoint answered successfully but the payload is unusable.
#[derive(Debug, ThisError)]
pub enum TokenResponseError {
	/// Token endpoint responded with JSON that does not match the token schema.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure, including the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint returned something the OAuth client could not interpret.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint returned a zero lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned an excessively large lifetime.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}

fn field_errors(body: &Value) -> BTreeMap<String, Vec<String>> {
	let Some(errors) = body.get("errors").and_then(Value::as_object) else {
		return BTreeMap::new();
	};

	errors
		.iter()
		.map(|(field, messages)| {
			let messages = match messages {
				Value::String(message) => vec![message.clone()],
				Value::Array(items) => items
					.iter()
					.map(|item| match item {
						Value::String(message) => message.clone(),
						other => other.to_string(),
					})
					.collect(),
				other => vec![other.to_string()],
			};

			(field.clone(), messages)
		})
		.collect()
}
