//! Client-credentials exchange built on the `oauth2` crate.
//!
//! The exchange posts `grant_type=client_credentials` with the client id and secret in the form
//! body. Non-2xx answers are mapped through [`Error::from_status`] using the body captured by the
//! instrumented transport, so token endpoint failures carry the same payload shape as API
//! failures.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::Token,
	config::Config,
	error::{ConfigError, ConnectionError, TokenResponseError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 3600;

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Performs the network half of a token request; caching lives in the token manager.
#[derive(Clone, Debug)]
pub struct ClientCredentialsExchange {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
	token_url: String,
	default_retry_after: Duration,
}
impl ClientCredentialsExchange {
	/// Builds the exchange from validated settings and a shared HTTP client.
	pub fn from_config(config: &Config, http_client: ReqwestHttpClient) -> Result<Self> {
		let token_url = config.token_url().to_string();
		let token_uri = TokenUrl::new(token_url.clone())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let oauth_client = BasicClient::new(ClientId::new(config.client_id().to_owned()))
			.set_client_secret(ClientSecret::new(config.client_secret().expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_uri);

		Ok(Self {
			oauth_client,
			http_client,
			token_url,
			default_retry_after: config.default_retry_after(),
		})
	}

	/// Token endpoint the exchange posts to.
	pub fn token_url(&self) -> &str {
		&self.token_url
	}

	/// Requests a fresh token from the token endpoint.
	pub async fn exchange(&self) -> Result<Token> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let outcome =
			self.oauth_client.exchange_client_credentials().request_async(&instrumented).await;

		match outcome {
			Ok(response) => map_token_response(response),
			Err(err) => self.map_request_error(meta.take(), err),
		}
	}

	fn map_request_error(
		&self,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
	) -> Result<Token> {
		if let Some(meta) = meta.as_ref().filter(|meta| meta.is_failure()) {
			return Err(map_failed_status(meta, self.default_retry_after));
		}

		let status = meta.as_ref().and_then(|meta| meta.status);

		match err {
			RequestTokenError::Request(inner) => Err(map_transport_error(inner)),
			RequestTokenError::Parse(source, body) => match lenient_token(&body) {
				Some(token) => token,
				None => Err(TokenResponseError::Parse { source, status }.into()),
			},
			RequestTokenError::Other(message) =>
				Err(TokenResponseError::Unexpected { message, status }.into()),
			RequestTokenError::ServerResponse(response) => Err(TokenResponseError::Unexpected {
				message: response.error().as_ref().to_owned(),
				status,
			}
			.into()),
		}
	}
}

fn map_failed_status(meta: &ResponseMetadata, default_retry_after: Duration) -> Error {
	let status = meta.status.unwrap_or_default();
	let retry_after = meta.retry_after.unwrap_or(default_retry_after);
	let err = Error::from_status(status, retry_after, meta.body.as_deref().unwrap_or_default());

	match err {
		Error::Authentication(response) =>
			Error::Authentication(response.with_message("Invalid client credentials")),
		other => other,
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => crate::http::map_reqwest_error(*inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => ConnectionError::from(inner).into(),
		HttpClientError::Other(message) =>
			ConnectionError::network(std::io::Error::other(message)).into(),
		_ => ConnectionError::network(std::io::Error::other("Unknown HTTP client failure.")).into(),
	}
}

fn map_token_response(response: BasicTokenResponse) -> Result<Token> {
	let expires_in = response.expires_in().map(|lifetime| lifetime.as_secs());

	build_token(response.access_token().secret(), response.token_type().as_ref(), expires_in)
}

fn build_token(access_token: &str, token_type: &str, expires_in: Option<u64>) -> Result<Token> {
	let expires_in = expires_in.unwrap_or(DEFAULT_EXPIRES_IN);

	if expires_in == 0 {
		return Err(TokenResponseError::NonPositiveExpiresIn.into());
	}
	if i64::try_from(expires_in).is_err() {
		return Err(TokenResponseError::ExpiresInOutOfRange.into());
	}

	Ok(Token::issued_now(access_token, token_type, expires_in))
}

/// Accepts payloads the strict OAuth schema rejects only because `token_type` is missing.
fn lenient_token(body: &[u8]) -> Option<Result<Token>> {
	#[derive(Deserialize)]
	struct LenientBody {
		access_token: String,
		#[serde(default)]
		token_type: Option<String>,
		#[serde(default)]
		expires_in: Option<u64>,
	}

	let parsed = serde_json::from_slice::<LenientBody>(body).ok()?;

	Some(build_token(
		&parsed.access_token,
		parsed.token_type.as_deref().unwrap_or_default(),
		parsed.expires_in,
	))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builds_request_body_client() {
		let config = Config::builder("client-id", "secret")
			.base_url("https://api.touristesim.net/v1")
			.build()
			.expect("Config fixture should be valid.");
		let exchange = ClientCredentialsExchange::from_config(&config, ReqwestHttpClient::default())
			.expect("Exchange should build from a valid config.");

		assert_eq!(exchange.token_url(), "https://api.touristesim.net/oauth/token");
	}

	#[test]
	fn token_defaults_apply() {
		let token = build_token("abc", "bearer", None).expect("Missing lifetime should default.");

		assert_eq!(token.expires_in(), DEFAULT_EXPIRES_IN);
		assert_eq!(token.token_type(), "Bearer");
		assert!(matches!(
			build_token("abc", "Bearer", Some(0)),
			Err(Error::TokenResponse(TokenResponseError::NonPositiveExpiresIn))
		));
		assert!(matches!(
			build_token("abc", "Bearer", Some(u64::MAX)),
			Err(Error::TokenResponse(TokenResponseError::ExpiresInOutOfRange))
		));
	}

	#[test]
	fn lenient_parse_fills_missing_token_type() {
		let token = lenient_token(br#"{"access_token":"abc","expires_in":120}"#)
			.expect("Body with an access token should be accepted.")
			.expect("Body with a positive lifetime should build a token.");

		assert_eq!(token.token_type(), "Bearer");
		assert_eq!(token.expires_in(), 120);
		assert!(lenient_token(br#"{"token_type":"Bearer"}"#).is_none());
		assert!(lenient_token(b"not json").is_none());
	}

	#[test]
	fn unauthorized_status_uses_credentials_message() {
		let meta = ResponseMetadata {
			status: Some(401),
			retry_after: None,
			body: Some(r#"{"message":"Unauthenticated."}"#.into()),
		};
		let err = map_failed_status(&meta, Duration::from_secs(60));

		assert!(matches!(
			&err,
			Error::Authentication(response) if response.message == "Invalid client credentials"
		));
		assert_eq!(err.status(), Some(401));

		let meta = ResponseMetadata { status: Some(429), retry_after: None, body: None };

		assert_eq!(
			map_failed_status(&meta, Duration::from_secs(9)).retry_after(),
			Some(Duration::from_secs(9))
		);
	}
}
