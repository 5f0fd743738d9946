mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use touristesim::{
	Error, TouristEsim,
	auth::EXPIRATION_BUFFER,
	cache::{CacheKey, MemoryCache},
	error::TokenResponseError,
};

#[tokio::test]
async fn token_is_requested_once_and_reused() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.header("accept", "application/json");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let first = client.tokens().get_valid_token().await.expect("First token request should succeed.");
	let second =
		client.tokens().get_valid_token().await.expect("Second call should reuse the token.");

	mock.assert_calls_async(1).await;

	assert_eq!(first, second);
	assert_eq!(first.access_token().expose(), ACCESS_TOKEN);
	assert_eq!(first.token_type(), "Bearer");
	assert_eq!(first.expires_in(), 3600);
	assert_eq!(
		first.expires_at() - first.issued_at(),
		Duration::from_secs(3600) - EXPIRATION_BUFFER
	);
	assert!(!first.is_expired());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_token_request() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(TOKEN_BODY)
				.delay(Duration::from_millis(200));
		})
		.await;
	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let handles = (0..8)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move { client.tokens().get_valid_token().await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let token = handle
			.await
			.expect("Token task should not panic.")
			.expect("Concurrent token request should succeed.");

		assert_eq!(token.access_token().expose(), ACCESS_TOKEN);
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_credentials_surface_authentication_error() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"message":"Unauthenticated."}"#);
		})
		.await;
	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let err = client.tokens().get_valid_token().await.expect_err("Bad credentials should fail.");

	mock.assert_calls_async(1).await;

	let Error::Authentication(response) = &err else {
		panic!("Expected an authentication error, got {err:?}.");
	};

	assert_eq!(response.status, 401);
	assert_eq!(response.message, "Invalid client credentials");
	assert_eq!(response.body["message"], "Unauthenticated.");
	assert!(!err.is_retryable());
}

#[tokio::test]
async fn token_endpoint_outage_maps_to_server_error() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(503).body("down for maintenance");
		})
		.await;
	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let err = client.tokens().get_valid_token().await.expect_err("Outage should fail.");

	mock.assert_calls_async(1).await;

	assert!(matches!(err, Error::Server { maintenance: true, .. }));
	assert_eq!(err.response().map(|r| r.message.as_str()), Some("down for maintenance"));
	assert!(client.tokens().current().is_none());
}

#[tokio::test]
async fn malformed_token_payload_reports_parse_error() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":5,"token_type":"Bearer"}"#);
		})
		.await;

	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let err = client.tokens().get_valid_token().await.expect_err("Bad payload should fail.");

	assert!(matches!(err, Error::TokenResponse(TokenResponseError::Parse { .. })));
}

#[tokio::test]
async fn missing_lifetime_and_type_use_defaults() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"bare"}"#);
		})
		.await;

	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let token = client.tokens().get_valid_token().await.expect("Minimal payload should succeed.");

	assert_eq!(token.access_token().expose(), "bare");
	assert_eq!(token.token_type(), "Bearer");
	assert_eq!(token.expires_in(), 3600);
}

#[tokio::test]
async fn zero_lifetime_is_rejected() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"t","token_type":"Bearer","expires_in":0}"#);
		})
		.await;

	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let err = client.tokens().get_valid_token().await.expect_err("Zero lifetime should fail.");

	assert!(matches!(err, Error::TokenResponse(TokenResponseError::NonPositiveExpiresIn)));
}

#[tokio::test]
async fn shared_cache_hydrates_other_clients() {
	let server = MockServer::start_async().await;
	let mock = mock_token(&server).await;
	let cache = Arc::new(MemoryCache::default());
	let build = || {
		let config = config(&server.base_url()).build().expect("Test configuration should be valid.");

		TouristEsim::with_cache(config, cache.clone()).expect("Client should build.")
	};
	let first = build();
	let second = build();
	let issued = first.tokens().get_valid_token().await.expect("First client should fetch.");

	assert!(cache.contains(&CacheKey::default()));

	let hydrated = second.tokens().get_valid_token().await.expect("Second client should hydrate.");

	mock.assert_calls_async(1).await;

	assert_eq!(hydrated, issued);
	assert_eq!(hydrated.expires_at(), issued.expires_at());
}

#[tokio::test]
async fn revoke_forces_a_new_request() {
	let server = MockServer::start_async().await;
	let mock = mock_token(&server).await;
	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let manager = client.tokens();

	manager.get_valid_token().await.expect("Initial token request should succeed.");
	manager.revoke().await.expect("Revoke should succeed.");

	assert!(manager.current().is_none());
	assert!(
		manager
			.cache()
			.get(&CacheKey::default())
			.await
			.expect("Cache read should succeed.")
			.is_none()
	);

	manager.get_valid_token().await.expect("Token should be requested again.");
	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn forced_request_replaces_cached_token() {
	let server = MockServer::start_async().await;
	let mock = mock_token(&server).await;
	let client = client(config(&server.base_url()), &RecordingSleeper::shared());
	let manager = client.tokens();

	manager.get_valid_token().await.expect("Initial token request should succeed.");
	manager.request_token().await.expect("Forced token request should succeed.");

	assert_eq!(
		manager.token().await.expect("Token should be served from memory.").expose(),
		ACCESS_TOKEN
	);

	mock.assert_calls_async(2).await;
}
