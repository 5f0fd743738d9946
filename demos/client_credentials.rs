//! Demonstrates the TouristeSIM client against a local mock: one token exchange shared by
//! several API calls, a 404 mapped to a typed error, and cache-backed token reuse.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use touristesim::{
	Error, TouristEsim,
	cache::{MemoryCache, TokenCache},
	config::{Config, Mode},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/plans").header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "data": [{ "id": 1, "name": "Europe 5GB", "price": 9.9 }] }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/orders/missing");
			then.status(404)
				.header("content-type", "application/json")
				.body("{\"message\":\"Order not found\"}");
		})
		.await;

	let cache: Arc<dyn TokenCache> = Arc::new(MemoryCache::default());
	let config = Config::builder("demo-client", "demo-secret")
		.base_url(server.url("/v1"))
		.mode(Mode::Sandbox)
		.build()?;
	let client = TouristEsim::with_cache(config.clone(), cache.clone())?;
	let plans = client.get("/plans", &[("country", "FR")]).await?;

	println!("Plans: {plans}.");

	match client.get("/orders/missing", &[]).await {
		Err(Error::NotFound(response)) => println!("Lookup failed: {}.", response.message),
		other => println!("Unexpected lookup outcome: {other:?}."),
	}

	// A second client sharing the cache hydrates the token instead of requesting one.
	let sibling = TouristEsim::with_cache(config, cache)?;
	let token = sibling.tokens().get_valid_token().await?;

	println!("Shared token expires in {}s.", token.time_remaining().as_secs());

	token_mock.assert_async().await;

	Ok(())
}
