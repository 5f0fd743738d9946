#![allow(dead_code)]

// std
use std::{
	net::SocketAddr,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use httpmock::prelude::*;
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::{TcpListener, TcpStream},
};
// self
use touristesim::{
	TouristEsim,
	cache::MemoryCache,
	config::{Config, ConfigBuilder},
	retry::{SleepFuture, Sleeper},
};

pub const CLIENT_ID: &str = "partner-client";
pub const CLIENT_SECRET: &str = "partner-secret";
pub const TOKEN_PATH: &str = "/oauth/token";
pub const ACCESS_TOKEN: &str = "access-token-1";
pub const TOKEN_BODY: &str =
	r#"{"access_token":"access-token-1","token_type":"Bearer","expires_in":3600}"#;

/// Settings pointing the API root at `{base}/v1`, so the token endpoint lands on `{base}/oauth/token`.
pub fn config(base: &str) -> ConfigBuilder {
	Config::builder(CLIENT_ID, CLIENT_SECRET).base_url(format!("{base}/v1"))
}

pub fn client(builder: ConfigBuilder, sleeper: &Arc<RecordingSleeper>) -> TouristEsim {
	let config = builder.build().expect("Test configuration should be valid.");

	TouristEsim::from_parts(config, Arc::new(MemoryCache::default()), sleeper.clone())
		.expect("Test client should build.")
}

pub async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await
}

/// Records requested backoff delays instead of waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);
impl RecordingSleeper {
	pub fn shared() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn recorded(&self) -> Vec<Duration> {
		self.0.lock().expect("Sleeper lock should not be poisoned.").clone()
	}
}
impl Sleeper for RecordingSleeper {
	fn sleep(&self, delay: Duration) -> SleepFuture<'_> {
		self.0.lock().expect("Sleeper lock should not be poisoned.").push(delay);

		Box::pin(async {})
	}
}

/// One canned HTTP response served by [`ScriptedServer`].
#[derive(Clone, Debug)]
pub struct Scripted {
	pub status: u16,
	pub headers: Vec<(&'static str, String)>,
	pub body: String,
}
impl Scripted {
	pub fn json(status: u16, body: &str) -> Self {
		Self { status, headers: Vec::new(), body: body.to_owned() }
	}

	pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
		self.headers.push((name, value.into()));

		self
	}
}

/// Minimal HTTP/1.1 server that answers successive requests with a fixed script.
///
/// Once the script is exhausted the last response repeats.
pub struct ScriptedServer {
	addr: SocketAddr,
	hits: Arc<AtomicUsize>,
}
impl ScriptedServer {
	pub async fn start(script: Vec<Scripted>) -> Self {
		let listener =
			TcpListener::bind("127.0.0.1:0").await.expect("Scripted server should bind a port.");
		let addr = listener.local_addr().expect("Scripted server should expose its address.");
		let hits = Arc::new(AtomicUsize::new(0));
		let counter = hits.clone();

		tokio::spawn(async move {
			while let Ok((stream, _)) = listener.accept().await {
				let index = counter.fetch_add(1, Ordering::SeqCst);
				let response = script
					.get(index)
					.or_else(|| script.last())
					.cloned()
					.expect("Script should contain at least one response.");

				tokio::spawn(serve(stream, response));
			}
		});

		Self { addr, hits }
	}

	pub fn base_url(&self) -> String {
		format!("http://{}", self.addr)
	}

	pub fn hits(&self) -> usize {
		self.hits.load(Ordering::SeqCst)
	}
}

async fn serve(mut stream: TcpStream, response: Scripted) {
	if read_request(&mut stream).await.is_none() {
		return;
	}

	let mut head = format!(
		"HTTP/1.1 {} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
		response.status,
		response.body.len()
	);

	for (name, value) in &response.headers {
		head.push_str(&format!("{name}: {value}\r\n"));
	}

	head.push_str("\r\n");
	head.push_str(&response.body);

	let _ = stream.write_all(head.as_bytes()).await;
	let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<()> {
	let mut buf = Vec::new();
	let mut chunk = [0_u8; 1024];
	let header_end = loop {
		let read = stream.read(&mut chunk).await.ok()?;

		if read == 0 {
			return None;
		}

		buf.extend_from_slice(&chunk[..read]);

		if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
			break pos + 4;
		}
	};
	let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
	let content_length = head
		.lines()
		.find_map(|line| line.strip_prefix("content-length:"))
		.and_then(|value| value.trim().parse::<usize>().ok())
		.unwrap_or(0);

	while buf.len() < header_end + content_length {
		let read = stream.read(&mut chunk).await.ok()?;

		if read == 0 {
			break;
		}

		buf.extend_from_slice(&chunk[..read]);
	}

	Some(())
}
