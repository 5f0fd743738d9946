//! Async Rust client for the TouristeSIM partner API: OAuth client-credentials token lifecycle,
//! a retrying transport, and a typed error taxonomy.
//!
//! The crate is built around two pieces:
//!
//! - [`auth::TokenManager`] obtains, caches, and refreshes the bearer token, making sure at most
//!   one token request is in flight at a time.
//! - [`pipeline::RequestPipeline`] executes one logical API call with bounded retries, rate-limit
//!   backoff, and status-to-error mapping.
//!
//! [`TouristEsim`] wires both together from a [`config::Config`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod pipeline;
pub mod retry;

pub use client::TouristEsim;
pub use error::{Error, Result};

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::{Duration, Instant},
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, Method};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
