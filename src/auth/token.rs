//! Immutable bearer token value object.

// crates.io
use time::Duration as TimeDelta;
// self
use crate::{_prelude::*, auth::Secret};

/// Safety margin subtracted from the nominal lifetime so a token is never used while it is about
/// to expire server-side.
pub const EXPIRATION_BUFFER: Duration = Duration::from_secs(60);

/// Token type reported when the endpoint omits or lower-cases the bearer type.
pub const BEARER: &str = "Bearer";

/// OAuth access token issued by the client-credentials grant.
///
/// `expires_at` is derived once from `issued_at + expires_in - EXPIRATION_BUFFER` and never
/// recomputed. Instants are kept at whole-second precision so the epoch-second cache form
/// restores them verbatim.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	access_token: Secret,
	token_type: String,
	expires_in: u64,
	#[serde(with = "time::serde::timestamp")]
	issued_at: OffsetDateTime,
	#[serde(with = "time::serde::timestamp")]
	expires_at: OffsetDateTime,
}
impl Token {
	/// Builds a token issued at `issued_at` with a lifetime of `expires_in` seconds.
	pub fn new(
		access_token: impl Into<String>,
		token_type: impl Into<String>,
		expires_in: u64,
		issued_at: OffsetDateTime,
	) -> Self {
		let lifetime = TimeDelta::seconds(i64::try_from(expires_in).unwrap_or(i64::MAX));
		let buffer = TimeDelta::seconds(EXPIRATION_BUFFER.as_secs() as i64);
		let issued_at = whole_seconds(issued_at);
		let expires_at = issued_at.saturating_add(lifetime).saturating_sub(buffer);

		Self {
			access_token: Secret::new(access_token),
			token_type: normalize_token_type(token_type.into()),
			expires_in,
			issued_at,
			expires_at,
		}
	}

	/// Builds a token stamped with the current clock.
	pub fn issued_now(
		access_token: impl Into<String>,
		token_type: impl Into<String>,
		expires_in: u64,
	) -> Self {
		Self::new(access_token, token_type, expires_in, OffsetDateTime::now_utc())
	}

	/// Access token secret; callers must avoid logging it.
	pub fn access_token(&self) -> &Secret {
		&self.access_token
	}

	/// Token type reported by the endpoint; informational only.
	pub fn token_type(&self) -> &str {
		&self.token_type
	}

	/// Nominal lifetime in seconds as returned by the token endpoint.
	pub fn expires_in(&self) -> u64 {
		self.expires_in
	}

	/// Instant the token was issued.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// Instant after which the client treats the token as expired.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Returns `true` if the token is expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Remaining usable lifetime at the provided instant, clamped to zero.
	pub fn time_remaining_at(&self, instant: OffsetDateTime) -> Duration {
		Duration::try_from(self.expires_at - instant).unwrap_or(Duration::ZERO)
	}

	/// Remaining usable lifetime relative to the current clock.
	pub fn time_remaining(&self) -> Duration {
		self.time_remaining_at(OffsetDateTime::now_utc())
	}

	/// Formats the `Authorization` header value.
	///
	/// The API only accepts the bearer scheme, whatever `token_type` the endpoint reported.
	pub fn authorization_header(&self) -> String {
		format!("{BEARER} {}", self.access_token.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Drops the sub-second part of `instant`.
pub(crate) fn whole_seconds(instant: OffsetDateTime) -> OffsetDateTime {
	instant - TimeDelta::nanoseconds(i64::from(instant.nanosecond()))
}

fn normalize_token_type(raw: String) -> String {
	if raw.trim().is_empty() || raw.eq_ignore_ascii_case(BEARER) { BEARER.into() } else { raw }
}
