//! Retry classification and the sleep seam used between attempts.
//!
//! [`RetryPolicy::decide`] is a pure function of the error and the attempt index, which keeps the
//! request loop small and lets tests assert exact delays through a recording [`Sleeper`].

// self
use crate::{_prelude::*, config::Config};

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Suspends the current task between attempts.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Waits for `delay` without blocking other tasks.
	fn sleep(&self, delay: Duration) -> SleepFuture<'_>;
}

/// Production sleeper backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
impl Sleeper for TokioSleeper {
	fn sleep(&self, delay: Duration) -> SleepFuture<'_> {
		Box::pin(tokio::time::sleep(delay))
	}
}

/// What the request loop should do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
	/// Wait for the delay, then try again.
	Retry(Duration),
	/// Transient failure, but no attempts remain.
	Exhausted,
	/// Failure that retrying cannot fix.
	Permanent,
}

/// Bounded retry policy with linear backoff and server-directed rate-limit waits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries allowed after the first attempt.
	pub max_retries: u32,
	/// Linear backoff unit for server and network failures.
	pub base_delay: Duration,
}
impl RetryPolicy {
	/// Reads the policy from the client settings.
	pub fn from_config(config: &Config) -> Self {
		Self { max_retries: config.max_retries(), base_delay: config.retry_base_delay() }
	}

	/// Total attempts a single logical request may make.
	pub fn max_attempts(&self) -> u32 {
		self.max_retries.saturating_add(1)
	}

	/// Backoff before the retry that follows the zero-based `attempt`: `base * (attempt + 1)`.
	pub fn linear_delay(&self, attempt: u32) -> Duration {
		self.base_delay.saturating_mul(attempt.saturating_add(1))
	}

	/// Classifies the failure of the zero-based `attempt`.
	///
	/// Rate limits wait for the server-provided delay; server and network failures use linear
	/// backoff; everything else fails immediately.
	pub fn decide(&self, err: &Error, attempt: u32) -> RetryDecision {
		if !err.is_retryable() {
			return RetryDecision::Permanent;
		}
		if attempt >= self.max_retries {
			return RetryDecision::Exhausted;
		}

		match err.retry_after() {
			Some(wait) => RetryDecision::Retry(wait),
			None => RetryDecision::Retry(self.linear_delay(attempt)),
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_retries: 3, base_delay: Duration::from_millis(100) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ConnectionError;

	const WAIT: Duration = Duration::from_secs(60);

	#[test]
	fn linear_backoff_grows_per_attempt() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.linear_delay(0), Duration::from_millis(100));
		assert_eq!(policy.linear_delay(1), Duration::from_millis(200));
		assert_eq!(policy.linear_delay(2), Duration::from_millis(300));
		assert_eq!(policy.max_attempts(), 4);
	}

	#[test]
	fn rate_limits_wait_for_server_delay() {
		let policy = RetryPolicy::default();
		let limited = Error::from_status(429, Duration::from_secs(2), "");

		assert_eq!(policy.decide(&limited, 0), RetryDecision::Retry(Duration::from_secs(2)));
		assert_eq!(policy.decide(&limited, 3), RetryDecision::Exhausted);
	}

	#[test]
	fn server_and_network_failures_back_off_linearly() {
		let policy = RetryPolicy::default();
		let server = Error::from_status(502, WAIT, "");
		let network = Error::from(ConnectionError::from(std::io::Error::other("reset")));

		assert_eq!(policy.decide(&server, 1), RetryDecision::Retry(Duration::from_millis(200)));
		assert_eq!(policy.decide(&network, 2), RetryDecision::Retry(Duration::from_millis(300)));
		assert_eq!(policy.decide(&network, 3), RetryDecision::Exhausted);
	}

	#[test]
	fn client_errors_are_permanent() {
		let policy = RetryPolicy::default();

		for status in [400, 401, 403, 404, 409, 422] {
			assert_eq!(
				policy.decide(&Error::from_status(status, WAIT, ""), 0),
				RetryDecision::Permanent
			);
		}
	}

	#[test]
	fn zero_retries_exhaust_immediately() {
		let policy = RetryPolicy { max_retries: 0, ..Default::default() };

		assert_eq!(policy.decide(&Error::from_status(500, WAIT, ""), 0), RetryDecision::Exhausted);
	}
}
