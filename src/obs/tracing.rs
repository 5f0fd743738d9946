// self
use crate::{_prelude::*, obs::Operation};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by the token manager and the request pipeline.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("touristesim.operation", operation = operation.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `warn` event describing a scheduled retry.
pub fn retry_scheduled(operation: Operation, attempt: u32, delay: Duration, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			operation = operation.as_str(),
			attempt,
			delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
			status = error.status(),
			error = %error,
			"Transient failure; retrying."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, attempt, delay, error);
	}
}

/// Emits a `debug` event for token lifecycle transitions (fetched, hydrated, evicted, revoked).
pub fn token_event(event: &'static str, expires_in: Option<u64>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(event, expires_in, "Token lifecycle event.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (event, expires_in);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_event_accepts_any_error() {
		let err = Error::from_status(503, Duration::from_secs(60), "");

		retry_scheduled(Operation::ApiRequest, 1, Duration::from_millis(200), &err);
		token_event("evicted", None);
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OperationSpan::new(Operation::TokenRequest, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
