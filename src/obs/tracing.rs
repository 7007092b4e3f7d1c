// self
use crate::{_prelude::*, obs::FlowKind};

/// Future returned by [`FlowSpan::instrument`]; plain `F` when tracing is off.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; plain `F` when tracing is off.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one broker flow.
///
/// Every span carries `flow` and `stage`. Exchanges also record the session `generation`
/// they were started in, which ties joined callers to the exchange they shared.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"federated_token_broker.flow",
				flow = kind.as_str(),
				stage,
				generation = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Records the session generation the flow operates on.
	pub fn record_generation(&self, generation: u64) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("generation", generation);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = generation;
		}
	}

	/// Runs `fut` inside the span without holding an entered guard across `.await`.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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

/// Logs a failure that a fallback path (race, retry, best-effort sign-out) absorbed.
pub fn log_absorbed_failure(stage: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(stage, error = %error, "absorbed broker failure");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, error);
	}
}

/// Logs the error a flow hands back to its caller.
///
/// Credential rejections end the session, so they are logged at `warn`; everything else is
/// the caller's to handle and stays at `debug`.
pub fn log_flow_failure(kind: FlowKind, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		let flow = kind.as_str();
		let error_kind = error.kind();

		match error {
			Error::CredentialInvalid { .. } =>
				tracing::warn!(flow, error_kind, error = %error, "session invalidated"),
			_ => tracing::debug!(flow, error_kind, error = %error, "flow failed"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn logging_helpers_never_panic() {
		log_absorbed_failure("test", &"adapter offline");
		log_flow_failure(FlowKind::Register, &Error::NotAuthenticated);
		log_flow_failure(
			FlowKind::Exchange,
			&Error::CredentialInvalid { reason: "expired".into() },
		);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Exchange, "instrument_wraps_future");

		span.record_generation(3);

		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
