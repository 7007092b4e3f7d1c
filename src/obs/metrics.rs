// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome},
};

/// Bumps `federated_token_broker_flow_total{flow, outcome}` (no-op without `metrics`).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"federated_token_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Bumps `federated_token_broker_flow_errors_total{flow, error}` with the error's kind.
pub fn record_flow_error(kind: FlowKind, error: &Error) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"federated_token_broker_flow_errors_total",
			"flow" => kind.as_str(),
			"error" => error.kind()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, error);
	}
}
