//! First-credential-wins race across provider adapters.

// crates.io
use futures_util::stream::{FuturesUnordered, StreamExt};
// self
use crate::{
	_prelude::*,
	obs,
	provider::{AcquireMode, Credential, ProviderAdapter},
};

/// Runs every adapter concurrently and resolves with the first credential produced.
///
/// Adapter failures are logged and absorbed while other participants are still running. Once
/// a winner is found the remaining adapter futures are dropped, so a losing adapter can never
/// reach the session. When every adapter fails the race resolves with
/// [`Error::NoCredential`]; an adapter that never completes keeps the race pending, so callers
/// own their timeout policy.
pub async fn race_credentials(
	adapters: &[Arc<dyn ProviderAdapter>],
	mode: AcquireMode,
) -> Result<Credential> {
	let mut racers =
		adapters.iter().map(|adapter| mode.run(adapter.as_ref())).collect::<FuturesUnordered<_>>();
	let mut failures = Vec::new();

	while let Some(outcome) = racers.next().await {
		match outcome {
			Ok(credential) => return Ok(credential),
			Err(failure) => {
				obs::log_absorbed_failure("credential_race", &failure);
				failures.push(failure);
			},
		}
	}

	Err(Error::NoCredential { failures })
}
