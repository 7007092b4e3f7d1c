//! Session entry and exit points: silent restore, interactive login, and logout.

// self
use crate::{
	_prelude::*,
	backend::TransportErrorMapper,
	error::ConfigError,
	flows::Broker,
	http::BackendHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{self, AcquireMode, Provider},
	session::SessionTokens,
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Restores a session from whichever provider already holds a native login.
	///
	/// Every adapter is asked silently; the first credential wins and is exchanged.
	pub async fn restore_session(&self) -> Result<SessionTokens> {
		const KIND: FlowKind = FlowKind::Restore;

		let span = FlowSpan::new(KIND, "restore_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let credential =
					provider::race_credentials(&self.adapters, AcquireMode::Silent).await?;

				self.exchange_tokens(credential).await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	/// Runs the interactive login of one provider and exchanges its credential.
	pub async fn login(&self, provider: Provider) -> Result<SessionTokens> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let adapter =
					self.adapter(provider).ok_or(ConfigError::AdapterMissing { provider })?;
				let credential = adapter.sign_in().await?;

				self.exchange_tokens(credential).await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	/// Signs out of every provider and clears the session.
	///
	/// Adapter sign-out failures are logged and absorbed; the session is always cleared.
	pub async fn logout(&self) {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		span.instrument(self.sign_out_adapters()).await;
		self.session.clear();
		obs::record_flow_outcome(KIND, FlowOutcome::Success);
	}
}
