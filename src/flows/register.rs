//! Registration API call with one forced token refresh on an unauthorized reply.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	backend::{RegistrationOutcome, RegistrationResponse, TransportErrorMapper},
	flows::Broker,
	http::BackendHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{self, AcquireMode},
	session::SessionTokens,
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Registers the signed-in user with the application API.
	///
	/// With `open_id_token` set, that token is sent together with the session's current
	/// access token ([`Error::NotAuthenticated`] when no session exists). Otherwise the call
	/// waits until the session publishes tokens.
	///
	/// When the API reports the token as unauthorized, the identity token is refreshed once
	/// and the request re-sent with the fresh tokens. A second unauthorized reply fails with
	/// [`Error::Unauthorized`].
	pub async fn register<T>(&self, open_id_token: Option<TokenSecret>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		const KIND: FlowKind = FlowKind::Register;

		let span = FlowSpan::new(KIND, "register");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (access_token, open_id_token) = match open_id_token {
					Some(token) => {
						let tokens = self.session.tokens().ok_or(Error::NotAuthenticated)?;

						(tokens.access_token, token)
					},
					None => {
						let tokens = self.session.wait_for_tokens().await;

						(tokens.access_token, tokens.identity.token)
					},
				};
				let backend = self.backend();

				match backend.register::<T>(&access_token, &open_id_token).await? {
					RegistrationOutcome::Registered(value) => return Ok(value),
					RegistrationOutcome::Unauthorized => obs::log_absorbed_failure(
						"register",
						&"registration API rejected the identity token; refreshing",
					),
				}

				let SessionTokens { access_token, identity, .. } =
					self.refresh_identity_token().await?;

				match backend.register::<T>(&access_token, &identity.token).await? {
					RegistrationOutcome::Registered(value) => Ok(value),
					RegistrationOutcome::Unauthorized => Err(Error::Unauthorized {
						reason: "registration API rejected the refreshed identity token".into(),
					}),
				}
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	/// Registers the signed-in user and returns the `userData` record of the reply.
	///
	/// Shorthand for [`register`](Self::register) with a [`RegistrationResponse`] body; same
	/// token handling and retry.
	pub async fn register_user<U>(&self, open_id_token: Option<TokenSecret>) -> Result<Option<U>>
	where
		U: DeserializeOwned,
	{
		self.register::<RegistrationResponse<U>>(open_id_token)
			.await
			.map(|response| response.user_data)
	}

	/// Forces a fresh identity token: silent credential race followed by an exchange.
	pub async fn refresh_identity_token(&self) -> Result<SessionTokens> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_identity_token");

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
}
