//! Credential to identity-token exchange with per-generation single-flight.
//!
//! [`Broker::exchange`] resolves the federated identity for a provider credential
//! (`GetId`, skipped when the session already knows it), requests an OpenID token
//! (`GetOpenIdToken`), and applies the result to the session. Concurrent callers within one
//! session generation join the exchange that is already in flight and receive its outcome,
//! success or failure, without issuing another backend call.

mod metrics;

pub use metrics::ExchangeMetrics;

// self
use crate::{
	_prelude::*,
	auth::IdentityToken,
	backend::TransportErrorMapper,
	flows::Broker,
	http::BackendHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::Credential,
	session::{SessionStore, SessionTicket, SessionTokens},
};

type FlightCell = Arc<OnceCell<Result<SessionTokens>>>;

/// Exchange currently in flight, keyed by the session generation it was started in.
#[derive(Clone, Debug)]
pub(crate) struct ExchangeFlight {
	generation: u64,
	cell: FlightCell,
}

/// Login attempt that reverts `Authenticating` to `LoggedOut` when it goes away unsettled.
///
/// Dropping an exchange future (a caller-side timeout, a cancelled task) never leaves the
/// session stuck in `Authenticating`. Reverting is a no-op once the attempt was applied,
/// invalidated, or the session moved to another generation.
struct LoginAttempt<'a> {
	session: &'a SessionStore,
	ticket: SessionTicket,
}
impl<'a> LoginAttempt<'a> {
	fn begin(session: &'a SessionStore) -> Self {
		Self { session, ticket: session.begin_login() }
	}
}
impl Drop for LoginAttempt<'_> {
	fn drop(&mut self) {
		self.session.abort_login(self.ticket);
	}
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges a provider credential for an identity token.
	///
	/// On success the session becomes authenticated (unless it was cleared meanwhile, which
	/// yields [`Error::SessionCleared`]). A backend rejection of the credential clears the
	/// session, signs the adapters out, and yields [`Error::CredentialInvalid`]. Transport,
	/// decode, and request failures leave existing tokens untouched.
	pub async fn exchange(&self, credential: Credential) -> Result<IdentityToken> {
		self.exchange_tokens(credential).await.map(|tokens| tokens.identity)
	}

	pub(crate) async fn exchange_tokens(&self, credential: Credential) -> Result<SessionTokens> {
		const KIND: FlowKind = FlowKind::Exchange;

		let span = FlowSpan::new(KIND, "exchange");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let (flight, joined) = self.join_or_start_flight();

		span.record_generation(flight.generation);

		if joined {
			self.exchange_metrics.record_joined();
		}

		let result = span
			.instrument(async move {
				flight.cell.get_or_init(|| self.run_exchange(credential)).await.clone()
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	fn join_or_start_flight(&self) -> (ExchangeFlight, bool) {
		let mut slot = self.exchange_flight.lock();
		let generation = self.session.generation();

		match slot.as_ref() {
			Some(flight) if flight.generation == generation && !flight.cell.is_initialized() =>
				(flight.clone(), true),
			_ => {
				let flight = ExchangeFlight { generation, cell: Default::default() };

				*slot = Some(flight.clone());

				(flight, false)
			},
		}
	}

	// Runs once per flight; when the running caller is dropped, a joined caller takes over
	// with its own credential.
	async fn run_exchange(&self, credential: Credential) -> Result<SessionTokens> {
		let attempt = LoginAttempt::begin(&self.session);
		let ticket = attempt.ticket;

		self.exchange_metrics.record_attempt();

		let backend = self.backend();
		let logins = credential.logins();
		let identity = async {
			let federated_id = match self.session.federated_id_for(credential.provider()) {
				Some(id) => id,
				None => backend.get_id(&logins).await?,
			};

			backend.get_open_id_token(&federated_id, &logins).await
		}
		.await;
		let result = match identity {
			Ok(identity) => self.session.apply_login(ticket, credential, identity),
			Err(err) => {
				if matches!(err, Error::CredentialInvalid { .. }) && self.session.invalidate(ticket)
				{
					self.sign_out_adapters().await;
				}

				Err(err)
			},
		};

		drop(attempt);

		match &result {
			Ok(_) => self.exchange_metrics.record_success(),
			Err(_) => self.exchange_metrics.record_failure(),
		}

		result
	}
}
