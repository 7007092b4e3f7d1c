//! Process-wide session state shared by every broker flow.
//!
//! [`SessionStore`] is the only owner of the mutable session aggregate. Each operation
//! takes the write lock once, applies the whole transition, and releases it before any
//! `.await`, so a reader never observes a half-applied login. A generation counter is bumped
//! by every clear; exchanges carry the generation they started in (a [`SessionTicket`]) and
//! their results are dropped when the session moved on in the meantime.
//!
//! Callers that need tokens before a login has completed await the pending-token cell via
//! [`SessionStore::wait_for_tokens`].

// self
use crate::{
	_prelude::*,
	auth::{FederatedId, IdentityToken, TokenSecret},
	provider::{Credential, LoginMap, Provider},
};

type PendingTokens = Arc<OnceCell<SessionTokens>>;

/// Login status of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
	/// No provider session is active.
	#[default]
	LoggedOut,
	/// A credential is being exchanged for the first identity token.
	Authenticating,
	/// Provider credential and identity token are both available.
	Authenticated,
}

/// Tokens published once a login succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionTokens {
	/// Provider that produced the credential.
	pub provider: Provider,
	/// Provider access token forwarded to the application API.
	pub access_token: TokenSecret,
	/// Identity token issued by the federated-identity backend.
	pub identity: IdentityToken,
}

/// Generation-stamped permit handed out when an exchange starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTicket {
	generation: u64,
}
impl SessionTicket {
	/// Session generation the ticket was issued in.
	pub fn generation(&self) -> u64 {
		self.generation
	}
}

/// Consistent read-only copy of the session.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
	/// Current status.
	pub status: SessionStatus,
	/// Current generation.
	pub generation: u64,
	/// Credential applied by the latest successful login.
	pub credential: Option<Credential>,
	/// Federated identity of the current user.
	pub federated_id: Option<FederatedId>,
	/// Latest identity token.
	pub identity: Option<IdentityToken>,
}
impl SessionSnapshot {
	/// Provider of the applied credential.
	pub fn provider(&self) -> Option<Provider> {
		self.credential.as_ref().map(Credential::provider)
	}
}

#[derive(Debug)]
struct SessionState {
	status: SessionStatus,
	generation: u64,
	credential: Option<Credential>,
	federated_id: Option<FederatedId>,
	identity: Option<IdentityToken>,
	pending: PendingTokens,
}
impl SessionState {
	fn is_current(&self, ticket: SessionTicket) -> bool {
		self.generation == ticket.generation
	}

	fn reset(&mut self) {
		self.status = SessionStatus::LoggedOut;
		self.generation = self.generation.wrapping_add(1);
		self.credential = None;
		self.federated_id = None;
		self.identity = None;

		// Keep an unresolved cell so current waiters stay subscribed to the next login.
		if self.pending.is_initialized() {
			self.pending = Arc::new(OnceCell::new());
		}
	}
}
impl Default for SessionState {
	fn default() -> Self {
		Self {
			status: SessionStatus::LoggedOut,
			generation: 0,
			credential: None,
			federated_id: None,
			identity: None,
			pending: Arc::new(OnceCell::new()),
		}
	}
}

/// Owner of the session aggregate.
#[derive(Debug, Default)]
pub struct SessionStore {
	state: RwLock<SessionState>,
}
impl SessionStore {
	/// Creates an empty, logged-out session.
	pub fn new() -> Self {
		Self::default()
	}

	/// Current status.
	pub fn status(&self) -> SessionStatus {
		self.state.read().status
	}

	/// Current generation.
	pub fn generation(&self) -> u64 {
		self.state.read().generation
	}

	/// Provider of the active login, once authenticated.
	pub fn provider(&self) -> Option<Provider> {
		let state = self.state.read();

		match state.status {
			SessionStatus::Authenticated => state.credential.as_ref().map(Credential::provider),
			_ => None,
		}
	}

	/// Published tokens, once authenticated.
	pub fn tokens(&self) -> Option<SessionTokens> {
		let state = self.state.read();

		match (&state.status, &state.credential, &state.identity) {
			(SessionStatus::Authenticated, Some(credential), Some(identity)) =>
				Some(SessionTokens {
					provider: credential.provider(),
					access_token: credential.access_token().clone(),
					identity: identity.clone(),
				}),
			_ => None,
		}
	}

	/// Federated id already resolved for `provider`, if the session holds one.
	pub fn federated_id_for(&self, provider: Provider) -> Option<FederatedId> {
		let state = self.state.read();

		match &state.credential {
			Some(credential) if credential.provider() == provider => state.federated_id.clone(),
			_ => None,
		}
	}

	/// Takes a consistent copy of every session field.
	pub fn snapshot(&self) -> SessionSnapshot {
		let state = self.state.read();

		SessionSnapshot {
			status: state.status,
			generation: state.generation,
			credential: state.credential.clone(),
			federated_id: state.federated_id.clone(),
			identity: state.identity.clone(),
		}
	}

	/// Login map for the federated-identity SDK hook.
	///
	/// Returns `{login_name: id_token ?? access_token}` while authenticated and an empty map
	/// otherwise. The map is rebuilt on every call.
	pub fn logins(&self) -> LoginMap {
		let state = self.state.read();

		match (&state.status, &state.credential) {
			(SessionStatus::Authenticated, Some(credential)) => credential.logins(),
			_ => LoginMap::new(),
		}
	}

	/// Marks the start of an exchange and returns the ticket its result must present.
	///
	/// A logged-out session moves to [`SessionStatus::Authenticating`]; an authenticated
	/// session stays authenticated while its token is refreshed.
	pub(crate) fn begin_login(&self) -> SessionTicket {
		let mut state = self.state.write();

		if state.status == SessionStatus::LoggedOut {
			state.status = SessionStatus::Authenticating;
		}

		SessionTicket { generation: state.generation }
	}

	/// Applies a successful exchange and resolves every pending-token waiter.
	///
	/// Fails with [`Error::SessionCleared`] when the session was cleared after `ticket` was
	/// issued; the stale tokens are dropped.
	pub(crate) fn apply_login(
		&self,
		ticket: SessionTicket,
		credential: Credential,
		identity: IdentityToken,
	) -> Result<SessionTokens> {
		let mut state = self.state.write();

		if !state.is_current(ticket) {
			return Err(Error::SessionCleared);
		}

		let tokens = SessionTokens {
			provider: credential.provider(),
			access_token: credential.access_token().clone(),
			identity: identity.clone(),
		};

		state.status = SessionStatus::Authenticated;
		state.federated_id = Some(identity.federated_id.clone());
		state.credential = Some(credential);
		state.identity = Some(identity);

		if state.pending.is_initialized() {
			state.pending = Arc::new(OnceCell::from(tokens.clone()));
		} else {
			// Nothing else initializes the cell, so this never blocks.
			let _ = state.pending.set_blocking(tokens.clone());
		}

		Ok(tokens)
	}

	/// Reverts an `Authenticating` session to `LoggedOut` after a failed exchange.
	///
	/// Tokens of an authenticated session are left untouched. Returns `true` when the status
	/// changed.
	pub(crate) fn abort_login(&self, ticket: SessionTicket) -> bool {
		let mut state = self.state.write();

		if state.is_current(ticket) && state.status == SessionStatus::Authenticating {
			state.status = SessionStatus::LoggedOut;

			return true;
		}

		false
	}

	/// Clears the session only if `ticket` is still current.
	///
	/// Used when the backend rejects a credential, so a late rejection cannot log out a
	/// session that has since been re-established. Returns `true` when the session was
	/// cleared.
	pub(crate) fn invalidate(&self, ticket: SessionTicket) -> bool {
		let mut state = self.state.write();

		if state.is_current(ticket) {
			state.reset();

			return true;
		}

		false
	}

	/// Logs the session out, discarding every token. Idempotent.
	pub fn clear(&self) {
		self.state.write().reset();
	}

	/// Waits until the session publishes tokens.
	///
	/// Resolves immediately when already authenticated. When the pending cell is replaced
	/// while waiting (a clear or a refresh) the wait re-subscribes to the current cell, so a
	/// cleared session's tokens are never returned.
	pub async fn wait_for_tokens(&self) -> SessionTokens {
		loop {
			let pending = self.state.read().pending.clone();
			let tokens = pending.wait().await.clone();

			if Arc::ptr_eq(&self.state.read().pending, &pending) {
				return tokens;
			}
		}
	}
}
