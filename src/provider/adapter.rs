//! Boundary contract for identity-provider SDKs.

// self
use crate::{
	_prelude::*,
	error::ProviderUnavailable,
	provider::{Credential, Provider},
};

/// Boxed future returned by [`ProviderAdapter`] hooks.
pub type AdapterFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ProviderUnavailable>> + 'a + Send>>;

/// Wraps one external identity provider and normalizes its login state into a
/// [`Credential`].
///
/// Adapters never touch the session; the broker decides what to do with the credential.
/// Implementations must be `Send + Sync` so a single adapter set can be shared by every
/// flow.
pub trait ProviderAdapter
where
	Self: Send + Sync,
{
	/// Provider wrapped by this adapter.
	fn provider(&self) -> Provider;

	/// Silently reads the provider's existing login state.
	///
	/// Fails with [`ProviderUnavailable`] when the provider has no valid session.
	fn acquire(&self) -> AdapterFuture<'_, Credential>;

	/// Runs the provider's interactive login (native UI).
	///
	/// The default implementation falls back to [`acquire`](ProviderAdapter::acquire).
	fn sign_in(&self) -> AdapterFuture<'_, Credential> {
		self.acquire()
	}

	/// Signs the user out of the provider.
	fn sign_out(&self) -> AdapterFuture<'_, ()>;
}

/// Selects which adapter hook a credential race invokes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcquireMode {
	/// Read prior login state without user interaction.
	#[default]
	Silent,
	/// Trigger the provider's login UI.
	Interactive,
}
impl AcquireMode {
	/// Invokes the hook matching this mode on `adapter`.
	pub fn run<'a>(self, adapter: &'a dyn ProviderAdapter) -> AdapterFuture<'a, Credential> {
		match self {
			AcquireMode::Silent => adapter.acquire(),
			AcquireMode::Interactive => adapter.sign_in(),
		}
	}
}
