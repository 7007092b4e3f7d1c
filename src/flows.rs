//! High-level flow orchestrators powered by the broker facade.

pub mod exchange;
pub mod login;
pub mod register;

pub use exchange::*;

// crates.io
use futures_util::future;
// self
use crate::{
	_prelude::*,
	backend::{BackendFacade, BackendStrategy, DefaultBackendStrategy, TransportErrorMapper},
	config::BrokerConfig,
	http::BackendHttpClient,
	obs,
	provider::{LoginMap, Provider, ProviderAdapter},
	session::SessionStore,
};
#[cfg(feature = "reqwest")]
use crate::{backend::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates provider adapters, the identity backend, and the session store.
///
/// The broker owns the HTTP client, configuration, backend strategy, adapter set, and
/// session so individual flows can focus on their own logic (racing adapters, single-flight
/// exchanges, the bounded registration retry). Clones share the session and the in-flight
/// exchange slot.
pub struct Broker<C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound backend request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Identity pool and endpoint configuration.
	pub config: BrokerConfig,
	/// Strategy responsible for backend request adjustments and error classification.
	pub strategy: Arc<dyn BackendStrategy>,
	/// Session shared by every flow.
	pub session: Arc<SessionStore>,
	/// Provider adapters raced by the silent flows.
	pub adapters: Vec<Arc<dyn ProviderAdapter>>,
	/// Shared counters for identity exchanges.
	pub exchange_metrics: Arc<ExchangeMetrics>,
	exchange_flight: Arc<Mutex<Option<ExchangeFlight>>>,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: BrokerConfig,
		adapters: Vec<Arc<dyn ProviderAdapter>>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			config,
			strategy: Arc::new(DefaultBackendStrategy),
			session: Default::default(),
			adapters,
			exchange_metrics: Default::default(),
			exchange_flight: Default::default(),
		}
	}

	/// Replaces the backend strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn BackendStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Shares an existing session store (for example with another broker instance).
	pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
		self.session = session;

		self
	}

	/// Returns the adapter registered for `provider`, if any.
	pub fn adapter(&self, provider: Provider) -> Option<&Arc<dyn ProviderAdapter>> {
		self.adapters.iter().find(|adapter| adapter.provider() == provider)
	}

	/// Login-map supplier for the federated-identity SDK hook.
	///
	/// The closure reads the session on every call and never caches the map.
	pub fn logins_supplier(&self) -> impl Fn() -> LoginMap + Send + Sync + 'static {
		let session = Arc::clone(&self.session);

		move || session.logins()
	}

	pub(crate) fn backend(&self) -> BackendFacade<'_, C, M> {
		BackendFacade::new(
			&self.config,
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			self.strategy.as_ref(),
		)
	}

	/// Signs out of every adapter concurrently; failures are logged and absorbed.
	pub(crate) async fn sign_out_adapters(&self) {
		let outcomes =
			future::join_all(self.adapters.iter().map(|adapter| adapter.sign_out())).await;

		for failure in outcomes.into_iter().filter_map(Result::err) {
			obs::log_absorbed_failure("sign_out", &failure);
		}
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new broker for the provided configuration and adapters.
	///
	/// The broker provisions its own reqwest-backed transport so callers do not need to pass
	/// HTTP handles explicitly. Use [`Broker::with_http_client`] to bring a client with custom
	/// timeouts or proxies.
	pub fn new(config: BrokerConfig, adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
		Self::with_http_client(
			config,
			adapters,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for Broker<C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			transport_mapper: Arc::clone(&self.transport_mapper),
			config: self.config.clone(),
			strategy: Arc::clone(&self.strategy),
			session: Arc::clone(&self.session),
			adapters: self.adapters.clone(),
			exchange_metrics: Arc::clone(&self.exchange_metrics),
			exchange_flight: Arc::clone(&self.exchange_flight),
		}
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let providers = self.adapters.iter().map(|adapter| adapter.provider()).collect::<Vec<_>>();

		f.debug_struct("Broker")
			.field("config", &self.config)
			.field("providers", &providers)
			.field("session", &self.session.status())
			.finish()
	}
}
