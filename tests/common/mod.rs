#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	future::Future,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use httpmock::prelude::*;
use parking_lot::Mutex;
use serde_json::Value;
// self
use federated_token_broker::{
	auth::{IdentityPoolId, TokenSecret},
	backend::{
		BackendOperation, ReqwestTransportErrorMapper, TransportErrorMapper,
		map_http_client_error,
		oauth2::{
			AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode,
		},
	},
	config::BrokerConfig,
	error::{Error, ProviderUnavailable},
	flows::{Broker, ReqwestBroker},
	http::{BackendHttpClient, ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{AdapterFuture, Credential, Provider, ProviderAdapter},
	reqwest::Client,
	url::Url,
};

pub const POOL_ID: &str = "ap-northeast-1:4e86b831-da7f-47d5-8382-3d800cd28a25";
pub const FEDERATED_ID: &str = "ap-northeast-1:0b7d3f1e-6c1a-4f2e-9d8b-2f1c9a7e5d41";
pub const GET_ID: &str = "AWSCognitoIdentityService.GetId";
pub const GET_OPEN_ID_TOKEN: &str = "AWSCognitoIdentityService.GetOpenIdToken";
pub const REGISTER_PATH: &str = "/prod/register";

/// What a [`ScriptedAdapter`] does when asked for a credential.
#[derive(Clone, Debug)]
pub enum Script {
	Credential { access: &'static str, id: Option<&'static str> },
	Unavailable,
	Pending,
}

/// Provider adapter with a fixed outcome, an optional delay, and call counters.
pub struct ScriptedAdapter {
	provider: Provider,
	delay: StdDuration,
	script: Script,
	acquired: AtomicUsize,
	signed_out: AtomicUsize,
}
impl ScriptedAdapter {
	pub fn new(provider: Provider, millis: u64, script: Script) -> Arc<Self> {
		Arc::new(Self {
			provider,
			delay: StdDuration::from_millis(millis),
			script,
			acquired: AtomicUsize::new(0),
			signed_out: AtomicUsize::new(0),
		})
	}

	pub fn ready(provider: Provider, access: &'static str, id: Option<&'static str>) -> Arc<Self> {
		Self::new(provider, 0, Script::Credential { access, id })
	}

	pub fn pending(provider: Provider) -> Arc<Self> {
		Self::new(provider, 0, Script::Pending)
	}

	pub fn unavailable(provider: Provider) -> Arc<Self> {
		Self::new(provider, 0, Script::Unavailable)
	}

	pub fn acquired(&self) -> usize {
		self.acquired.load(Ordering::SeqCst)
	}

	pub fn signed_out(&self) -> usize {
		self.signed_out.load(Ordering::SeqCst)
	}
}
impl ProviderAdapter for ScriptedAdapter {
	fn provider(&self) -> Provider {
		self.provider
	}

	fn acquire(&self) -> AdapterFuture<'_, Credential> {
		Box::pin(async move {
			self.acquired.fetch_add(1, Ordering::SeqCst);

			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}

			match &self.script {
				Script::Credential { access, id } =>
					Credential::new(self.provider, *access, id.map(TokenSecret::new)),
				Script::Unavailable =>
					Err(ProviderUnavailable::new(self.provider, "no native session")),
				Script::Pending => std::future::pending().await,
			}
		})
	}

	fn sign_out(&self) -> AdapterFuture<'_, ()> {
		Box::pin(async move {
			self.signed_out.fetch_add(1, Ordering::SeqCst);

			Ok(())
		})
	}
}

pub fn adapters<const N: usize>(
	adapters: [Arc<ScriptedAdapter>; N],
) -> Vec<Arc<dyn ProviderAdapter>> {
	adapters.into_iter().map(|adapter| adapter as Arc<dyn ProviderAdapter>).collect()
}

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse loopback URL fixture.")
}

pub fn pool_id() -> IdentityPoolId {
	IdentityPoolId::new(POOL_ID).expect("Pool identifier fixture should be valid.")
}

/// Configuration pointing both endpoints at a loopback base URL.
pub fn loopback_config(base: &str) -> BrokerConfig {
	let base = base.trim_end_matches('/');

	BrokerConfig::builder(pool_id())
		.identity_endpoint(url(&format!("{base}/")))
		.api_base(url(&format!("{base}/prod")))
		.build()
		.expect("Loopback configuration should build.")
}

/// Reqwest-backed broker pointed at `server`, trusting the mock's self-signed certificate.
pub fn build_reqwest_broker(
	server: &MockServer,
	adapters: Vec<Arc<dyn ProviderAdapter>>,
) -> ReqwestBroker {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.build()
		.expect("Mock-server reqwest client should build.");

	Broker::with_http_client(
		loopback_config(&server.base_url()),
		adapters,
		ReqwestHttpClient::with_client(client),
		Arc::new(ReqwestTransportErrorMapper),
	)
}

pub fn json_body(value: Value) -> String {
	value.to_string()
}

pub fn open_id_token_body(token: &str) -> String {
	json_body(serde_json::json!({ "IdentityId": FEDERATED_ID, "Token": token }))
}

pub async fn mock_get_id(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/").header("x-amz-target", GET_ID);
			then.status(200)
				.header("content-type", "application/x-amz-json-1.1")
				.body(json_body(serde_json::json!({ "IdentityId": FEDERATED_ID })));
		})
		.await
}

pub async fn mock_get_open_id_token<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	let body = open_id_token_body(token);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/").header("x-amz-target", GET_OPEN_ID_TOKEN);
			then.status(200)
				.header("content-type", "application/x-amz-json-1.1")
				.delay(StdDuration::from_millis(50))
				.body(body.as_str());
		})
		.await
}

/// Canned response returned by [`ScriptedHttpClient`].
#[derive(Clone, Debug)]
pub struct Reply {
	status: u16,
	body: String,
	delay: StdDuration,
}
impl Reply {
	pub fn json(status: u16, value: Value) -> Self {
		Self { status, body: value.to_string(), delay: StdDuration::ZERO }
	}

	pub fn identity_id() -> Self {
		Self::json(200, serde_json::json!({ "IdentityId": FEDERATED_ID }))
	}

	pub fn open_id_token(token: &str) -> Self {
		Self::json(200, serde_json::json!({ "IdentityId": FEDERATED_ID, "Token": token }))
	}

	pub fn delayed(mut self, millis: u64) -> Self {
		self.delay = StdDuration::from_millis(millis);

		self
	}
}

/// Request observed by [`ScriptedHttpClient`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub route: String,
	pub body: Value,
}

#[derive(Debug, Default)]
struct ScriptState {
	routes: Mutex<HashMap<String, VecDeque<Reply>>>,
	requests: Mutex<Vec<RecordedRequest>>,
}
impl ScriptState {
	// The last queued reply of a route is sticky.
	fn next_reply(&self, route: &str) -> Option<Reply> {
		let mut routes = self.routes.lock();
		let queue = routes.get_mut(route)?;

		if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
	}
}

/// In-process transport replying from per-route queues.
///
/// Routes are keyed by the `X-Amz-Target` header for identity calls and by the URL path
/// otherwise.
#[derive(Clone, Debug, Default)]
pub struct ScriptedHttpClient {
	state: Arc<ScriptState>,
}
impl ScriptedHttpClient {
	pub fn reply(&self, route: &str, reply: Reply) -> &Self {
		self.state.routes.lock().entry(route.to_owned()).or_default().push_back(reply);

		self
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.state.requests.lock().clone()
	}

	pub fn calls(&self, route: &str) -> usize {
		self.state.requests.lock().iter().filter(|request| request.route == route).count()
	}
}
impl BackendHttpClient for ScriptedHttpClient {
	type Handle = ScriptedHandle;
	type TransportError = std::io::Error;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { state: Arc::clone(&self.state), slot }
	}
}

pub struct ScriptedHandle {
	state: Arc<ScriptState>,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
	type Error = HttpClientError<std::io::Error>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let state = Arc::clone(&self.state);
		let slot = self.slot.clone();

		Box::pin(async move {
			slot.take();

			let route = request
				.headers()
				.get("x-amz-target")
				.and_then(|value| value.to_str().ok())
				.map_or_else(|| request.uri().path().to_owned(), str::to_owned);
			let body = serde_json::from_slice(request.body()).unwrap_or(Value::Null);

			state.requests.lock().push(RecordedRequest { route: route.clone(), body });

			let reply = state
				.next_reply(&route)
				.ok_or_else(|| HttpClientError::Other(format!("No scripted reply for {route}.")))?;

			if !reply.delay.is_zero() {
				tokio::time::sleep(reply.delay).await;
			}

			slot.store(ResponseMetadata { status: Some(reply.status), retry_after: None });

			let mut response = HttpResponse::new(reply.body.into_bytes());

			*response.status_mut() =
				StatusCode::from_u16(reply.status).expect("Scripted status should be valid.");

			Ok(response)
		})
	}
}

/// Mapper for [`ScriptedHttpClient`] delegating to the crate's generic mapping.
#[derive(Clone, Debug, Default)]
pub struct ScriptedMapper;
impl TransportErrorMapper<std::io::Error> for ScriptedMapper {
	fn map_transport_error(
		&self,
		operation: BackendOperation,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<std::io::Error>,
	) -> Error {
		map_http_client_error(operation, meta, err)
	}
}

pub type ScriptedBroker = Broker<ScriptedHttpClient, ScriptedMapper>;

pub fn build_scripted_broker(
	client: &ScriptedHttpClient,
	adapters: Vec<Arc<dyn ProviderAdapter>>,
) -> ScriptedBroker {
	Broker::with_http_client(
		loopback_config("http://127.0.0.1:9"),
		adapters,
		Arc::new(client.clone()),
		Arc::new(ScriptedMapper),
	)
}
