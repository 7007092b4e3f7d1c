//! Facades for the federated-identity backend and the application registration API.
//!
//! Both services are plain JSON-over-HTTPS endpoints reached through the caller's
//! [`BackendHttpClient`]. Requests are built as [`HttpRequest`] values, responses are decoded
//! with `serde_path_to_error` so malformed payloads report the failing field, and non-2xx
//! responses are classified by the configured [`BackendStrategy`].

pub mod identity;
pub mod registration;
pub mod strategy;

pub use oauth2;
pub use registration::*;
pub use strategy::*;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest,
	http::{
		Method, Request,
		header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
	},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::BrokerConfig,
	error::{ConfigError, TransientError, TransportError},
	http::{BackendHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const JSON: &str = "application/json";
const AMZ_TARGET: &str = "x-amz-target";

/// Remote operations issued by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendOperation {
	/// Resolve (or create) the federated identity for a login map.
	GetId,
	/// Issue an OpenID token for a federated identity.
	GetOpenIdToken,
	/// Call the application registration API.
	Register,
}
impl BackendOperation {
	/// Stable label used in errors and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			BackendOperation::GetId => "get_id",
			BackendOperation::GetOpenIdToken => "get_open_id_token",
			BackendOperation::Register => "register",
		}
	}

	/// `X-Amz-Target` header value for identity-backend operations.
	pub const fn amz_target(self) -> Option<&'static str> {
		match self {
			BackendOperation::GetId => Some("AWSCognitoIdentityService.GetId"),
			BackendOperation::GetOpenIdToken => Some("AWSCognitoIdentityService.GetOpenIdToken"),
			BackendOperation::Register => None,
		}
	}

	const fn content_type(self) -> &'static str {
		match self.amz_target() {
			Some(_) => AMZ_JSON,
			None => JSON,
		}
	}
}
impl Display for BackendOperation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a broker error.
	fn map_transport_error(
		&self,
		operation: BackendOperation,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		operation: BackendOperation,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(operation, meta, *inner),
			other => map_http_client_error(operation, meta, other),
		}
	}
}

/// Maps the transport-agnostic [`HttpClientError`] variants.
///
/// Custom [`TransportErrorMapper`] implementations can delegate here once they handled their
/// own transport variant.
pub fn map_http_client_error<E>(
	operation: BackendOperation,
	meta: Option<&ResponseMetadata>,
	err: HttpClientError<E>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::from(inner).into(),
		HttpClientError::Other(message) => TransientError::Backend {
			operation: operation.as_str(),
			message: format!("HTTP client error: {message}"),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
		_ => TransientError::Backend {
			operation: operation.as_str(),
			message: "HTTP client error".into(),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	operation: BackendOperation,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Backend {
			operation: operation.as_str(),
			message: "request timed out".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::from(err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

/// Raw backend reply handed to the operation-specific decoders.
#[derive(Debug)]
pub(crate) struct BackendResponse {
	pub(crate) status: u16,
	pub(crate) retry_after: Option<Duration>,
	pub(crate) body: Vec<u8>,
}
impl BackendResponse {
	pub(crate) fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	pub(crate) fn decode<T>(&self, operation: BackendOperation) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode_json(operation, &self.body, Some(self.status))
	}
}

/// Borrowed view over the broker pieces needed to issue backend calls.
pub(crate) struct BackendFacade<'a, C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: &'a BrokerConfig,
	http_client: &'a C,
	error_mapper: &'a M,
	strategy: &'a dyn BackendStrategy,
}
impl<'a, C, M> BackendFacade<'a, C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		config: &'a BrokerConfig,
		http_client: &'a C,
		error_mapper: &'a M,
		strategy: &'a dyn BackendStrategy,
	) -> Self {
		Self { config, http_client, error_mapper, strategy }
	}

	async fn send<P>(
		&self,
		operation: BackendOperation,
		url: &Url,
		payload: &P,
	) -> Result<BackendResponse>
	where
		P: ?Sized + Serialize,
	{
		let mut body = serde_json::to_value(payload).map_err(ConfigError::from)?;

		self.strategy.augment_request(operation, &mut body);

		let request = build_request(operation, url, &body)?;
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = instrumented.call(request).await.map_err(|err| {
			self.error_mapper.map_transport_error(operation, meta.take().as_ref(), err)
		})?;
		let retry_after = meta.take().and_then(|value| value.retry_after);

		Ok(BackendResponse {
			status: response.status().as_u16(),
			retry_after,
			body: response.into_body(),
		})
	}
}

fn build_request(operation: BackendOperation, url: &Url, body: &Value) -> Result<HttpRequest> {
	let mut builder = Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, operation.content_type())
		.header(ACCEPT, JSON)
		.header(CACHE_CONTROL, "no-cache");

	if let Some(target) = operation.amz_target() {
		builder = builder.header(AMZ_TARGET, target);
	}

	let payload = serde_json::to_vec(body).map_err(ConfigError::from)?;

	builder.body(payload).map_err(|err| ConfigError::from(err).into())
}

pub(crate) fn decode_json<T>(
	operation: BackendOperation,
	body: &[u8],
	status: Option<u16>,
) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		let operation = operation.as_str();

		TransientError::ResponseParse { operation, source: Arc::new(source), status }.into()
	})
}
