//! Broker-level error types shared across adapters, flows, and the backend facade.

// self
use crate::{_prelude::*, provider::Provider};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// The type is `Clone` so a single-flight exchange can hand the same outcome to every
/// caller that joined it.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// A provider adapter could not produce a credential.
	#[error(transparent)]
	ProviderUnavailable(#[from] ProviderUnavailable),

	/// Every adapter that took part in a credential race failed.
	#[error("No identity provider produced a credential ({} failed).", .failures.len())]
	NoCredential {
		/// Failures reported by the individual adapters, in completion order.
		failures: Vec<ProviderUnavailable>,
	},
	/// The federated-identity backend rejected the provider credential.
	#[error("Identity backend rejected the credential: {reason}.")]
	CredentialInvalid {
		/// Backend-supplied reason string.
		reason: String,
	},
	/// The registration API kept rejecting the identity token after a refresh.
	#[error("Registration API rejected the identity token: {reason}.")]
	Unauthorized {
		/// Broker-supplied reason string.
		reason: String,
	},
	/// The session was cleared while the exchange was in flight.
	#[error("Session was cleared before the identity exchange completed.")]
	SessionCleared,
	/// An explicit token was supplied but no provider session is active.
	#[error("No authenticated session is available.")]
	NotAuthenticated,
}
impl Error {
	/// Stable snake_case label for logs and metrics.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Config(_) => "config",
			Self::Transient(_) => "transient",
			Self::Transport(_) => "transport",
			Self::ProviderUnavailable(_) => "provider_unavailable",
			Self::NoCredential { .. } => "no_credential",
			Self::CredentialInvalid { .. } => "credential_invalid",
			Self::Unauthorized { .. } => "unauthorized",
			Self::SessionCleared => "session_cleared",
			Self::NotAuthenticated => "not_authenticated",
		}
	}

	/// Returns `true` for transport, decode, and request-construction failures raised while
	/// talking to the identity backend. These never mutate session tokens.
	pub fn is_exchange_failure(&self) -> bool {
		matches!(self, Self::Config(_) | Self::Transient(_) | Self::Transport(_))
	}
}

/// Failure reported by a provider adapter.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Provider {provider} is unavailable: {reason}.")]
pub struct ProviderUnavailable {
	/// Provider whose adapter failed.
	pub provider: Provider,
	/// Adapter-supplied reason string.
	pub reason: String,
}
impl ProviderUnavailable {
	/// Creates a new failure for `provider`.
	pub fn new(provider: Provider, reason: impl Into<String>) -> Self {
		Self { provider, reason: reason.into() }
	}
}

/// Configuration and request-construction failures raised by the broker.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest(#[source] Arc<oauth2::http::Error>),
	/// Request payload could not be serialized.
	#[error("Request payload could not be serialized.")]
	RequestEncode(#[source] Arc<serde_json::Error>),
	/// An endpoint URL could not be derived from the configuration.
	#[error("Endpoint `{endpoint}` is invalid.")]
	InvalidEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// No adapter is registered for the requested provider.
	#[error("No adapter is registered for provider {provider}.")]
	AdapterMissing {
		/// Requested provider.
		provider: Provider,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest(Arc::new(e))
	}
}
impl From<serde_json::Error> for ConfigError {
	fn from(e: serde_json::Error) -> Self {
		Self::RequestEncode(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Clone, Debug, ThisError)]
pub enum TransientError {
	/// Backend returned an unexpected but non-fatal response.
	#[error("{operation} returned an unexpected response: {message}.")]
	Backend {
		/// Backend operation label.
		operation: &'static str,
		/// Backend- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Backend responded with JSON that could not be decoded.
	#[error("{operation} returned malformed JSON.")]
	ResponseParse {
		/// Backend operation label.
		operation: &'static str,
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[source] Arc<std::io::Error>),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn cloned_errors_keep_their_source() {
		let io = std::io::Error::other("socket reset");
		let error: Error = TransportError::from(io).into();
		let cloned = error.clone();
		let source = StdError::source(&cloned)
			.expect("Cloned transport error should expose the original IO error.");

		assert_eq!(source.to_string(), "socket reset");
		assert!(cloned.is_exchange_failure());
	}

	#[test]
	fn no_credential_reports_failure_count() {
		let error = Error::NoCredential {
			failures: vec![
				ProviderUnavailable::new(Provider::Facebook, "no session"),
				ProviderUnavailable::new(Provider::Google, "play services missing"),
			],
		};

		assert_eq!(error.to_string(), "No identity provider produced a credential (2 failed).");
		assert!(!error.is_exchange_failure());
	}

	#[test]
	fn kind_labels_are_stable() {
		let transient: Error = TransientError::Backend {
			operation: "get_id",
			message: "throttled".into(),
			status: Some(429),
			retry_after: None,
		}
		.into();

		assert_eq!(transient.kind(), "transient");
		assert_eq!(Error::SessionCleared.kind(), "session_cleared");
		assert_eq!(
			Error::CredentialInvalid { reason: "expired".into() }.kind(),
			"credential_invalid"
		);
	}

	#[test]
	fn provider_unavailable_names_the_provider() {
		let error: Error = ProviderUnavailable::new(Provider::Google, "user cancelled").into();

		assert_eq!(
			error.to_string(),
			"Provider accounts.google.com is unavailable: user cancelled."
		);
	}
}
