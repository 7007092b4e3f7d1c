//! Identity providers, their normalized credentials, and the adapter race.
//!
//! `adapter` defines [`ProviderAdapter`], the boundary to a provider SDK. `race` runs several
//! adapters concurrently and keeps the first credential that arrives.

pub mod adapter;
pub mod race;

pub use adapter::*;
pub use race::*;

// self
use crate::{_prelude::*, auth::TokenSecret, error::ProviderUnavailable};

/// Closed set of identity providers the broker can federate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
	/// Facebook Login.
	#[serde(rename = "graph.facebook.com")]
	Facebook,
	/// Google Sign-In.
	#[serde(rename = "accounts.google.com")]
	Google,
	/// Login with Amazon.
	#[serde(rename = "www.amazon.com")]
	Amazon,
	/// Sign in with Apple.
	#[serde(rename = "appleid.apple.com")]
	Apple,
}
impl Provider {
	/// Every supported provider, in declaration order.
	pub const ALL: [Provider; 4] =
		[Provider::Facebook, Provider::Google, Provider::Amazon, Provider::Apple];

	/// Login-method name used as the key of the federated `Logins` map.
	pub const fn login_name(self) -> &'static str {
		match self {
			Provider::Facebook => "graph.facebook.com",
			Provider::Google => "accounts.google.com",
			Provider::Amazon => "www.amazon.com",
			Provider::Apple => "appleid.apple.com",
		}
	}
}
impl Display for Provider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.login_name())
	}
}
impl FromStr for Provider {
	type Err = UnknownProvider;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|provider| provider.login_name() == s)
			.ok_or_else(|| UnknownProvider(s.to_owned()))
	}
}

/// Error returned when a login-method name does not match any [`Provider`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown login provider `{0}`.")]
pub struct UnknownProvider(pub String);

/// Normalized provider credential produced by a [`ProviderAdapter`].
///
/// Immutable once created. The access token is never empty; an empty ID token is treated as
/// absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
	provider: Provider,
	access_token: TokenSecret,
	id_token: Option<TokenSecret>,
}
impl Credential {
	/// Validates and wraps the tokens reported by a provider SDK.
	pub fn new(
		provider: Provider,
		access_token: impl Into<TokenSecret>,
		id_token: Option<TokenSecret>,
	) -> Result<Self, ProviderUnavailable> {
		let access_token = access_token.into();

		if access_token.is_empty() {
			let reason = "provider returned an empty access token";

			return Err(ProviderUnavailable::new(provider, reason));
		}

		let id_token = id_token.filter(|token| !token.is_empty());

		Ok(Self { provider, access_token, id_token })
	}

	/// Provider that issued the credential.
	pub fn provider(&self) -> Provider {
		self.provider
	}

	/// Provider access token.
	pub fn access_token(&self) -> &TokenSecret {
		&self.access_token
	}

	/// Provider ID token, when the provider issues one.
	pub fn id_token(&self) -> Option<&TokenSecret> {
		self.id_token.as_ref()
	}

	/// Token presented to the identity backend: the ID token when present, otherwise the
	/// access token.
	pub fn login_token(&self) -> &TokenSecret {
		self.id_token.as_ref().unwrap_or(&self.access_token)
	}

	/// Builds the single-entry `Logins` map for this credential.
	pub fn logins(&self) -> LoginMap {
		LoginMap::from([(self.provider.login_name(), self.login_token().expose().to_owned())])
	}
}

/// `{login_name: token}` map understood by the federated-identity backend and SDK hook.
pub type LoginMap = BTreeMap<&'static str, String>;
