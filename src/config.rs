//! Validated broker configuration: identity pool, backend endpoints, and API base URL.

// self
use crate::{_prelude::*, auth::IdentityPoolId};

/// Errors raised while constructing or validating a [`BrokerConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum BrokerConfigError {
	/// No region was configured and the identity pool id carries none.
	#[error("Region is required when the identity pool id has no region prefix.")]
	MissingRegion,
	/// The registration API base URL is mandatory.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// The configured region does not match the identity pool's region prefix.
	#[error("Region `{region}` does not match identity pool region `{pool_region}`.")]
	RegionMismatch {
		/// Region supplied to the builder.
		region: String,
		/// Region encoded in the identity pool id.
		pool_region: String,
	},
	/// The derived identity endpoint could not be parsed.
	#[error("Identity endpoint derived for region `{region}` is invalid.")]
	InvalidRegion {
		/// Region supplied to the builder.
		region: String,
	},
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The API base URL cannot carry further path segments.
	#[error("The API base URL cannot be used as a base: {url}.")]
	OpaqueApiBase {
		/// API base URL that failed validation.
		url: String,
	},
}

/// Immutable broker configuration consumed by every flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
	/// Identity pool that federates the provider logins.
	pub identity_pool_id: IdentityPoolId,
	/// Region hosting the identity pool.
	pub region: String,
	/// Federated-identity backend endpoint.
	pub identity_endpoint: Url,
	/// Base URL of the application API (`{api_base}/register`).
	pub api_base: Url,
}
impl BrokerConfig {
	/// Creates a new builder for the provided identity pool.
	pub fn builder(identity_pool_id: IdentityPoolId) -> BrokerConfigBuilder {
		BrokerConfigBuilder::new(identity_pool_id)
	}

	/// Resolves an API route relative to [`api_base`](Self::api_base).
	pub fn api_endpoint(&self, route: &str) -> Result<Url, url::ParseError> {
		let mut base = self.api_base.clone();

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		base.join(route.trim_start_matches('/'))
	}

	fn validate(&self) -> Result<(), BrokerConfigError> {
		match self.identity_pool_id.region() {
			Some(pool_region) if pool_region != self.region =>
				return Err(BrokerConfigError::RegionMismatch {
					region: self.region.clone(),
					pool_region: pool_region.to_owned(),
				}),
			_ => (),
		}
		if self.api_base.cannot_be_a_base() {
			return Err(BrokerConfigError::OpaqueApiBase { url: self.api_base.to_string() });
		}

		validate_endpoint("identity", &self.identity_endpoint)?;
		validate_endpoint("api", &self.api_base)?;

		Ok(())
	}
}

/// Builder for [`BrokerConfig`] values.
#[derive(Debug)]
pub struct BrokerConfigBuilder {
	/// Identity pool for the configuration being constructed.
	pub identity_pool_id: IdentityPoolId,
	/// Optional region (defaults to the identity pool's prefix).
	pub region: Option<String>,
	/// Optional identity endpoint override (defaults to the regional public endpoint).
	pub identity_endpoint: Option<Url>,
	/// Registration API base URL.
	pub api_base: Option<Url>,
}
impl BrokerConfigBuilder {
	/// Creates a new builder seeded with the provided identity pool.
	pub fn new(identity_pool_id: IdentityPoolId) -> Self {
		Self { identity_pool_id, region: None, identity_endpoint: None, api_base: None }
	}

	/// Sets the region hosting the identity pool.
	pub fn region(mut self, region: impl Into<String>) -> Self {
		self.region = Some(region.into());

		self
	}

	/// Overrides the federated-identity backend endpoint.
	pub fn identity_endpoint(mut self, url: Url) -> Self {
		self.identity_endpoint = Some(url);

		self
	}

	/// Sets the application API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<BrokerConfig, BrokerConfigError> {
		let region = self
			.region
			.or_else(|| self.identity_pool_id.region().map(str::to_owned))
			.ok_or(BrokerConfigError::MissingRegion)?;
		let identity_endpoint = match self.identity_endpoint {
			Some(url) => url,
			None => Url::parse(&format!("https://cognito-identity.{region}.amazonaws.com/"))
				.map_err(|_| BrokerConfigError::InvalidRegion { region: region.clone() })?,
		};
		let api_base = self.api_base.ok_or(BrokerConfigError::MissingApiBase)?;
		let config = BrokerConfig {
			identity_pool_id: self.identity_pool_id,
			region,
			identity_endpoint,
			api_base,
		};

		config.validate()?;

		Ok(config)
	}
}

// Plain HTTP is only accepted for loopback hosts so local mock servers keep working.
fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), BrokerConfigError> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(BrokerConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}
