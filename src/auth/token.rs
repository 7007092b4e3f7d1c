//! Federated identity tokens issued by the identity backend.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	auth::{FederatedId, TokenSecret},
};

/// Lifecycle status for an [`IdentityToken`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is valid at the inspected instant.
	Active,
	/// Token exceeded the expiry encoded in its claims.
	Expired,
	/// Token carries no readable expiry; only the backend can tell.
	Unknown,
}

/// OpenID token bound to a stable federated identity.
///
/// The `token` is short-lived; the broker replaces it through a fresh exchange whenever
/// the API reports it as expired.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityToken {
	/// Identity the token was minted for.
	pub federated_id: FederatedId,
	/// OpenID token secret; callers must avoid logging it.
	pub token: TokenSecret,
	/// Instant the broker received the token.
	pub issued_at: OffsetDateTime,
}
impl IdentityToken {
	/// Wraps a freshly issued token, stamping `issued_at` with the current clock.
	pub fn new(federated_id: FederatedId, token: impl Into<TokenSecret>) -> Self {
		Self { federated_id, token: token.into(), issued_at: OffsetDateTime::now_utc() }
	}

	/// Reads the `exp` claim when the token is a JWT.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		#[derive(Deserialize)]
		struct Claims {
			exp: Option<i64>,
		}

		let payload = self.token.expose().split('.').nth(1)?;
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
		let claims = serde_json::from_slice::<Claims>(&bytes).ok()?;

		OffsetDateTime::from_unix_timestamp(claims.exp?).ok()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		match self.expires_at() {
			Some(expires_at) if instant >= expires_at => TokenStatus::Expired,
			Some(_) => TokenStatus::Active,
			None => TokenStatus::Unknown,
		}
	}

	/// Returns `true` if the token is known to be expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}
}
impl Debug for IdentityToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityToken")
			.field("federated_id", &self.federated_id)
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn jwt(claims: &str) -> String {
		format!(
			"{}.{}.signature",
			URL_SAFE_NO_PAD.encode("{\"alg\":\"RS512\"}"),
			URL_SAFE_NO_PAD.encode(claims)
		)
	}

	fn federated_id() -> FederatedId {
		FederatedId::new("ap-northeast-1:identity").expect("Federated fixture should be valid.")
	}

	#[test]
	fn expiry_is_read_from_jwt_claims() {
		let token =
			IdentityToken::new(federated_id(), jwt("{\"sub\":\"user\",\"exp\":1700000600}"));
		let expires_at =
			token.expires_at().expect("JWT fixture should expose an expiry instant.");

		assert_eq!(expires_at.unix_timestamp(), 1_700_000_600);
		assert_eq!(
			token.status_at(expires_at - Duration::seconds(1)),
			TokenStatus::Active
		);
		assert!(token.is_expired_at(expires_at));
	}

	#[test]
	fn opaque_tokens_have_unknown_status() {
		let token = IdentityToken::new(federated_id(), "opaque-open-id-token");

		assert_eq!(token.expires_at(), None);
		assert_eq!(token.status_at(OffsetDateTime::now_utc()), TokenStatus::Unknown);
		assert!(!token.is_expired_at(OffsetDateTime::now_utc()));
	}

	#[test]
	fn debug_output_redacts_token() {
		let token = IdentityToken::new(federated_id(), "secret-open-id");
		let rendered = format!("{token:?}");

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("secret-open-id"));
	}
}
