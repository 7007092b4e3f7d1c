//! Authenticated call to the application registration API.

// crates.io
use serde::Deserializer;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	backend::{BackendFacade, BackendOperation, TransportErrorMapper},
	error::{ConfigError, TransientError},
	http::BackendHttpClient,
};

/// Route appended to the configured API base.
pub const REGISTER_ROUTE: &str = "register";

const UNAUTHORIZED: u16 = 401;

/// Typical registration reply: an optional embedded status and the user record.
///
/// Use it as the `T` of [`Broker::register`](crate::flows::Broker::register) when the API
/// returns `{statusCode?, userData?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "U: Deserialize<'de>"))]
pub struct RegistrationResponse<U = serde_json::Value> {
	/// Status code embedded in the body, when the API reports one as a number or a numeric
	/// string. Anything else reads as `None`.
	#[serde(
		default,
		deserialize_with = "deserialize_lenient_status",
		skip_serializing_if = "Option::is_none"
	)]
	pub status_code: Option<u16>,
	/// User record returned by the API.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_data: Option<U>,
}

/// Result of a single registration attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome<T> {
	/// The API accepted the identity token.
	Registered(T),
	/// The API reported the identity token as expired or unauthorized.
	Unauthorized,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRequest<'a> {
	access_token: &'a str,
	open_id_token: &'a str,
}

fn deserialize_lenient_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;

	Ok(status_from_value(&value))
}

fn status_from_value(value: &Value) -> Option<u16> {
	match value {
		Value::Number(number) => number.as_u64().and_then(|code| u16::try_from(code).ok()),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

// Only a numeric `statusCode` of 401 on a JSON object marks the token as rejected.
fn reports_unauthorized(body: &[u8]) -> bool {
	match serde_json::from_slice::<Value>(body) {
		Ok(Value::Object(fields)) => fields
			.get("statusCode")
			.and_then(Value::as_u64)
			.is_some_and(|code| code == u64::from(UNAUTHORIZED)),
		_ => false,
	}
}

impl<C, M> BackendFacade<'_, C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Posts `{accessToken, openIdToken}` to the registration route once.
	///
	/// An HTTP 401, or a body whose `statusCode` is 401, is reported as
	/// [`RegistrationOutcome::Unauthorized`] so the caller can decide whether to retry.
	pub(crate) async fn register<T>(
		&self,
		access_token: &TokenSecret,
		open_id_token: &TokenSecret,
	) -> Result<RegistrationOutcome<T>>
	where
		T: DeserializeOwned,
	{
		const OPERATION: BackendOperation = BackendOperation::Register;

		let url = self
			.config
			.api_endpoint(REGISTER_ROUTE)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "register", source })?;
		let request = RegistrationRequest {
			access_token: access_token.expose(),
			open_id_token: open_id_token.expose(),
		};
		let response = self.send(OPERATION, &url, &request).await?;

		if response.status == UNAUTHORIZED {
			return Ok(RegistrationOutcome::Unauthorized);
		}
		if !response.is_success() {
			let body = String::from_utf8_lossy(&response.body);
			let message = if body.trim().is_empty() {
				format!("HTTP {}", response.status)
			} else {
				body.into_owned()
			};

			return Err(TransientError::Backend {
				operation: OPERATION.as_str(),
				message,
				status: Some(response.status),
				retry_after: response.retry_after,
			}
			.into());
		}

		if reports_unauthorized(&response.body) {
			return Ok(RegistrationOutcome::Unauthorized);
		}

		response.decode(OPERATION).map(RegistrationOutcome::Registered)
	}
}
