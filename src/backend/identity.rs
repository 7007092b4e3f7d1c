//! `GetId` and `GetOpenIdToken` calls against the federated-identity backend.

// self
use crate::{
	_prelude::*,
	auth::{FederatedId, IdentityToken},
	backend::{
		BackendErrorContext, BackendErrorKind, BackendFacade, BackendOperation, BackendResponse,
		TransportErrorMapper,
	},
	error::TransientError,
	http::BackendHttpClient,
	provider::LoginMap,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdRequest<'a> {
	identity_pool_id: &'a str,
	logins: &'a LoginMap,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdResponse {
	identity_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetOpenIdTokenRequest<'a> {
	identity_id: &'a str,
	logins: &'a LoginMap,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetOpenIdTokenResponse {
	identity_id: Option<String>,
	token: String,
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
	#[serde(rename = "__type")]
	error_type: Option<String>,
	#[serde(alias = "Message")]
	message: Option<String>,
}

impl<C, M> BackendFacade<'_, C, M>
where
	C: ?Sized + BackendHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Resolves the federated identity bound to `logins`.
	pub(crate) async fn get_id(&self, logins: &LoginMap) -> Result<FederatedId> {
		const OPERATION: BackendOperation = BackendOperation::GetId;

		let request =
			GetIdRequest { identity_pool_id: self.config.identity_pool_id.as_ref(), logins };
		let response = self.send(OPERATION, &self.config.identity_endpoint, &request).await?;
		let body: GetIdResponse = self.identity_reply(OPERATION, response)?;

		parse_federated_id(OPERATION, body.identity_id)
	}

	/// Requests an OpenID token for `federated_id`.
	pub(crate) async fn get_open_id_token(
		&self,
		federated_id: &FederatedId,
		logins: &LoginMap,
	) -> Result<IdentityToken> {
		const OPERATION: BackendOperation = BackendOperation::GetOpenIdToken;

		let request = GetOpenIdTokenRequest { identity_id: federated_id.as_ref(), logins };
		let response = self.send(OPERATION, &self.config.identity_endpoint, &request).await?;
		let body: GetOpenIdTokenResponse = self.identity_reply(OPERATION, response)?;
		// The backend may canonicalize the identity; trust the echoed value when present.
		let federated_id = match body.identity_id {
			Some(echoed) => parse_federated_id(OPERATION, echoed)?,
			None => federated_id.clone(),
		};

		if body.token.is_empty() {
			return Err(TransientError::Backend {
				operation: OPERATION.as_str(),
				message: "response carried an empty token".into(),
				status: None,
				retry_after: None,
			}
			.into());
		}

		Ok(IdentityToken::new(federated_id, body.token))
	}

	fn identity_reply<T>(
		&self,
		operation: BackendOperation,
		response: BackendResponse,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		if response.is_success() {
			return response.decode(operation);
		}

		let mut ctx = BackendErrorContext::new(operation).with_http_status(response.status);

		match serde_json::from_slice::<BackendErrorBody>(&response.body) {
			Ok(body) => {
				if let Some(error_type) = body.error_type {
					ctx = ctx.with_error_type(error_type);
				}
				if let Some(message) = body.message {
					ctx = ctx.with_message(message);
				}
			},
			Err(_) => {
				ctx = ctx.with_body_preview(String::from_utf8_lossy(&response.body));
			},
		}

		let reason = ctx.reason();

		Err(match self.strategy.classify_error(&ctx) {
			BackendErrorKind::CredentialInvalid => Error::CredentialInvalid { reason },
			BackendErrorKind::Transient => TransientError::Backend {
				operation: operation.as_str(),
				message: reason,
				status: Some(response.status),
				retry_after: response.retry_after,
			}
			.into(),
		})
	}
}

fn parse_federated_id(operation: BackendOperation, raw: String) -> Result<FederatedId> {
	FederatedId::new(raw).map_err(|err| {
		TransientError::Backend {
			operation: operation.as_str(),
			message: format!("response carried an invalid identity id: {err}"),
			status: None,
			retry_after: None,
		}
		.into()
	})
}
