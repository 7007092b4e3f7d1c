#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use serde_json::Value;
// self
use common::*;
use federated_token_broker::{
	auth::TokenSecret,
	backend::{
		BackendErrorContext, BackendErrorKind, BackendOperation, BackendStrategy,
		DefaultBackendStrategy,
	},
	error::{Error, TransientError},
	provider::{Credential, Provider},
	session::SessionStatus,
};

/// Tags registration bodies and never treats a rejection as a credential problem.
struct TaggingStrategy;
impl BackendStrategy for TaggingStrategy {
	fn classify_error(&self, _ctx: &BackendErrorContext) -> BackendErrorKind {
		BackendErrorKind::Transient
	}

	fn augment_request(&self, operation: BackendOperation, body: &mut Value) {
		if operation != BackendOperation::Register {
			return;
		}
		if let Some(object) = body.as_object_mut() {
			object.insert("clientVersion".into(), Value::from("2.4.0"));
		}
	}
}

fn classify(ctx: BackendErrorContext) -> BackendErrorKind {
	DefaultBackendStrategy.classify_error(&ctx)
}

#[test]
fn default_strategy_prefers_error_type() {
	let ctx = BackendErrorContext::new(BackendOperation::GetOpenIdToken)
		.with_http_status(400)
		.with_error_type("TooManyRequestsException")
		.with_message("Invalid login token.");

	assert_eq!(classify(ctx), BackendErrorKind::Transient);

	let ctx = BackendErrorContext::new(BackendOperation::GetId)
		.with_http_status(500)
		.with_error_type("ResourceNotFoundException");

	assert_eq!(classify(ctx), BackendErrorKind::CredentialInvalid);
}

#[test]
fn default_strategy_falls_back_to_message_and_status() {
	let ctx = BackendErrorContext::new(BackendOperation::GetId)
		.with_http_status(500)
		.with_message("Token is expired");

	assert_eq!(classify(ctx), BackendErrorKind::CredentialInvalid);

	let ctx = BackendErrorContext::new(BackendOperation::GetId)
		.with_http_status(400)
		.with_body_preview("Rate exceeded");

	assert_eq!(classify(ctx), BackendErrorKind::Transient);
	assert_eq!(
		classify(BackendErrorContext::new(BackendOperation::GetId).with_http_status(403)),
		BackendErrorKind::CredentialInvalid
	);
	assert_eq!(
		classify(BackendErrorContext::new(BackendOperation::GetId).with_http_status(503)),
		BackendErrorKind::Transient
	);
	assert_eq!(
		classify(BackendErrorContext::new(BackendOperation::GetId)),
		BackendErrorKind::Transient
	);
}

#[tokio::test]
async fn custom_strategy_decorates_registration_requests() {
	let client = ScriptedHttpClient::default();

	client
		.reply(GET_ID, Reply::identity_id())
		.reply(GET_OPEN_ID_TOKEN, Reply::open_id_token("open-id-1"))
		.reply(REGISTER_PATH, Reply::json(200, serde_json::json!({ "userData": "ok" })));

	let broker = build_scripted_broker(
		&client,
		adapters([ScriptedAdapter::ready(Provider::Google, "google-access", Some("google-id"))]),
	)
	.with_strategy(Arc::new(TaggingStrategy));

	broker.restore_session().await.expect("Restore should succeed.");
	broker.register::<Value>(None).await.expect("Register should succeed.");

	let requests = client.requests();

	assert_eq!(requests.len(), 3);
	assert!(requests[0].body.get("clientVersion").is_none());
	assert!(requests[1].body.get("clientVersion").is_none());
	assert_eq!(
		requests[2].body,
		serde_json::json!({
			"accessToken": "google-access",
			"openIdToken": "open-id-1",
			"clientVersion": "2.4.0",
		})
	);
}

#[tokio::test]
async fn custom_strategy_controls_session_invalidation() {
	let client = ScriptedHttpClient::default();

	client.reply(
		GET_ID,
		Reply::json(
			400,
			serde_json::json!({
				"__type": "NotAuthorizedException",
				"message": "Invalid login token.",
			}),
		),
	);

	let broker =
		build_scripted_broker(&client, Vec::new()).with_strategy(Arc::new(TaggingStrategy));
	let credential = Credential::new(Provider::Facebook, "a1", Some(TokenSecret::new("a1-id")))
		.expect("Credential fixture should be valid.");
	let err = broker.exchange(credential).await.expect_err("Rejected exchange should fail.");

	assert!(matches!(err, Error::Transient(TransientError::Backend { status: Some(400), .. })));
	assert_eq!(broker.session.status(), SessionStatus::LoggedOut);
}
