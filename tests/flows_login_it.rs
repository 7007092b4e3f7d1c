#![cfg(feature = "reqwest")]

mod common;

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use federated_token_broker::{
	error::{ConfigError, Error},
	provider::{LoginMap, Provider},
	session::SessionStatus,
};

#[tokio::test]
async fn restore_keeps_first_credential_while_other_provider_hangs() {
	let client = ScriptedHttpClient::default();

	client
		.reply(GET_ID, Reply::identity_id())
		.reply(GET_OPEN_ID_TOKEN, Reply::open_id_token("open-id-a").delayed(50));

	let google = ScriptedAdapter::new(
		Provider::Google,
		50,
		Script::Credential { access: "google-access", id: Some("google-id") },
	);
	let facebook = ScriptedAdapter::pending(Provider::Facebook);
	let broker = build_scripted_broker(&client, adapters([facebook.clone(), google.clone()]));
	let tokens = tokio::time::timeout(StdDuration::from_secs(5), broker.restore_session())
		.await
		.expect("Restore should not wait for the pending provider.")
		.expect("Restore should succeed with the first credential.");

	assert_eq!(tokens.provider, Provider::Google);
	assert_eq!(tokens.access_token.expose(), "google-access");
	assert_eq!(tokens.identity.token.expose(), "open-id-a");
	assert_eq!(broker.session.status(), SessionStatus::Authenticated);
	assert_eq!(broker.session.provider(), Some(Provider::Google));
	assert_eq!(
		broker.session.logins(),
		LoginMap::from([("accounts.google.com", "google-id".to_owned())])
	);
	assert_eq!(facebook.acquired(), 1);
	assert_eq!(client.calls(GET_ID), 1);
	assert_eq!(client.calls(GET_OPEN_ID_TOKEN), 1);
}

#[tokio::test]
async fn restore_over_reqwest_transport() {
	let server = MockServer::start_async().await;
	let get_id = mock_get_id(&server).await;
	let get_token = mock_get_open_id_token(&server, "open-id-http").await;
	let amazon = ScriptedAdapter::ready(Provider::Amazon, "amzn-access", None);
	let broker = build_reqwest_broker(&server, adapters([amazon]));
	let tokens = broker.restore_session().await.expect("Restore should succeed over HTTP.");

	assert_eq!(tokens.provider, Provider::Amazon);
	assert_eq!(tokens.identity.token.expose(), "open-id-http");
	assert_eq!(tokens.identity.federated_id.as_ref(), FEDERATED_ID);

	get_id.assert_calls_async(1).await;
	get_token.assert_calls_async(1).await;
}

#[tokio::test]
async fn restore_without_any_provider_session_fails() {
	let client = ScriptedHttpClient::default();
	let broker = build_scripted_broker(
		&client,
		adapters([
			ScriptedAdapter::unavailable(Provider::Facebook),
			ScriptedAdapter::unavailable(Provider::Google),
		]),
	);
	let err = broker.restore_session().await.expect_err("Restore should fail without sessions.");

	assert!(matches!(err, Error::NoCredential { ref failures } if failures.len() == 2));
	assert_eq!(broker.session.status(), SessionStatus::LoggedOut);
	assert!(client.requests().is_empty());
}

#[tokio::test]
async fn login_uses_the_requested_provider_only() {
	let client = ScriptedHttpClient::default();

	client
		.reply(GET_ID, Reply::identity_id())
		.reply(GET_OPEN_ID_TOKEN, Reply::open_id_token("open-id-fb"));

	let facebook = ScriptedAdapter::ready(Provider::Facebook, "fb-access", None);
	let google = ScriptedAdapter::ready(Provider::Google, "google-access", Some("google-id"));
	let broker = build_scripted_broker(&client, adapters([facebook.clone(), google.clone()]));
	let tokens = broker.login(Provider::Facebook).await.expect("Facebook login should succeed.");

	assert_eq!(tokens.provider, Provider::Facebook);
	assert_eq!(google.acquired(), 0);
	assert_eq!(
		broker.session.logins(),
		LoginMap::from([("graph.facebook.com", "fb-access".to_owned())])
	);

	let err = broker.login(Provider::Apple).await.expect_err("Apple has no adapter.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::AdapterMissing { provider: Provider::Apple })
	));
	assert_eq!(broker.session.status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn logout_signs_out_everywhere_and_is_idempotent() {
	let client = ScriptedHttpClient::default();

	client
		.reply(GET_ID, Reply::identity_id())
		.reply(GET_OPEN_ID_TOKEN, Reply::open_id_token("open-id-1"));

	let facebook = ScriptedAdapter::ready(Provider::Facebook, "fb-access", None);
	let google = ScriptedAdapter::unavailable(Provider::Google);
	let broker = build_scripted_broker(&client, adapters([facebook.clone(), google.clone()]));
	let supplier = broker.logins_supplier();

	broker.restore_session().await.expect("Restore should succeed.");

	assert!(!supplier().is_empty());

	broker.logout().await;
	broker.logout().await;

	assert_eq!(broker.session.status(), SessionStatus::LoggedOut);
	assert!(broker.session.tokens().is_none());
	assert!(supplier().is_empty());
	assert_eq!(facebook.signed_out(), 2);
	assert_eq!(google.signed_out(), 2);
}
