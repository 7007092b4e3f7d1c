//! Restores a session from whichever provider answers first, then calls the registration API
//! against a local mock of both backends.

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use federated_token_broker::{
	auth::{IdentityPoolId, TokenSecret},
	backend::{RegistrationResponse, ReqwestTransportErrorMapper},
	config::BrokerConfig,
	error::ProviderUnavailable,
	flows::ReqwestBroker,
	http::ReqwestHttpClient,
	provider::{AdapterFuture, Credential, Provider, ProviderAdapter},
	reqwest::Client,
};

/// Stand-in for a native SDK that already holds a login.
struct DemoAdapter {
	provider: Provider,
	access_token: Option<&'static str>,
	latency: StdDuration,
}
impl ProviderAdapter for DemoAdapter {
	fn provider(&self) -> Provider {
		self.provider
	}

	fn acquire(&self) -> AdapterFuture<'_, Credential> {
		Box::pin(async move {
			tokio::time::sleep(self.latency).await;

			match self.access_token {
				Some(token) => Credential::new(self.provider, token, None),
				None => Err(ProviderUnavailable::new(self.provider, "not signed in")),
			}
		})
	}

	fn sign_out(&self) -> AdapterFuture<'_, ()> {
		Box::pin(async { Ok(()) })
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let get_id = server
		.mock_async(|when, then| {
			when.method(POST).path("/").header("x-amz-target", "AWSCognitoIdentityService.GetId");
			then.status(200).body("{\"IdentityId\":\"ap-northeast-1:demo-identity\"}");
		})
		.await;
	let get_token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/")
				.header("x-amz-target", "AWSCognitoIdentityService.GetOpenIdToken");
			then.status(200).body(
				"{\"IdentityId\":\"ap-northeast-1:demo-identity\",\"Token\":\"demo-open-id\"}",
			);
		})
		.await;
	let register = server
		.mock_async(|when, then| {
			when.method(POST).path("/prod/register");
			then.status(200).body("{\"statusCode\":200,\"userData\":{\"userId\":\"demo-user\"}}");
		})
		.await;
	let config = BrokerConfig::builder(IdentityPoolId::new(
		"ap-northeast-1:4e86b831-da7f-47d5-8382-3d800cd28a25",
	)?)
	.identity_endpoint(Url::parse(&server.url("/"))?)
	.api_base(Url::parse(&server.url("/prod"))?)
	.build()?;
	let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
		Arc::new(DemoAdapter {
			provider: Provider::Facebook,
			access_token: None,
			latency: StdDuration::from_millis(10),
		}),
		Arc::new(DemoAdapter {
			provider: Provider::Google,
			access_token: Some("demo-google-access"),
			latency: StdDuration::from_millis(30),
		}),
	];
	// The mock server uses a self-signed certificate.
	let client = Client::builder().danger_accept_invalid_certs(true).build()?;
	let http_client = ReqwestHttpClient::with_client(client);
	let broker = ReqwestBroker::with_http_client(
		config,
		adapters,
		http_client,
		Arc::new(ReqwestTransportErrorMapper),
	);
	let tokens = broker.restore_session().await?;

	println!("Restored {} session for {}.", tokens.provider, tokens.identity.federated_id);

	let response = broker
		.register::<RegistrationResponse>(Some(TokenSecret::new("demo-open-id")))
		.await?;

	println!("Registered user: {:?}.", response.user_data);

	get_id.assert_async().await;
	get_token.assert_async().await;
	register.assert_async().await;

	Ok(())
}
