#![cfg(feature = "reqwest")]

// std
use std::collections::HashMap;
// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use microsoft_graph_strategy::{
	config::StrategyConfig,
	error::{Error, GraphError},
	request::{AuthContext, CallbackRequest, SESSION_STATE_KEY},
	strategy::ReqwestStrategy,
};

const CLIENT_ID: &str = "client-it";
const CLIENT_SECRET: &str = "secret-it";
const TENANT: &str = "tenant-123";

fn build_strategy(server: &MockServer) -> ReqwestStrategy {
	let config = StrategyConfig::builder(CLIENT_ID, CLIENT_SECRET)
		.tenant(TENANT)
		.site(Url::parse(&server.base_url()).expect("Mock server base URL should parse."))
		.profile_url(Url::parse(&server.url("/v1.0/me")).expect("Mock profile URL should parse."))
		.provider_ignores_state(true)
		.build()
		.expect("Strategy config should build.");

	ReqwestStrategy::new(config).expect("Reqwest strategy should build.")
}

fn callback(query: &str) -> CallbackRequest {
	CallbackRequest::new(
		Url::parse(&format!("https://app.example.com/auth/microsoft_graph/callback?{query}"))
			.expect("Callback URL fixture should parse."),
	)
}

#[tokio::test]
async fn code_callback_exchanges_and_fetches_profile() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("/{TENANT}/oauth2/v2.0/token"))
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-1\",\"refresh_token\":\"refresh-1\",\"token_type\":\"Bearer\",\"expires_in\":3600,\"id_token\":\"idt\"}",
				);
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/me").header("authorization", "Bearer access-1");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"id\":\"uid-1\",\"mail\":null,\"userPrincipalName\":\"ada@contoso.com\",\"givenName\":\"Ada\",\"surname\":\"Lovelace\",\"displayName\":\"Ada Lovelace\"}",
				);
		})
		.await;
	let mut request = callback("code=code-1");
	let mut session = HashMap::<String, String>::new();
	let identity = strategy
		.callback_phase(&mut AuthContext::new(&mut request, &mut session))
		.await
		.expect("Callback should produce an identity.");

	token_mock.assert_async().await;
	profile_mock.assert_async().await;

	assert_eq!(identity.uid.as_deref(), Some("uid-1"));
	assert_eq!(identity.info.email.as_deref(), Some("ada@contoso.com"));
	assert_eq!(identity.info.fullname, "Ada Lovelace");
	assert_eq!(identity.credentials.token.expose(), "access-1");
	assert_eq!(identity.extra.params.get("id_token").and_then(|v| v.as_str()), Some("idt"));
}

#[tokio::test]
async fn trusted_bearer_is_verified_through_query_parameter() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let verify_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/me").query_param("access_token", "bearer-1");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"aud\":\"{CLIENT_ID}\"}}"));
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/me").header("authorization", "Bearer bearer-1");
			then.status(200).header("content-type", "application/json").body("{\"id\":\"uid-2\"}");
		})
		.await;
	let mut request = callback("access_token=bearer-1");
	let mut session = HashMap::<String, String>::new();
	let identity = strategy
		.callback_phase(&mut AuthContext::new(&mut request, &mut session))
		.await
		.expect("Trusted bearer should produce an identity.");

	verify_mock.assert_async().await;
	profile_mock.assert_async().await;

	assert_eq!(identity.uid.as_deref(), Some("uid-2"));
	assert_eq!(identity.info.email, None);
}

#[tokio::test]
async fn foreign_bearer_is_rejected_without_identity() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let verify_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/me").query_param("access_token", "foreign-1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"aud\":\"another-client\"}");
		})
		.await;
	let mut request = callback("access_token=foreign-1");
	let mut session = HashMap::<String, String>::new();
	let err = strategy
		.callback_phase(&mut AuthContext::new(&mut request, &mut session))
		.await
		.expect_err("Foreign bearer must be rejected.");

	verify_mock.assert_async().await;

	assert!(matches!(err, Error::NoAccessToken));
}

#[tokio::test]
async fn invalid_grant_is_classified() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(format!("/{TENANT}/oauth2/v2.0/token"));
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"AADSTS70008: expired code\"}");
		})
		.await;
	let mut request = callback("code=stale");
	let mut session = HashMap::<String, String>::new();
	let err = strategy
		.callback_phase(&mut AuthContext::new(&mut request, &mut session))
		.await
		.expect_err("Expired code must fail.");

	token_mock.assert_async().await;

	assert!(matches!(err, Error::InvalidGrant { ref reason } if reason.contains("AADSTS70008")));
	assert_eq!(err.failure_reason(), "invalid_credentials");
}

#[tokio::test]
async fn request_phase_points_at_tenant_authorize_endpoint() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let mut request = CallbackRequest::new(
		Url::parse("https://app.example.com/auth/microsoft_graph?scope=User.Read,Mail.Read")
			.expect("Request URL fixture should parse."),
	);
	let mut session = HashMap::<String, String>::new();
	let url = strategy
		.request_phase(&mut AuthContext::new(&mut request, &mut session))
		.expect("Authorize URL should build.");
	let query = url.query_pairs().into_owned().collect::<HashMap<_, _>>();

	assert!(url.as_str().starts_with(&server.url(format!("/{TENANT}/oauth2/v2.0/authorize"))));
	assert_eq!(query.get("scope").map(String::as_str), Some("User.Read Mail.Read"));
	assert_eq!(query.get("access_type").map(String::as_str), Some("offline"));
	assert_eq!(query.get("state"), session.get(SESSION_STATE_KEY));
}

#[tokio::test]
async fn profile_redirects_are_not_followed() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(format!("/{TENANT}/oauth2/v2.0/token"));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-9\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let redirect_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/me");
			then.status(302).header("location", server.url("/elsewhere/me"));
		})
		.await;
	let elsewhere_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/elsewhere/me");
			then.status(200).header("content-type", "application/json").body("{\"id\":\"leak\"}");
		})
		.await;
	let mut request = callback("code=code-9");
	let mut session = HashMap::<String, String>::new();
	let err = strategy
		.callback_phase(&mut AuthContext::new(&mut request, &mut session))
		.await
		.expect_err("A redirected profile response must fail.");

	token_mock.assert_async().await;
	redirect_mock.assert_async().await;
	elsewhere_mock.assert_calls_async(0).await;

	assert!(matches!(err, Error::Graph(GraphError::Status { status: 302, .. })));
}
