//! The Microsoft Graph strategy: authorize URL construction, token acquisition, and the
//! callback phase that turns a provider redirect into an [`Identity`](crate::identity::Identity).

pub mod callback;
pub mod request_phase;
pub mod token;

pub use token::*;

// self
use crate::{
	_prelude::*,
	config::StrategyConfig,
	graph::GraphApi,
	request::CallbackRequest,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, graph::ReqwestGraphClient};

/// Redirect URI sent with codes obtained by in-page script when the request names none.
///
/// Must match the value registered for single-page flows byte for byte.
pub const XHR_CALLBACK_PATH: &str = "/auth/microsoft_graph/callback";

#[cfg(feature = "reqwest")]
/// Strategy specialized for the crate's default reqwest transport stack.
pub type ReqwestStrategy = MicrosoftGraphStrategy<ReqwestGraphClient>;

/// Authentication strategy shared by every attempt; holds no per-attempt state.
pub struct MicrosoftGraphStrategy<G>
where
	G: ?Sized + GraphApi,
{
	config: Arc<StrategyConfig>,
	graph: Arc<G>,
}
impl<G> MicrosoftGraphStrategy<G>
where
	G: ?Sized + GraphApi,
{
	/// Creates a strategy on top of an existing provider capability.
	pub fn with_graph(config: Arc<StrategyConfig>, graph: impl Into<Arc<G>>) -> Self {
		Self { config, graph: graph.into() }
	}

	/// Strategy configuration.
	pub fn config(&self) -> &StrategyConfig {
		&self.config
	}

	/// Provider capability used for outbound calls.
	pub fn graph(&self) -> &G {
		&self.graph
	}

	/// Redirect URI registered with the provider for this request.
	///
	/// The configured `redirect_uri` wins; otherwise the URL is rebuilt from the request's host,
	/// mount path, and callback path. The inbound query string is never included.
	pub fn callback_url(&self, request: &CallbackRequest) -> String {
		match &self.config.redirect_uri {
			Some(redirect_uri) => redirect_uri.clone(),
			None => format!(
				"{}{}{}",
				request.full_host(),
				request.script_name,
				self.config.callback_path()
			),
		}
	}
}
#[cfg(feature = "reqwest")]
impl MicrosoftGraphStrategy<ReqwestGraphClient> {
	/// Creates a strategy backed by the default reqwest transport.
	pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
		let config = Arc::new(config);
		let graph = ReqwestGraphClient::new(config.clone())?;

		Ok(Self::with_graph(config, graph))
	}
}
impl<G> Clone for MicrosoftGraphStrategy<G>
where
	G: ?Sized + GraphApi,
{
	fn clone(&self) -> Self {
		Self { config: self.config.clone(), graph: self.graph.clone() }
	}
}
impl<G> Debug for MicrosoftGraphStrategy<G>
where
	G: ?Sized + GraphApi,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MicrosoftGraphStrategy")
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::AccessToken,
		graph::{GraphFuture, RawProfile},
		oauth::CodeExchange,
	};

	struct NoopGraph;
	impl GraphApi for NoopGraph {
		fn exchange_code<'a>(&'a self, _: CodeExchange<'a>) -> GraphFuture<'a, AccessToken> {
			Box::pin(async { Err(Error::NoAccessToken) })
		}

		fn verify_audience<'a>(&'a self, _: &'a str) -> GraphFuture<'a, bool> {
			Box::pin(async { Ok(false) })
		}

		fn fetch_profile<'a>(&'a self, _: &'a AccessToken) -> GraphFuture<'a, RawProfile> {
			Box::pin(async { Ok(RawProfile::new()) })
		}
	}

	fn strategy(config: StrategyConfig) -> MicrosoftGraphStrategy<NoopGraph> {
		MicrosoftGraphStrategy::with_graph(Arc::new(config), NoopGraph)
	}

	fn request(url: &str) -> CallbackRequest {
		CallbackRequest::new(Url::parse(url).expect("Request URL fixture should parse."))
	}

	#[test]
	fn callback_url_drops_query_and_keeps_mount_path() {
		let strategy = strategy(
			StrategyConfig::builder("client", "secret").build().expect("Config should build."),
		);
		let request =
			request("https://app.example.com:8443/auth/microsoft_graph/callback?code=abc&state=s")
				.with_script_name("/portal");

		assert_eq!(
			strategy.callback_url(&request),
			"https://app.example.com:8443/portal/auth/microsoft_graph/callback"
		);
	}

	#[test]
	fn configured_redirect_uri_replaces_callback_url() {
		let strategy = strategy(
			StrategyConfig::builder("client", "secret")
				.redirect_uri("https://fixed.example.com/cb")
				.build()
				.expect("Config should build."),
		);

		assert_eq!(
			strategy.callback_url(&request("http://localhost:3000/anything?x=1")),
			"https://fixed.example.com/cb"
		);
	}

	#[test]
	fn callback_path_follows_path_prefix() {
		let strategy = strategy(
			StrategyConfig::builder("client", "secret")
				.path_prefix("/login")
				.build()
				.expect("Config should build."),
		);

		assert_eq!(
			strategy.callback_url(&request("https://app.example.com/")),
			"https://app.example.com/login/microsoft_graph/callback"
		);
	}

	#[test]
	fn strategies_accept_trait_objects() {
		let config = Arc::new(
			StrategyConfig::builder("client", "secret").build().expect("Config should build."),
		);
		let graph: Arc<dyn GraphApi> = Arc::new(NoopGraph);
		let strategy = MicrosoftGraphStrategy::<dyn GraphApi>::with_graph(config, graph);

		assert_eq!(strategy.clone().config().client_id, "client");
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn reqwest_strategy_completes_xhr_callback() {
		// crates.io
		use httpmock::prelude::*;
		// self
		use crate::{
			_preludet::build_reqwest_test_strategy,
			request::{AuthContext, SESSION_STATE_KEY},
		};

		let server = MockServer::start_async().await;
		let config = StrategyConfig::builder("client", "secret")
			.tenant("organizations")
			.site(Url::parse(&server.base_url()).expect("Mock base URL should parse."))
			.profile_url(
				Url::parse(&server.url("/v1.0/me")).expect("Mock profile URL should parse."),
			)
			.build()
			.expect("Config should build.");
		let strategy = build_reqwest_test_strategy(config);
		let token_mock = server
			.mock_async(|when, then| {
				when.method(POST).path("/organizations/oauth2/v2.0/token");
				then.status(200)
					.header("content-type", "application/json")
					.body("{\"access_token\":\"spa-access\",\"token_type\":\"Bearer\"}");
			})
			.await;
		let profile_mock = server
			.mock_async(|when, then| {
				when.method(GET).path("/v1.0/me").header("authorization", "Bearer spa-access");
				then.status(200).header("content-type", "application/json").body("{\"id\":\"u\"}");
			})
			.await;
		let mut request =
			request("https://app.example.com/auth/microsoft_graph/callback?code=c&state=s")
				.with_xhr(true);
		let mut session = HashMap::from([(SESSION_STATE_KEY.to_owned(), "s".to_owned())]);
		let identity = strategy
			.callback_phase(&mut AuthContext::new(&mut request, &mut session))
			.await
			.expect("XHR callback should succeed.");

		token_mock.assert_async().await;
		profile_mock.assert_async().await;

		assert_eq!(identity.uid.as_deref(), Some("u"));
		assert!(!identity.credentials.expires);
	}
}
