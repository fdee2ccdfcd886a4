//! Provider capability used by the strategy: code exchange, audience verification, and profile
//! fetches against Microsoft Graph.
//!
//! [`GraphApi`] is the seam between the token-acquisition procedure and the network. The
//! production implementation, [`GraphClient`], drives every call through a
//! [`ProviderHttpClient`]; tests substitute fakes that implement the same three methods.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::StrategyConfig,
	error::{ConfigError, GraphError},
	http::{Endpoint, ProviderHttpClient, ResponseMetadataSlot},
	oauth::{CodeExchange, OAuthClient, TransportErrorMapper},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Boxed future returned by [`GraphApi`] methods.
pub type GraphFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Unmodified JSON object returned by the Graph `me` resource.
pub type RawProfile = Map<String, Value>;

#[cfg(feature = "reqwest")]
/// Graph client specialized for the crate's default reqwest transport stack.
pub type ReqwestGraphClient = GraphClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Outbound calls the strategy needs from the provider.
pub trait GraphApi: Send + Sync {
	/// Exchanges an authorization code at the token endpoint.
	fn exchange_code<'a>(&'a self, exchange: CodeExchange<'a>) -> GraphFuture<'a, AccessToken>;

	/// Checks that `token` was issued for this client (or one of its authorized peers).
	///
	/// Must not expose any profile data; only the `aud` claim is inspected.
	fn verify_audience<'a>(&'a self, token: &'a str) -> GraphFuture<'a, bool>;

	/// Fetches the current user's profile with `token` as bearer credential.
	fn fetch_profile<'a>(&'a self, token: &'a AccessToken) -> GraphFuture<'a, RawProfile>;
}

/// [`GraphApi`] implementation backed by a [`ProviderHttpClient`].
pub struct GraphClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<StrategyConfig>,
	oauth_client: OAuthClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> GraphClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: Arc<StrategyConfig>,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		let oauth_client = OAuthClient::from_config(&config)?;

		Ok(Self {
			config,
			oauth_client,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}

	/// OAuth client pointed at the tenant's endpoints.
	pub fn oauth_client(&self) -> &OAuthClient {
		&self.oauth_client
	}

	async fn get_profile(&self, url: Url, bearer: Option<&str>) -> Result<RawProfile> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let mut builder = oauth2::http::Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(ACCEPT, "application/json");

		if let Some(token) = bearer {
			builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
		}

		let request: HttpRequest = builder.body(Vec::new()).map_err(ConfigError::from)?;
		let response = handle.call(request).await.map_err(|err| {
			self.error_mapper.map_transport_error(Endpoint::Profile, meta.take().as_ref(), err)
		})?;
		let status = response.status();

		if !status.is_success() {
			return Err(GraphError::Status {
				status: status.as_u16(),
				body_preview: body_preview(response.body()),
			}
			.into());
		}

		let mut deserializer = serde_json::Deserializer::from_slice(response.body());

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| GraphError::Parse { source }.into())
	}
}
#[cfg(feature = "reqwest")]
impl GraphClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client with a reqwest transport that never follows redirects.
	pub fn new(config: Arc<StrategyConfig>) -> Result<Self, ConfigError> {
		Self::with_http_client(
			config,
			ReqwestHttpClient::without_redirects()?,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> GraphApi for GraphClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_code<'a>(&'a self, exchange: CodeExchange<'a>) -> GraphFuture<'a, AccessToken> {
		Box::pin(async move {
			self.oauth_client
				.exchange_code(
					self.http_client.as_ref(),
					self.error_mapper.as_ref(),
					exchange,
					&self.config.token_params,
				)
				.await
		})
	}

	fn verify_audience<'a>(&'a self, token: &'a str) -> GraphFuture<'a, bool> {
		Box::pin(async move {
			if token.is_empty() {
				return Ok(false);
			}

			let mut url = self.config.profile_url.clone();

			url.query_pairs_mut().append_pair("access_token", token);

			let profile = self.get_profile(url, None).await?;

			Ok(self.config.trusts_audience(profile.get("aud").and_then(Value::as_str)))
		})
	}

	fn fetch_profile<'a>(&'a self, token: &'a AccessToken) -> GraphFuture<'a, RawProfile> {
		Box::pin(async move {
			self.get_profile(self.config.profile_url.clone(), Some(token.token.expose())).await
		})
	}
}
impl<C, M> Debug for GraphClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GraphClient")
			.field("config", &self.config)
			.field("oauth_client", &self.oauth_client)
			.finish()
	}
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut preview = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	preview.push('…');

	preview
}
