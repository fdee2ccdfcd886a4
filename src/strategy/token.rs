//! Token acquisition: decide from the callback request's shape how to obtain an access token.
//!
//! Branches are tried in a fixed order and the first match wins:
//!
//! 1. `code` on an XHR request: exchange it, redirecting to the explicit `redirect_uri` or
//!    [`XHR_CALLBACK_PATH`].
//! 2. `code` on a regular request: exchange it, redirecting to the explicit `redirect_uri` or the
//!    canonical callback URL.
//! 3. bearer `access_token`: accept it only after the provider confirms the audience. A rejected
//!    bearer ends the procedure without a token.
//! 4. JSON body: read it, rewind it, and apply the `code`/`access_token` rules to its fields.
//! 5. Otherwise there is no token.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::TransportError,
	graph::GraphApi,
	oauth::CodeExchange,
	obs::{self, TokenSource},
	request::{AuthContext, CallbackRequest, SESSION_PKCE_VERIFIER_KEY},
	strategy::{MicrosoftGraphStrategy, XHR_CALLBACK_PATH},
};

/// Network action selected for a callback request, before anything is sent.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenRequest {
	/// Exchange an authorization code.
	ExchangeCode {
		/// Authorization code.
		code: String,
		/// Redirect URI sent verbatim with the exchange.
		redirect_uri: String,
		/// Branch that produced the code.
		source: TokenSource,
	},
	/// Verify a bearer token's audience, then rebuild it from `params`.
	VerifyBearer {
		/// Bearer token value.
		token: String,
		/// Hash the token is rebuilt from once accepted.
		params: Map<String, Value>,
		/// Branch that produced the token.
		source: TokenSource,
	},
	/// No branch matched.
	None,
}
impl TokenRequest {
	/// Branch label for observability.
	pub fn source(&self) -> TokenSource {
		match self {
			Self::ExchangeCode { source, .. } | Self::VerifyBearer { source, .. } => *source,
			Self::None => TokenSource::None,
		}
	}
}

impl<G> MicrosoftGraphStrategy<G>
where
	G: ?Sized + GraphApi,
{
	/// Selects the acquisition branch for `request` without touching the network.
	///
	/// A JSON body is read and always rewound, so downstream consumers see it unchanged. A body
	/// that fails to parse emits a warning and yields [`TokenRequest::None`]. A body `code` without
	/// any `redirect_uri` redirects to the canonical callback URL, not to [`XHR_CALLBACK_PATH`].
	pub fn resolve_token_request(&self, request: &mut CallbackRequest) -> Result<TokenRequest> {
		let redirect_uri = request.param("redirect_uri").map(str::to_owned);

		if let Some(code) = request.param("code") {
			let (redirect_uri, source) = if request.xhr {
				(redirect_uri.unwrap_or_else(|| XHR_CALLBACK_PATH.into()), TokenSource::XhrCode)
			} else {
				(redirect_uri.unwrap_or_else(|| self.callback_url(request)), TokenSource::Code)
			};

			return Ok(TokenRequest::ExchangeCode { code: code.to_owned(), redirect_uri, source });
		}
		if let Some(token) = request.param("access_token") {
			return Ok(TokenRequest::VerifyBearer {
				token: token.to_owned(),
				params: request.params_hash(),
				source: TokenSource::Bearer,
			});
		}
		if !request.is_json() {
			return Ok(TokenRequest::None);
		}

		let raw = request.body.read_remaining().map_err(TransportError::from);

		request.body.rewind().map_err(TransportError::from)?;

		let body = match serde_json::from_slice::<Value>(&raw?) {
			Ok(Value::Object(body)) => body,
			Ok(_) => return Ok(TokenRequest::None),
			Err(e) => {
				obs::warn_malformed_json(&e);

				return Ok(TokenRequest::None);
			},
		};
		let field = |key: &str| body.get(key).and_then(Value::as_str).filter(|v| !v.is_empty());

		if let Some(code) = field("code") {
			let redirect_uri = redirect_uri
				.or_else(|| field("redirect_uri").map(str::to_owned))
				.unwrap_or_else(|| self.callback_url(request));

			return Ok(TokenRequest::ExchangeCode {
				code: code.to_owned(),
				redirect_uri,
				source: TokenSource::JsonBody,
			});
		}
		if let Some(token) = field("access_token") {
			return Ok(TokenRequest::VerifyBearer {
				token: token.to_owned(),
				params: body.clone(),
				source: TokenSource::JsonBody,
			});
		}

		Ok(TokenRequest::None)
	}

	/// Runs the acquisition procedure for one callback.
	///
	/// `Ok(None)` means no branch produced an acceptable token: nothing usable was supplied, the
	/// JSON body was malformed, or a bearer token was issued for another client. Provider and
	/// transport failures surface as errors.
	pub async fn acquire_access_token(
		&self,
		cx: &mut AuthContext<'_>,
	) -> Result<Option<AccessToken>> {
		let token_request = self.resolve_token_request(cx.request)?;
		let source = token_request.source();

		obs::trace_token_source(source);

		let token = match token_request {
			TokenRequest::ExchangeCode { code, redirect_uri, .. } => {
				let verifier = if self.config.pkce {
					cx.session.remove(SESSION_PKCE_VERIFIER_KEY)
				} else {
					None
				};
				let exchange = CodeExchange {
					code: &code,
					redirect_uri: &redirect_uri,
					pkce_verifier: verifier.as_deref(),
				};

				Some(self.graph.exchange_code(exchange).await?)
			},
			TokenRequest::VerifyBearer { token, params, .. } =>
				if self.graph.verify_audience(&token).await? {
					AccessToken::from_hash(params)
				} else {
					None
				},
			TokenRequest::None => None,
		};

		obs::record_token_source(if token.is_some() { source } else { TokenSource::None });

		Ok(token)
	}
}
