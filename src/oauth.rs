//! OAuth client construction and the authorization-code exchange.
//!
//! [`resolve_endpoints`] interpolates the tenant into the identity platform paths and
//! [`OAuthClient`] wraps an `oauth2` client configured against them. Token responses keep every
//! non-standard field (`id_token`, `ext_expires_in`, ...) so they can surface in
//! [`AccessToken::params`].

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, ExtraTokenFields, HttpClientError, PkceCodeVerifier, RequestTokenError,
	StandardRevocableToken, StandardTokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::{ClientAuthMethod, ClientOptions, StrategyConfig, Tenant},
	error::{ConfigError, TransientError, TransportError},
	http::{Endpoint, ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type GraphTokenResponse = StandardTokenResponse<TokenExtras, BasicTokenType>;
type ConfiguredClient = Client<
	BasicErrorResponse,
	GraphTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Maps HTTP transport failures into strategy [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a strategy error.
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(endpoint, meta, message),
			_ => map_generic_transport_error(endpoint, meta, "unknown transport failure"),
		}
	}
}

/// Tenant-specific identity platform endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderEndpoints {
	/// `{site}/{tenant}/oauth2/v2.0/authorize`.
	pub authorization: Url,
	/// `{site}/{tenant}/oauth2/v2.0/token`.
	pub token: Url,
}

/// Computes the authorize and token endpoints for a tenant.
///
/// The paths replace whatever path the site carries; only its origin is kept.
pub fn resolve_endpoints(
	options: &ClientOptions,
	tenant: &Tenant,
) -> Result<ProviderEndpoints, ConfigError> {
	let authorization = options
		.site
		.join(&format!("/{tenant}/oauth2/v2.0/authorize"))
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "authorization", source })?;
	let token = options
		.site
		.join(&format!("/{tenant}/oauth2/v2.0/token"))
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "token", source })?;

	Ok(ProviderEndpoints { authorization, token })
}

/// Token response fields beyond the RFC 6749 core set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenExtras {
	/// Every field `oauth2` does not model itself.
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}
impl ExtraTokenFields for TokenExtras {}

/// Inputs of one authorization-code exchange.
#[derive(Clone, Copy, Debug)]
pub struct CodeExchange<'a> {
	/// Authorization code returned by the provider.
	pub code: &'a str,
	/// Redirect URI sent verbatim as `redirect_uri`.
	pub redirect_uri: &'a str,
	/// PKCE verifier saved during the request phase.
	pub pkce_verifier: Option<&'a str>,
}

/// `oauth2` client pointed at the tenant's endpoints.
#[derive(Clone, Debug)]
pub struct OAuthClient {
	inner: ConfiguredClient,
	endpoints: ProviderEndpoints,
}
impl OAuthClient {
	/// Builds the client from the strategy configuration.
	pub fn from_config(config: &StrategyConfig) -> Result<Self, ConfigError> {
		let endpoints = resolve_endpoints(&config.client_options, &config.tenant)?;
		let auth_url = AuthUrl::from_url(endpoints.authorization.clone());
		let token_url = TokenUrl::from_url(endpoints.token.clone());
		let mut inner = Client::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		if matches!(config.client_options.auth_method, ClientAuthMethod::ClientSecretPost) {
			inner = inner.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self { inner, endpoints })
	}

	/// Resolved endpoints.
	pub fn endpoints(&self) -> &ProviderEndpoints {
		&self.endpoints
	}

	/// Exchanges an authorization code for an [`AccessToken`].
	///
	/// `extra_params` are appended to the form body after the standard fields.
	pub async fn exchange_code<C, M>(
		&self,
		http_client: &C,
		error_mapper: &M,
		exchange: CodeExchange<'_>,
		extra_params: &BTreeMap<String, String>,
	) -> Result<AccessToken>
	where
		C: ?Sized + ProviderHttpClient,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		let meta = ResponseMetadataSlot::default();
		let instrumented = http_client.with_metadata(meta.clone());
		let mut request = self
			.inner
			.exchange_code(AuthorizationCode::new(exchange.code.to_owned()))
			.add_extra_param("redirect_uri", exchange.redirect_uri.to_owned());

		if let Some(verifier) = exchange.pkce_verifier {
			request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_owned()));
		}
		for (key, value) in extra_params {
			request = request.add_extra_param(key.as_str(), value.as_str());
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, error_mapper))?;

		into_access_token(response, meta_status(meta.take().as_ref()))
	}
}

fn into_access_token(response: GraphTokenResponse, status: Option<u16>) -> Result<AccessToken> {
	let hash = match serde_json::to_value(&response) {
		Ok(Value::Object(hash)) => hash,
		_ => {
			return Err(TransientError::TokenEndpoint {
				message: "token response could not be re-encoded".into(),
				status,
			}
			.into());
		},
	};

	AccessToken::from_hash(hash).ok_or_else(|| {
		TransientError::TokenEndpoint { message: "access_token is empty".into(), status }.into()
	})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, meta_ref),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(Endpoint::Token, meta_ref, error),
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status: meta_status(meta_ref) }
				.into(),
		RequestTokenError::Other(message) =>
			TransientError::TokenEndpoint { message, status: meta_status(meta_ref) }.into(),
	}
}

fn map_server_response_error(
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let code = response.error().as_ref().to_owned();
	let reason = match response.error_description() {
		Some(description) => format!("{code}: {description}"),
		None => code.clone(),
	};

	match code.as_str() {
		"invalid_grant" | "access_denied" => Error::InvalidGrant { reason },
		"invalid_client" | "unauthorized_client" => Error::InvalidClient { reason },
		_ => TransientError::TokenEndpoint { message: reason, status: meta_status(meta) }.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: Endpoint, meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Timeout {
			endpoint,
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		}
		.into();
	}

	TransportError::network(endpoint, err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(
	endpoint: Endpoint,
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> Error {
	TransientError::TokenEndpoint {
		message: format!("HTTP client error while calling the {endpoint} endpoint: {message}"),
		status: meta_status(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config(site: &str, tenant: &str) -> StrategyConfig {
		StrategyConfig::builder("client-id", "secret")
			.site(Url::parse(site).expect("Site fixture should parse."))
			.tenant(tenant)
			.build()
			.expect("Config fixture should build.")
	}

	#[test]
	fn endpoints_interpolate_the_tenant() {
		let config = config("https://login.microsoftonline.com", "common");
		let endpoints = resolve_endpoints(&config.client_options, &config.tenant)
			.expect("Endpoints should resolve.");

		assert_eq!(
			endpoints.authorization.as_str(),
			"https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
		);
		assert_eq!(
			endpoints.token.as_str(),
			"https://login.microsoftonline.com/common/oauth2/v2.0/token"
		);
	}

	#[test]
	fn computed_paths_replace_any_site_path() {
		let config = config("https://login.example.com/ignored/path", "contoso.onmicrosoft.com");
		let client = OAuthClient::from_config(&config).expect("Client should build.");

		assert_eq!(
			client.endpoints().token.as_str(),
			"https://login.example.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
		);
	}

	#[test]
	fn oauth_errors_are_classified_by_code() {
		let response: BasicErrorResponse = serde_json::from_str(
			r#"{"error":"invalid_grant","error_description":"AADSTS70008: code expired"}"#,
		)
		.expect("Error fixture should parse.");

		assert!(matches!(
			map_server_response_error(response, None),
			Error::InvalidGrant { reason } if reason.contains("AADSTS70008")
		));

		let response: BasicErrorResponse =
			serde_json::from_str(r#"{"error":"invalid_client"}"#).expect("Error fixture should parse.");

		assert!(matches!(map_server_response_error(response, None), Error::InvalidClient { .. }));

		let response: BasicErrorResponse = serde_json::from_str(r#"{"error":"server_error"}"#)
			.expect("Error fixture should parse.");
		let meta = ResponseMetadata { status: Some(500) };

		assert!(matches!(
			map_server_response_error(response, Some(&meta)),
			Error::Transient(TransientError::TokenEndpoint { status: Some(500), .. })
		));
	}
}
