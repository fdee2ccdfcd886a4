//! Strategy configuration: tenant, client credentials, endpoints, and request-shaping options.
//!
//! Configuration is resolved once at startup, either through [`StrategyConfig::builder`],
//! serde deserialization, or [`StrategyConfig::from_env`], and is immutable afterwards.

// self
use crate::{_prelude::*, auth::DEFAULT_SCOPE, error::ConfigError};

/// Strategy name used in callback paths and identities.
pub const STRATEGY_NAME: &str = "microsoft_graph";
/// Default identity platform origin.
pub const DEFAULT_SITE: &str = "https://login.microsoftonline.com";
/// Graph resource used for audience checks and profile fetches.
pub const DEFAULT_PROFILE_URL: &str = "https://graph.microsoft.com/v1.0/me";
/// Mount prefix for strategy routes.
pub const DEFAULT_PATH_PREFIX: &str = "/auth";
/// Request parameters forwarded to the authorize endpoint when present.
pub const DEFAULT_AUTHORIZE_OPTIONS: [&str; 7] =
	["scope", "state", "callback_url", "access_type", "auth_type", "prompt", "response_mode"];

const ENV_CLIENT_ID: &str = "MICROSOFT_GRAPH_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "MICROSOFT_GRAPH_CLIENT_SECRET";
const ENV_TENANT: &str = "MICROSOFT_GRAPH_TENANT";
const ENV_SCOPE: &str = "MICROSOFT_GRAPH_SCOPE";
const ENV_REDIRECT_URI: &str = "MICROSOFT_GRAPH_REDIRECT_URI";
const ENV_AUTHORIZED_CLIENT_IDS: &str = "MICROSOFT_GRAPH_AUTHORIZED_CLIENT_IDS";

/// Directory that governs the sign-in.
///
/// Any string other than the three well-known values is treated as a tenant id or domain and
/// interpolated verbatim; the provider rejects unknown tenants on its own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tenant {
	/// Both Microsoft accounts and work or school accounts.
	#[default]
	Common,
	/// Work or school accounts only.
	Organizations,
	/// Personal Microsoft accounts only.
	Consumers,
	/// A specific tenant id (GUID) or verified domain.
	Directory(String),
}
impl Tenant {
	/// Path segment used in the authorize/token endpoints.
	pub fn as_str(&self) -> &str {
		match self {
			Tenant::Common => "common",
			Tenant::Organizations => "organizations",
			Tenant::Consumers => "consumers",
			Tenant::Directory(tenant) => tenant,
		}
	}
}
impl From<String> for Tenant {
	fn from(value: String) -> Self {
		match value.as_str() {
			"common" => Tenant::Common,
			"organizations" => Tenant::Organizations,
			"consumers" => Tenant::Consumers,
			_ => Tenant::Directory(value),
		}
	}
}
impl From<&str> for Tenant {
	fn from(value: &str) -> Self {
		Self::from(value.to_owned())
	}
}
impl From<Tenant> for String {
	fn from(value: Tenant) -> Self {
		value.as_str().to_owned()
	}
}
impl Display for Tenant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How the client authenticates against the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic with `client_id`/`client_secret`.
	#[default]
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Options layered underneath the tenant-derived endpoints.
///
/// The authorize and token paths are always computed from the tenant; only the origin and the
/// client authentication method come from here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
	/// Identity platform origin.
	pub site: Url,
	/// Token endpoint client authentication.
	pub auth_method: ClientAuthMethod,
}
impl Default for ClientOptions {
	fn default() -> Self {
		Self { site: default_site(), auth_method: ClientAuthMethod::default() }
	}
}

/// Immutable strategy configuration.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct StrategyConfig {
	/// Application (client) id registered with the identity platform.
	pub client_id: String,
	/// Client secret paired with [`client_id`](Self::client_id).
	pub client_secret: String,
	/// Directory that governs the sign-in.
	#[serde(default)]
	pub tenant: Tenant,
	/// Site and client-auth options.
	#[serde(default)]
	pub client_options: ClientOptions,
	/// Scope requested when the inbound request supplies none.
	#[serde(default = "default_scope")]
	pub scope: String,
	/// Fixed redirect URI that replaces the computed callback URL.
	#[serde(default)]
	pub redirect_uri: Option<String>,
	/// Additional client ids whose tokens are accepted in bearer callbacks.
	#[serde(default)]
	pub authorized_client_ids: Vec<String>,
	/// Request parameters forwarded to the authorize endpoint when non-empty.
	#[serde(default = "default_authorize_options")]
	pub authorize_options: Vec<String>,
	/// Static parameters always sent to the authorize endpoint.
	#[serde(default)]
	pub authorize_params: BTreeMap<String, String>,
	/// Static parameters always sent to the token endpoint.
	#[serde(default)]
	pub token_params: BTreeMap<String, String>,
	/// Mount prefix of the strategy routes.
	#[serde(default = "default_path_prefix")]
	pub path_prefix: String,
	/// Callback path override; defaults to `{path_prefix}/microsoft_graph/callback`.
	#[serde(default)]
	pub callback_path: Option<String>,
	/// Graph `me` resource.
	#[serde(default = "default_profile_url")]
	pub profile_url: Url,
	/// Skips the callback `state` check.
	#[serde(default)]
	pub provider_ignores_state: bool,
	/// Enables PKCE (S256) on the authorize and token requests.
	#[serde(default)]
	pub pkce: bool,
}
impl StrategyConfig {
	/// Creates a builder seeded with the client credentials.
	pub fn builder(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> StrategyConfigBuilder {
		StrategyConfigBuilder::new(client_id, client_secret)
	}

	/// Loads the configuration from `MICROSOFT_GRAPH_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
		let client_id = read(ENV_CLIENT_ID).ok_or(ConfigError::MissingEnv { name: ENV_CLIENT_ID })?;
		let client_secret =
			read(ENV_CLIENT_SECRET).ok_or(ConfigError::MissingEnv { name: ENV_CLIENT_SECRET })?;
		let mut builder = Self::builder(client_id, client_secret);

		if let Some(tenant) = read(ENV_TENANT) {
			builder = builder.tenant(tenant.trim());
		}
		if let Some(scope) = read(ENV_SCOPE) {
			builder = builder.scope(scope);
		}
		if let Some(redirect_uri) = read(ENV_REDIRECT_URI) {
			builder = builder.redirect_uri(redirect_uri);
		}
		if let Some(ids) = read(ENV_AUTHORIZED_CLIENT_IDS) {
			builder = builder.authorized_client_ids(
				ids.split(|c: char| c == ',' || c.is_whitespace()).filter(|id| !id.is_empty()),
			);
		}

		builder.build()
	}

	/// Path the provider redirects back to, relative to the mount point.
	pub fn callback_path(&self) -> String {
		self.callback_path
			.clone()
			.unwrap_or_else(|| format!("{}/{STRATEGY_NAME}/callback", self.path_prefix))
	}

	/// Returns `true` when a token issued for `aud` may be used with this client.
	pub fn trusts_audience(&self, aud: Option<&str>) -> bool {
		aud.is_some_and(|aud| {
			aud == self.client_id || self.authorized_client_ids.iter().any(|id| id == aud)
		})
	}
}
impl Debug for StrategyConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StrategyConfig")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("tenant", &self.tenant)
			.field("client_options", &self.client_options)
			.field("scope", &self.scope)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorized_client_ids", &self.authorized_client_ids)
			.field("authorize_options", &self.authorize_options)
			.field("path_prefix", &self.path_prefix)
			.field("callback_path", &self.callback_path)
			.field("profile_url", &self.profile_url)
			.field("provider_ignores_state", &self.provider_ignores_state)
			.field("pkce", &self.pkce)
			.finish()
	}
}

/// Builder for [`StrategyConfig`] values.
#[derive(Debug)]
pub struct StrategyConfigBuilder {
	config: StrategyConfig,
}
impl StrategyConfigBuilder {
	/// Creates a builder with every optional field at its default.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			config: StrategyConfig {
				client_id: client_id.into(),
				client_secret: client_secret.into(),
				tenant: Tenant::default(),
				client_options: ClientOptions::default(),
				scope: default_scope(),
				redirect_uri: None,
				authorized_client_ids: Vec::new(),
				authorize_options: default_authorize_options(),
				authorize_params: BTreeMap::new(),
				token_params: BTreeMap::new(),
				path_prefix: default_path_prefix(),
				callback_path: None,
				profile_url: default_profile_url(),
				provider_ignores_state: false,
				pkce: false,
			},
		}
	}

	/// Sets the tenant.
	pub fn tenant(mut self, tenant: impl Into<Tenant>) -> Self {
		self.config.tenant = tenant.into();

		self
	}

	/// Overrides the identity platform origin.
	pub fn site(mut self, site: Url) -> Self {
		self.config.client_options.site = site;

		self
	}

	/// Overrides the token endpoint client authentication.
	pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.config.client_options.auth_method = method;

		self
	}

	/// Overrides the default scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.config.scope = scope.into();

		self
	}

	/// Pins the redirect URI instead of computing it per request.
	pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
		self.config.redirect_uri = Some(redirect_uri.into());

		self
	}

	/// Trusts tokens minted for additional client ids.
	pub fn authorized_client_ids<I, S>(mut self, ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.config.authorized_client_ids = ids.into_iter().map(Into::into).collect();

		self
	}

	/// Replaces the list of forwarded authorize options.
	pub fn authorize_options<I, S>(mut self, options: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.config.authorize_options = options.into_iter().map(Into::into).collect();

		self
	}

	/// Adds a static authorize parameter.
	pub fn authorize_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.config.authorize_params.insert(key.into(), value.into());

		self
	}

	/// Adds a static token request parameter.
	pub fn token_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.config.token_params.insert(key.into(), value.into());

		self
	}

	/// Overrides the mount prefix.
	pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.config.path_prefix = prefix.into();

		self
	}

	/// Overrides the callback path.
	pub fn callback_path(mut self, path: impl Into<String>) -> Self {
		self.config.callback_path = Some(path.into());

		self
	}

	/// Overrides the Graph `me` resource.
	pub fn profile_url(mut self, url: Url) -> Self {
		self.config.profile_url = url;

		self
	}

	/// Toggles the callback `state` check.
	pub fn provider_ignores_state(mut self, ignore: bool) -> Self {
		self.config.provider_ignores_state = ignore;

		self
	}

	/// Toggles PKCE.
	pub fn pkce(mut self, enabled: bool) -> Self {
		self.config.pkce = enabled;

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<StrategyConfig, ConfigError> {
		if self.config.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId);
		}
		if self.config.client_secret.is_empty() {
			return Err(ConfigError::MissingClientSecret);
		}

		Ok(self.config)
	}
}

fn default_site() -> Url {
	Url::parse(DEFAULT_SITE).expect("Default site must be a valid URL.")
}

fn default_profile_url() -> Url {
	Url::parse(DEFAULT_PROFILE_URL).expect("Default profile URL must be a valid URL.")
}

fn default_scope() -> String {
	DEFAULT_SCOPE.to_owned()
}

fn default_path_prefix() -> String {
	DEFAULT_PATH_PREFIX.to_owned()
}

fn default_authorize_options() -> Vec<String> {
	DEFAULT_AUTHORIZE_OPTIONS.iter().map(|option| (*option).to_owned()).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn tenant_round_trips_well_known_values() {
		assert_eq!(Tenant::from("common"), Tenant::Common);
		assert_eq!(Tenant::from("organizations"), Tenant::Organizations);
		assert_eq!(Tenant::from("consumers"), Tenant::Consumers);
		assert_eq!(Tenant::from("contoso.onmicrosoft.com").as_str(), "contoso.onmicrosoft.com");
		assert_eq!(
			serde_json::from_str::<Tenant>("\"consumers\"").expect("Tenant should deserialize."),
			Tenant::Consumers
		);
	}

	#[test]
	fn builder_applies_defaults_and_validates_credentials() {
		let config = StrategyConfig::builder("client", "secret")
			.build()
			.expect("Config with credentials should build.");

		assert_eq!(config.tenant, Tenant::Common);
		assert_eq!(config.scope, DEFAULT_SCOPE);
		assert_eq!(config.client_options.site.as_str(), "https://login.microsoftonline.com/");
		assert_eq!(config.callback_path(), "/auth/microsoft_graph/callback");
		assert_eq!(config.authorize_options.len(), DEFAULT_AUTHORIZE_OPTIONS.len());
		assert!(matches!(
			StrategyConfig::builder(" ", "secret").build(),
			Err(ConfigError::MissingClientId)
		));
		assert!(matches!(
			StrategyConfig::builder("client", "").build(),
			Err(ConfigError::MissingClientSecret)
		));
	}

	#[test]
	fn audience_trust_covers_own_and_authorized_ids() {
		let config = StrategyConfig::builder("client", "secret")
			.authorized_client_ids(["mobile-app"])
			.build()
			.expect("Config should build.");

		assert!(config.trusts_audience(Some("client")));
		assert!(config.trusts_audience(Some("mobile-app")));
		assert!(!config.trusts_audience(Some("someone-else")));
		assert!(!config.trusts_audience(None));
	}

	#[test]
	fn lookup_reads_every_variable() {
		let vars = HashMap::from([
			(ENV_CLIENT_ID, "env-client"),
			(ENV_CLIENT_SECRET, "env-secret"),
			(ENV_TENANT, "organizations"),
			(ENV_SCOPE, "openid,User.Read"),
			(ENV_REDIRECT_URI, "https://app.example.com/cb"),
			(ENV_AUTHORIZED_CLIENT_IDS, "a, b c"),
		]);
		let config = StrategyConfig::from_lookup(|name| vars.get(name).map(|v| (*v).to_owned()))
			.expect("Config should load from lookup.");

		assert_eq!(config.client_id, "env-client");
		assert_eq!(config.tenant, Tenant::Organizations);
		assert_eq!(config.scope, "openid,User.Read");
		assert_eq!(config.redirect_uri.as_deref(), Some("https://app.example.com/cb"));
		assert_eq!(config.authorized_client_ids, vec!["a", "b", "c"]);
		assert!(!format!("{config:?}").contains("env-secret"));
	}

	#[test]
	fn lookup_requires_credentials() {
		let err = StrategyConfig::from_lookup(|_| None).expect_err("Missing variables must fail.");

		assert!(matches!(err, ConfigError::MissingEnv { name: ENV_CLIENT_ID }));
	}

	#[test]
	fn deserialization_fills_defaults() {
		let config: StrategyConfig = serde_json::from_str(
			r#"{"client_id":"c","client_secret":"s","tenant":"contoso.com","pkce":true}"#,
		)
		.expect("Config should deserialize.");

		assert_eq!(config.tenant, Tenant::Directory("contoso.com".into()));
		assert_eq!(config.profile_url.as_str(), DEFAULT_PROFILE_URL);
		assert_eq!(config.path_prefix, DEFAULT_PATH_PREFIX);
		assert!(config.pkce);
	}
}
