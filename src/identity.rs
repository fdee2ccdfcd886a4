//! Normalized identity built from the Graph `me` resource.
//!
//! An [`Attempt`] owns the accepted access token of one authentication attempt and memoizes the
//! raw profile, so every accessor after the first is served without another outbound call.

// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenSecret},
	config::{STRATEGY_NAME, StrategyConfig},
	graph::{GraphApi, RawProfile},
};

/// Identity handed to the host after a successful callback.
#[derive(Clone, Debug, Serialize)]
pub struct Identity {
	/// Strategy name (`microsoft_graph`).
	pub provider: &'static str,
	/// Graph object id.
	pub uid: Option<String>,
	/// Normalized user details.
	pub info: UserInfo,
	/// Token material for the host's own Graph calls.
	pub credentials: Credentials,
	/// Unnormalized context.
	pub extra: IdentityExtra,
}

/// Normalized user details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserInfo {
	/// `mail`, falling back to `userPrincipalName`.
	pub email: Option<String>,
	/// `givenName`.
	pub first_name: Option<String>,
	/// `surname`.
	pub last_name: Option<String>,
	/// `"{givenName} {surname}"` with missing parts rendered empty.
	pub fullname: String,
	/// `displayName`.
	pub name: Option<String>,
}

/// Credentials section of an [`Identity`].
#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
	/// Access token secret.
	pub token: TokenSecret,
	/// Refresh token secret, when issued.
	pub refresh_token: Option<TokenSecret>,
	/// Whether the token carries an expiry.
	pub expires: bool,
	/// Expiry instant, when known.
	pub expires_at: Option<OffsetDateTime>,
}

/// Unnormalized context attached to an [`Identity`].
#[derive(Clone, Debug, Serialize)]
pub struct IdentityExtra {
	/// Full Graph profile.
	pub raw_info: RawProfile,
	/// Token response parameters beyond the typed fields.
	pub params: Map<String, Value>,
	/// Configured client id.
	pub aud: String,
}

/// Per-attempt state: the accepted token plus the memoized profile.
pub struct Attempt {
	config: Arc<StrategyConfig>,
	token: AccessToken,
	raw_info: OnceCell<RawProfile>,
}
impl Attempt {
	/// Starts an attempt for an accepted token.
	pub fn new(config: Arc<StrategyConfig>, token: AccessToken) -> Self {
		Self { config, token, raw_info: OnceCell::new() }
	}

	/// Accepted access token.
	pub fn token(&self) -> &AccessToken {
		&self.token
	}

	/// Raw Graph profile, fetched on first use.
	pub async fn raw_info<G>(&self, graph: &G) -> Result<&RawProfile>
	where
		G: ?Sized + GraphApi,
	{
		self.raw_info.get_or_try_init(|| graph.fetch_profile(&self.token)).await
	}

	/// Graph object id.
	pub async fn uid<G>(&self, graph: &G) -> Result<Option<String>>
	where
		G: ?Sized + GraphApi,
	{
		Ok(string_field(self.raw_info(graph).await?, "id"))
	}

	/// Normalized user details.
	pub async fn info<G>(&self, graph: &G) -> Result<UserInfo>
	where
		G: ?Sized + GraphApi,
	{
		Ok(map_info(self.raw_info(graph).await?))
	}

	/// Builds the full identity, fetching the profile if it has not been read yet.
	pub async fn identity<G>(&self, graph: &G) -> Result<Identity>
	where
		G: ?Sized + GraphApi,
	{
		let raw_info = self.raw_info(graph).await?;

		Ok(Identity {
			provider: STRATEGY_NAME,
			uid: string_field(raw_info, "id"),
			info: map_info(raw_info),
			credentials: Credentials {
				token: self.token.token.clone(),
				refresh_token: self.token.refresh_token.clone(),
				expires: self.token.expires(),
				expires_at: self.token.expires_at,
			},
			extra: IdentityExtra {
				raw_info: raw_info.clone(),
				params: self.token.params.clone(),
				aud: self.config.client_id.clone(),
			},
		})
	}
}
impl Debug for Attempt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Attempt")
			.field("token", &self.token)
			.field("profile_loaded", &self.raw_info.is_initialized())
			.finish()
	}
}

/// Maps a raw Graph profile onto [`UserInfo`].
pub fn map_info(raw: &RawProfile) -> UserInfo {
	let first_name = string_field(raw, "givenName");
	let last_name = string_field(raw, "surname");
	let fullname = format!(
		"{} {}",
		first_name.as_deref().unwrap_or_default(),
		last_name.as_deref().unwrap_or_default()
	);

	UserInfo {
		email: string_field(raw, "mail").or_else(|| string_field(raw, "userPrincipalName")),
		first_name,
		last_name,
		fullname,
		name: string_field(raw, "displayName"),
	}
}

fn string_field(raw: &RawProfile, key: &str) -> Option<String> {
	raw.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{graph::GraphFuture, oauth::CodeExchange};

	struct CountingGraph {
		profile: RawProfile,
		fetches: AtomicUsize,
	}
	impl GraphApi for CountingGraph {
		fn exchange_code<'a>(&'a self, _: CodeExchange<'a>) -> GraphFuture<'a, AccessToken> {
			Box::pin(async { Err(Error::NoAccessToken) })
		}

		fn verify_audience<'a>(&'a self, _: &'a str) -> GraphFuture<'a, bool> {
			Box::pin(async { Ok(false) })
		}

		fn fetch_profile<'a>(&'a self, _: &'a AccessToken) -> GraphFuture<'a, RawProfile> {
			Box::pin(async move {
				self.fetches.fetch_add(1, Ordering::SeqCst);

				Ok(self.profile.clone())
			})
		}
	}

	fn profile(value: Value) -> RawProfile {
		match value {
			Value::Object(map) => map,
			_ => panic!("Fixture must be a JSON object."),
		}
	}

	fn config() -> Arc<StrategyConfig> {
		Arc::new(
			StrategyConfig::builder("client-123", "secret")
				.build()
				.expect("Config fixture should build."),
		)
	}

	#[test]
	fn email_falls_back_to_user_principal_name() {
		let info = map_info(&profile(json!({
			"mail": null,
			"userPrincipalName": "ada@contoso.onmicrosoft.com",
			"givenName": "Ada",
			"displayName": "Ada L."
		})));

		assert_eq!(info.email.as_deref(), Some("ada@contoso.onmicrosoft.com"));
		assert_eq!(info.first_name.as_deref(), Some("Ada"));
		assert_eq!(info.last_name, None);
		assert_eq!(info.fullname, "Ada ");
		assert_eq!(info.name.as_deref(), Some("Ada L."));
	}

	#[test]
	fn mail_wins_when_present() {
		let info = map_info(&profile(json!({
			"mail": "ada@contoso.com",
			"userPrincipalName": "ada@contoso.onmicrosoft.com"
		})));

		assert_eq!(info.email.as_deref(), Some("ada@contoso.com"));
		assert_eq!(info.fullname, " ");
	}

	#[tokio::test]
	async fn profile_is_fetched_once_per_attempt() {
		let graph = CountingGraph {
			profile: profile(json!({
				"id": "uid-1",
				"mail": "ada@contoso.com",
				"givenName": "Ada",
				"surname": "Lovelace"
			})),
			fetches: AtomicUsize::new(0),
		};
		let mut token = AccessToken::new("at");

		token.params.insert("id_token".into(), json!("idt"));

		let attempt = Attempt::new(config(), token);

		assert_eq!(attempt.uid(&graph).await.expect("uid should resolve."), Some("uid-1".into()));
		assert_eq!(attempt.info(&graph).await.expect("info should resolve.").fullname, "Ada Lovelace");

		let identity = attempt.identity(&graph).await.expect("Identity should build.");

		assert_eq!(graph.fetches.load(Ordering::SeqCst), 1);
		assert_eq!(identity.provider, "microsoft_graph");
		assert_eq!(identity.extra.aud, "client-123");
		assert_eq!(identity.extra.params.get("id_token"), Some(&json!("idt")));
		assert_eq!(identity.credentials.token.expose(), "at");
		assert!(!identity.credentials.expires);
	}
}
