//! Access tokens accepted by the strategy.
//!
//! An [`AccessToken`] is either the result of an authorization-code exchange or a bearer value
//! reconstructed from a trusted inbound hash. Well-known fields (`access_token`,
//! `refresh_token`, `expires_in`, `expires_at`) are lifted into typed slots; every other field
//! stays in [`AccessToken::params`] so hosts can reach `id_token`, `token_type`, `scope`, or
//! `ext_expires_in` without the strategy having to model them.

pub mod secret;

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Bearer credential plus the provider's accompanying parameters.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Access token secret; callers must avoid logging it.
	pub token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Relative lifetime reported by the provider, in seconds.
	pub expires_in: Option<i64>,
	/// Absolute expiry instant, derived from `expires_in` when not supplied.
	pub expires_at: Option<OffsetDateTime>,
	/// Remaining response fields.
	pub params: Map<String, Value>,
}
impl AccessToken {
	/// Creates a token with no refresh token, expiry, or extra parameters.
	pub fn new(token: impl Into<String>) -> Self {
		Self {
			token: TokenSecret::new(token),
			refresh_token: None,
			expires_in: None,
			expires_at: None,
			params: Map::new(),
		}
	}

	/// Rebuilds a token from a key/value hash, returning `None` when no non-empty
	/// `access_token` string is present.
	pub fn from_hash(mut hash: Map<String, Value>) -> Option<Self> {
		Self::from_hash_at(&mut hash, OffsetDateTime::now_utc())
	}

	/// Returns `true` when the token carries an expiry.
	pub fn expires(&self) -> bool {
		self.expires_at.is_some()
	}

	/// Returns `true` when the token expired at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| expires_at <= instant)
	}

	fn from_hash_at(hash: &mut Map<String, Value>, now: OffsetDateTime) -> Option<Self> {
		let token = match hash.remove("access_token") {
			Some(Value::String(token)) if !token.is_empty() => token,
			_ => return None,
		};
		let refresh_token = match hash.remove("refresh_token") {
			Some(Value::String(refresh)) if !refresh.is_empty() => Some(TokenSecret::new(refresh)),
			_ => None,
		};
		let expires_in = hash.remove("expires_in").as_ref().and_then(integer_field);
		let expires_at = hash
			.remove("expires_at")
			.as_ref()
			.and_then(integer_field)
			.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
			.or_else(|| expires_in.and_then(|secs| now.checked_add(Duration::seconds(secs))));

		Some(Self {
			token: TokenSecret::new(token),
			refresh_token,
			expires_in,
			expires_at,
			params: std::mem::take(hash),
		})
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("token", &self.token)
			.field("refresh_token", &self.refresh_token)
			.field("expires_in", &self.expires_in)
			.field("expires_at", &self.expires_at)
			.field("params", &self.params.keys().collect::<Vec<_>>())
			.finish()
	}
}

fn integer_field(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}
