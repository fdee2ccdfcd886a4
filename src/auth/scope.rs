//! Scope-string normalization for the authorize request.
//!
//! Microsoft expects a space-delimited `scope` parameter, while callers frequently hand over
//! comma-delimited lists (`User.Read,Mail.Read`). The normalizer first splits on whitespace,
//! then splits every survivor on commas, and finally re-joins the flattened list with single
//! spaces. Empty pieces produced *inside* a comma list are kept (so `a,,b` still yields a double
//! space); trailing empty pieces are dropped.

/// Default scope requested when neither the caller nor the configuration supplies one.
///
/// See <https://learn.microsoft.com/en-us/graph/permissions-overview> for the naming pattern.
pub const DEFAULT_SCOPE: &str = "offline_access openid email profile User.Read";

/// Returns the effective scope string for an authorize request.
///
/// `requested` wins when present (even when empty); otherwise `default` is used.
pub fn normalize_scope(requested: Option<&str>, default: &str) -> String {
	scope_tokens(requested.unwrap_or(default)).join(" ")
}

/// Splits a raw scope string into its ordered tokens.
pub fn scope_tokens(raw: &str) -> Vec<&str> {
	raw.split_whitespace().flat_map(split_commas).collect()
}

fn split_commas(item: &str) -> Vec<&str> {
	let mut pieces = item.split(',').collect::<Vec<_>>();

	while pieces.last().is_some_and(|piece| piece.is_empty()) {
		pieces.pop();
	}

	pieces
}
