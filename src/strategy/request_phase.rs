//! Request phase: authorize parameters and the provider authorize URL.

// self
use crate::{
	_prelude::*,
	auth::{self, PkcePair},
	graph::GraphApi,
	oauth,
	obs::{self, Phase, PhaseOutcome, PhaseSpan},
	request::{AuthContext, SESSION_PKCE_VERIFIER_KEY, SESSION_STATE_KEY},
	strategy::MicrosoftGraphStrategy,
};

impl<G> MicrosoftGraphStrategy<G>
where
	G: ?Sized + GraphApi,
{
	/// Computes the authorize parameters and records `state` (and the PKCE verifier) in the
	/// session.
	///
	/// Static authorize params are overlaid with the configured scope and a fresh `state`; each
	/// configured authorize option present (and non-empty) on the request then replaces its
	/// value. The scope is normalized and `access_type` defaults to `offline`.
	pub fn authorize_params(&self, cx: &mut AuthContext<'_>) -> BTreeMap<String, String> {
		let mut params = self.config.authorize_params.clone();

		params.insert("scope".into(), self.config.scope.clone());
		params.insert("state".into(), auth::generate_state());

		for key in &self.config.authorize_options {
			if let Some(value) = cx.request.param(key) {
				params.insert(key.clone(), value.to_owned());
			}
		}

		let scope =
			auth::normalize_scope(params.get("scope").map(String::as_str), auth::DEFAULT_SCOPE);

		params.insert("scope".into(), scope);
		params.entry("access_type".into()).or_insert_with(|| "offline".into());

		if self.config.pkce {
			let pkce = PkcePair::generate();

			params.insert("code_challenge".into(), pkce.challenge);
			params.insert("code_challenge_method".into(), pkce.method.as_str().into());
			cx.session.insert(SESSION_PKCE_VERIFIER_KEY, pkce.verifier);
		}
		if let Some(state) = params.get("state") {
			cx.session.insert(SESSION_STATE_KEY, state.clone());
		}

		params
	}

	/// Builds the URL the user agent is redirected to.
	///
	/// The authorize parameters override the base `response_type`/`client_id`/`redirect_uri`
	/// triple when they share a key.
	pub fn request_phase(&self, cx: &mut AuthContext<'_>) -> Result<Url> {
		const PHASE: Phase = Phase::Request;

		let _guard = PhaseSpan::new(PHASE, "request_phase").entered();

		obs::record_phase_outcome(PHASE, PhaseOutcome::Attempt);

		let result = self.authorize_url(cx);

		match &result {
			Ok(_) => obs::record_phase_outcome(PHASE, PhaseOutcome::Success),
			Err(_) => obs::record_phase_outcome(PHASE, PhaseOutcome::Failure),
		}

		result
	}

	fn authorize_url(&self, cx: &mut AuthContext<'_>) -> Result<Url> {
		let endpoints = oauth::resolve_endpoints(&self.config.client_options, &self.config.tenant)?;
		let mut query = BTreeMap::from([
			("response_type".to_owned(), "code".to_owned()),
			("client_id".to_owned(), self.config.client_id.clone()),
			("redirect_uri".to_owned(), self.callback_url(cx.request)),
		]);

		query.extend(self.authorize_params(cx));

		let mut url = endpoints.authorization;

		url.query_pairs_mut().extend_pairs(&query);

		Ok(url)
	}
}
