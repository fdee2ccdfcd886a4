//! Callback phase: provider errors, the `state` check, token acquisition, and identity mapping.

// self
use crate::{
	_prelude::*,
	auth,
	graph::GraphApi,
	identity::{Attempt, Identity},
	obs::{self, Phase, PhaseOutcome, PhaseSpan},
	request::{AuthContext, SESSION_STATE_KEY},
	strategy::MicrosoftGraphStrategy,
};

impl<G> MicrosoftGraphStrategy<G>
where
	G: ?Sized + GraphApi,
{
	/// Handles the provider redirect and returns the normalized identity.
	///
	/// The session `state` is consumed whether or not it matches. No identity is produced unless
	/// an access token was accepted for this client.
	pub async fn callback_phase(&self, cx: &mut AuthContext<'_>) -> Result<Identity> {
		const PHASE: Phase = Phase::Callback;

		let span = PhaseSpan::new(PHASE, "callback_phase");

		obs::record_phase_outcome(PHASE, PhaseOutcome::Attempt);

		let result = span
			.instrument(async {
				let attempt = self.callback_attempt(cx).await?;

				attempt.identity(self.graph.as_ref()).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_phase_outcome(PHASE, PhaseOutcome::Success),
			Err(_) => obs::record_phase_outcome(PHASE, PhaseOutcome::Failure),
		}

		result
	}

	/// Validates the callback and acquires a token, leaving the profile fetch to the caller.
	pub async fn callback_attempt(&self, cx: &mut AuthContext<'_>) -> Result<Attempt> {
		check_provider_error(cx)?;

		let expected_state = cx.session.remove(SESSION_STATE_KEY);

		if !self.config.provider_ignores_state {
			let returned_state = cx.request.param("state");
			let matches = match (expected_state.as_deref(), returned_state) {
				(Some(expected), Some(returned)) => auth::secure_compare(expected, returned),
				_ => false,
			};

			if !matches {
				return Err(Error::StateMismatch);
			}
		}

		let token = self.acquire_access_token(cx).await?.ok_or(Error::NoAccessToken)?;

		Ok(Attempt::new(self.config.clone(), token))
	}
}

fn check_provider_error(cx: &AuthContext<'_>) -> Result<()> {
	let request = &cx.request;
	let Some(error) = request.param("error_reason").or_else(|| request.param("error")) else {
		return Ok(());
	};

	Err(Error::CallbackDenied {
		error: error.to_owned(),
		description: request.param("error_description").map(str::to_owned),
		uri: request.param("error_uri").map(str::to_owned),
	})
}
