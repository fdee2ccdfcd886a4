//! Walks through both strategy phases against the live Microsoft identity platform.
//!
//! Run once without arguments to print the authorize URL, then rerun with the `code` and `state`
//! values from the redirect: `cargo run --example sign_in -- <code> <state>`.

// std
use std::{collections::HashMap, env};
// crates.io
use color_eyre::{Result, eyre::eyre};
use url::Url;
// self
use microsoft_graph_strategy::{
	config::StrategyConfig,
	request::{AuthContext, CallbackRequest, SESSION_STATE_KEY},
	strategy::ReqwestStrategy,
};

const APP_ORIGIN: &str = "http://localhost:3000";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = StrategyConfig::from_env()?;
	let strategy = ReqwestStrategy::new(config)?;
	let mut args = env::args().skip(1);

	match (args.next(), args.next()) {
		(Some(code), Some(state)) => {
			let mut request = CallbackRequest::new(Url::parse(&format!(
				"{APP_ORIGIN}/auth/microsoft_graph/callback"
			))?)
			.with_param("code", code)
			.with_param("state", state.clone());
			// The demo has no cookie store; trust the state echoed on the command line.
			let mut session = HashMap::from([(SESSION_STATE_KEY.to_owned(), state)]);
			let identity = strategy
				.callback_phase(&mut AuthContext::new(&mut request, &mut session))
				.await
				.map_err(|e| eyre!("sign-in failed ({}): {e}", e.failure_reason()))?;

			println!(
				"Signed in {} <{}>.",
				identity.info.fullname,
				identity.info.email.unwrap_or_default()
			);
			println!("Graph object id: {}.", identity.uid.unwrap_or_default());
		},
		_ => {
			let mut request =
				CallbackRequest::new(Url::parse(&format!("{APP_ORIGIN}/auth/microsoft_graph"))?);
			let mut session = HashMap::<String, String>::new();
			let url = strategy.request_phase(&mut AuthContext::new(&mut request, &mut session))?;

			println!("Send your user to {url}.");
			println!("Expect them back at {}.", strategy.callback_url(&request));
		},
	}

	Ok(())
}
