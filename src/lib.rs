//! Microsoft Graph sign-in strategy: authorization-code callbacks, audience-checked bearer tokens,
//! and normalized Graph profiles layered on top of the `oauth2` crate.
//!
//! A host framework drives two phases:
//!
//! - [`MicrosoftGraphStrategy::request_phase`](strategy::MicrosoftGraphStrategy::request_phase)
//!   builds the Microsoft identity platform authorize URL and stashes `state` in the session.
//! - [`MicrosoftGraphStrategy::callback_phase`](strategy::MicrosoftGraphStrategy::callback_phase)
//!   decides how to obtain an access token from the callback request, then maps the Graph `me`
//!   resource into an [`Identity`](identity::Identity).

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod http;
pub mod identity;
pub mod oauth;
pub mod obs;
pub mod request;
pub mod strategy;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::StrategyConfig,
		graph::GraphClient,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		strategy::{MicrosoftGraphStrategy, ReqwestStrategy},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`MicrosoftGraphStrategy`] backed by the reqwest transport used across tests.
	pub fn build_reqwest_test_strategy(config: StrategyConfig) -> ReqwestStrategy {
		let config = Arc::new(config);
		let graph = GraphClient::with_http_client(
			config.clone(),
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.expect("Failed to build Graph client for tests.");

		MicrosoftGraphStrategy::with_graph(config, graph)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tracing_subscriber as _};
