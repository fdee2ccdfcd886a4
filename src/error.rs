//! Strategy-level error types shared across the request phase, token acquisition, and profile
//! mapping.

// self
use crate::{_prelude::*, http::Endpoint};

/// Strategy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical strategy error exposed by public APIs.
///
/// Every variant maps onto a stable [`failure_reason`](Error::failure_reason) so host frameworks
/// can route the attempt into their standard "authentication failed" flow.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Unexpected but non-fatal upstream response.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Microsoft Graph rejected or garbled the profile request.
	#[error(transparent)]
	Graph(#[from] GraphError),

	/// Provider rejected the grant (e.g., bad or reused code).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider redirected back with an `error` parameter instead of a grant.
	#[error("Provider returned `{error}` to the callback.")]
	CallbackDenied {
		/// OAuth `error` (or `error_reason`) value.
		error: String,
		/// Optional `error_description` value.
		description: Option<String>,
		/// Optional `error_uri` value.
		uri: Option<String>,
	},
	/// Returned `state` does not match the one stored during the request phase.
	#[error("Callback state does not match the session state.")]
	StateMismatch,
	/// None of the acquisition branches produced an acceptable access token.
	#[error("No access token could be obtained from the callback request.")]
	NoAccessToken,
}
impl Error {
	/// Stable failure key suitable for host-side failure routing.
	pub fn failure_reason(&self) -> &'static str {
		match self {
			Self::Config(_) => "configuration_error",
			Self::Transient(TransientError::Timeout { .. }) => "timeout",
			Self::Transport(_) => "failed_to_connect",
			Self::CallbackDenied { .. } => "callback_error",
			Self::StateMismatch => "csrf_detected",
			Self::Transient(_)
			| Self::Graph(_)
			| Self::InvalidGrant { .. }
			| Self::InvalidClient { .. }
			| Self::NoAccessToken => "invalid_credentials",
		}
	}
}

/// Configuration and validation failures raised by the strategy.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured or derived endpoint is not a valid URL.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Inbound request URL cannot be reconstructed.
	#[error("Inbound request URL is invalid.")]
	InvalidRequestUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Inbound request carries neither an absolute URI nor a `Host` header.
	#[error("Inbound request is missing a host.")]
	MissingHost,

	/// Client identifier is empty.
	#[error("Client identifier cannot be empty.")]
	MissingClientId,
	/// Client secret is empty.
	#[error("Client secret cannot be empty.")]
	MissingClientSecret,
	/// Required environment variable is unset.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Unexpected upstream responses that are not attributable to the caller.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Request timed out before the provider answered.
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint that timed out.
		endpoint: Endpoint,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport or body handling.
	#[error("I/O error occurred while handling the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: Endpoint, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Failures returned by the Microsoft Graph profile endpoint.
#[derive(Debug, ThisError)]
pub enum GraphError {
	/// Graph answered with a non-success status.
	#[error("Graph returned HTTP {status}: {body_preview}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body_preview: String,
	},
	/// Graph answered with a body that is not a JSON object.
	#[error("Graph returned a malformed profile.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
