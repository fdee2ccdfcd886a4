//! Request-scoped inputs: the inbound callback request, its rewindable body, and the host
//! session.

// std
use std::io::{Cursor, Read, Seek};
// crates.io
use oauth2::http::{
	Request as HttpRequest,
	header::{CONTENT_TYPE, HOST},
};
use url::form_urlencoded;
// self
use crate::{_prelude::*, error::ConfigError};

/// Session key holding the anti-forgery `state`.
pub const SESSION_STATE_KEY: &str = "omniauth.state";
/// Session key holding the PKCE verifier.
pub const SESSION_PKCE_VERIFIER_KEY: &str = "omniauth.pkce.verifier";

const XHR_HEADER: &str = "x-requested-with";
const XHR_VALUE: &str = "XMLHttpRequest";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Host-owned session storage touched by the strategy.
pub trait Session {
	/// Stores `value` under `key`, replacing any previous value.
	fn insert(&mut self, key: &str, value: String);

	/// Removes and returns the value stored under `key`.
	fn remove(&mut self, key: &str) -> Option<String>;
}
impl Session for HashMap<String, String> {
	fn insert(&mut self, key: &str, value: String) {
		HashMap::insert(self, key.to_owned(), value);
	}

	fn remove(&mut self, key: &str) -> Option<String> {
		HashMap::remove(self, key)
	}
}
impl Session for BTreeMap<String, String> {
	fn insert(&mut self, key: &str, value: String) {
		BTreeMap::insert(self, key.to_owned(), value);
	}

	fn remove(&mut self, key: &str) -> Option<String> {
		BTreeMap::remove(self, key)
	}
}

/// Explicit per-attempt context handed to the strategy.
pub struct AuthContext<'a> {
	/// Inbound request being handled.
	pub request: &'a mut CallbackRequest,
	/// Host session for this user agent.
	pub session: &'a mut (dyn Session + Send),
}
impl<'a> AuthContext<'a> {
	/// Bundles a request with its session.
	pub fn new(request: &'a mut CallbackRequest, session: &'a mut (dyn Session + Send)) -> Self {
		Self { request, session }
	}
}
impl Debug for AuthContext<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthContext").field("request", &self.request).finish_non_exhaustive()
	}
}

/// Request body that can be read and then rewound for downstream consumers.
#[derive(Clone, Debug, Default)]
pub struct RequestBody(Cursor<Vec<u8>>);
impl RequestBody {
	/// Wraps raw bytes.
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(Cursor::new(bytes.into()))
	}

	/// Reads the remainder of the body from the current position.
	pub fn read_remaining(&mut self) -> std::io::Result<Vec<u8>> {
		let mut buf = Vec::new();

		self.0.read_to_end(&mut buf)?;

		Ok(buf)
	}

	/// Moves the cursor back to the start.
	pub fn rewind(&mut self) -> std::io::Result<()> {
		self.0.rewind()
	}

	/// Current read position.
	pub fn position(&self) -> u64 {
		self.0.position()
	}

	/// Full underlying bytes, regardless of position.
	pub fn as_bytes(&self) -> &[u8] {
		self.0.get_ref()
	}
}
impl Read for RequestBody {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		self.0.read(buf)
	}
}

/// Inbound callback (or request-phase) request.
#[derive(Clone, Debug)]
pub struct CallbackRequest {
	/// Full request URL, including any query string.
	pub url: Url,
	/// Mount path of the application serving the strategy.
	pub script_name: String,
	/// Merged query and form parameters.
	pub params: BTreeMap<String, String>,
	/// Whether the request was issued by in-page script.
	pub xhr: bool,
	/// `Content-Type` header value.
	pub content_type: Option<String>,
	/// Request body.
	pub body: RequestBody,
}
impl CallbackRequest {
	/// Creates a request for `url`, seeding params from its query string.
	pub fn new(url: Url) -> Self {
		let params = url.query_pairs().into_owned().collect();

		Self {
			url,
			script_name: String::new(),
			params,
			xhr: false,
			content_type: None,
			body: RequestBody::default(),
		}
	}

	/// Builds a request from an `http` request.
	///
	/// Relative URIs are resolved against the `Host` header (plain `http`). Form-encoded bodies
	/// are merged into the params, with body values winning over query values.
	pub fn from_http(request: &HttpRequest<Vec<u8>>) -> Result<Self, ConfigError> {
		let uri = request.uri();
		let url = if uri.scheme().is_some() {
			Url::parse(&uri.to_string())
		} else {
			let host = request
				.headers()
				.get(HOST)
				.and_then(|value| value.to_str().ok())
				.ok_or(ConfigError::MissingHost)?;

			Url::parse(&format!("http://{host}{uri}"))
		}
		.map_err(|source| ConfigError::InvalidRequestUrl { source })?;
		let content_type = request
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned);
		let xhr = request
			.headers()
			.get(XHR_HEADER)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| value == XHR_VALUE);
		let mut callback = Self::new(url)
			.with_xhr(xhr)
			.with_body(content_type.clone(), request.body().clone());

		if content_type.as_deref().is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE)) {
			callback.params.extend(form_urlencoded::parse(request.body()).into_owned());
		}

		Ok(callback)
	}

	/// Sets the mount path.
	pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
		self.script_name = script_name.into();

		self
	}

	/// Adds or replaces a parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(key.into(), value.into());

		self
	}

	/// Flags the request as XHR.
	pub fn with_xhr(mut self, xhr: bool) -> Self {
		self.xhr = xhr;

		self
	}

	/// Replaces the body and its content type.
	pub fn with_body(mut self, content_type: Option<String>, body: impl Into<Vec<u8>>) -> Self {
		self.content_type = content_type;
		self.body = RequestBody::new(body);

		self
	}

	/// Sets a JSON body.
	pub fn with_json_body(self, body: impl Into<Vec<u8>>) -> Self {
		self.with_body(Some("application/json".into()), body)
	}

	/// Returns a non-empty parameter value.
	pub fn param(&self, key: &str) -> Option<&str> {
		self.params.get(key).map(String::as_str).filter(|value| !value.is_empty())
	}

	/// Parameters as a JSON hash, the shape [`AccessToken::from_hash`] rebuilds tokens from.
	///
	/// [`AccessToken::from_hash`]: crate::auth::AccessToken::from_hash
	pub fn params_hash(&self) -> Map<String, Value> {
		self.params.iter().map(|(key, value)| (key.clone(), Value::String(value.clone()))).collect()
	}

	/// Returns `true` when the content type mentions JSON (case-insensitive).
	pub fn is_json(&self) -> bool {
		self.content_type.as_deref().is_some_and(|value| value.to_ascii_lowercase().contains("json"))
	}

	/// `scheme://host[:port]` of the request; default ports are omitted.
	pub fn full_host(&self) -> String {
		let mut host = format!("{}://{}", self.url.scheme(), self.url.host_str().unwrap_or_default());

		if let Some(port) = self.url.port() {
			host.push_str(&format!(":{port}"));
		}

		host
	}
}
