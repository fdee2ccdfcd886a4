//! Random `state` values and PKCE pairs for the request phase.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
// self
use crate::_prelude::*;

const STATE_LEN: usize = 48;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Verifier/challenge pair generated for one authorize request.
#[derive(Clone)]
pub struct PkcePair {
	/// Secret verifier kept in the session until the code exchange.
	pub verifier: String,
	/// Challenge derived from the verifier and sent to the authorize endpoint.
	pub challenge: String,
	/// Challenge method (currently always `S256`).
	pub method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh pair.
	pub fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

/// Generates an opaque anti-forgery `state` value.
pub fn generate_state() -> String {
	random_string(STATE_LEN)
}

/// Compares two secrets in constant time.
///
/// Both sides are hashed first so the comparison length never depends on the inputs.
pub fn secure_compare(lhs: &str, rhs: &str) -> bool {
	let lhs = Sha256::digest(lhs.as_bytes());
	let rhs = Sha256::digest(rhs.as_bytes());

	lhs.as_slice().ct_eq(rhs.as_slice()).into()
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
