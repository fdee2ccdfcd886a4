//! Optional observability helpers for the strategy phases.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `microsoft_graph.phase` with the `phase`
//!   and `stage` (call site) fields, plus `debug!` events naming the token-acquisition branch.
//! - Enable `metrics` to increment the `microsoft_graph_phase_total` counter for every
//!   attempt/success/failure (labeled by `phase` + `outcome`) and the
//!   `microsoft_graph_token_source_total` counter (labeled by `source`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Strategy phases observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Authorize URL construction.
	Request,
	/// Callback handling, token acquisition, and profile mapping.
	Callback,
}
impl Phase {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Phase::Request => "request",
			Phase::Callback => "callback",
		}
	}
}
impl Display for Phase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseOutcome {
	/// Entry to a phase.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the host.
	Failure,
}
impl PhaseOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			PhaseOutcome::Attempt => "attempt",
			PhaseOutcome::Success => "success",
			PhaseOutcome::Failure => "failure",
		}
	}
}
impl Display for PhaseOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Branch of the acquisition procedure that settled the attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSource {
	/// Code exchange on an XHR callback.
	XhrCode,
	/// Code exchange on a regular redirect callback.
	Code,
	/// Audience-verified bearer token.
	Bearer,
	/// Code or bearer token found in a JSON body.
	JsonBody,
	/// No branch produced a token.
	None,
}
impl TokenSource {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenSource::XhrCode => "xhr_code",
			TokenSource::Code => "code",
			TokenSource::Bearer => "bearer",
			TokenSource::JsonBody => "json_body",
			TokenSource::None => "none",
		}
	}
}
impl Display for TokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
