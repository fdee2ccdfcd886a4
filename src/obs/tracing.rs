// self
use crate::{
	_prelude::*,
	obs::{Phase, TokenSource},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedPhase<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedPhase<F> = F;

/// A span builder used by the strategy phases.
#[derive(Clone, Debug)]
pub struct PhaseSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl PhaseSpan {
	/// Creates a new span tagged with the provided phase + stage.
	pub fn new(phase: Phase, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("microsoft_graph.phase", phase = phase.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (phase, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> PhaseSpanGuard {
		#[cfg(feature = "tracing")]
		{
			PhaseSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			PhaseSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedPhase<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`PhaseSpan::entered`].
pub struct PhaseSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for PhaseSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("PhaseSpanGuard(..)")
	}
}

/// Emits a debug event naming the acquisition branch that was taken.
pub fn trace_token_source(source: TokenSource) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(source = source.as_str(), "Selected token acquisition branch.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = source;
	}
}

/// Reports a callback body that claimed to be JSON but failed to parse.
///
/// Falls back to standard error when `tracing` is disabled so the diagnostic is never lost.
pub fn warn_malformed_json(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(%error, "Callback body is not valid JSON; ignoring it.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		eprintln!("microsoft_graph: callback body is not valid JSON; ignoring it: {error}");
	}
}
