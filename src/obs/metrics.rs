// self
use crate::obs::{Phase, PhaseOutcome, TokenSource};

/// Records a phase outcome via the global metrics recorder (when enabled).
pub fn record_phase_outcome(phase: Phase, outcome: PhaseOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"microsoft_graph_phase_total",
			"phase" => phase.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (phase, outcome);
	}
}

/// Records which acquisition branch settled an attempt.
pub fn record_token_source(source: TokenSource) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("microsoft_graph_token_source_total", "source" => source.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = source;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_phase_outcome(Phase::Callback, PhaseOutcome::Failure);
		record_token_source(TokenSource::None);
	}
}
