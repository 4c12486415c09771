//! Analyzer subsystem trait and partial metric contributions.
//!
//! Each analyzer inspects the user's message and contributes zero or more
//! fields of the [`ConsciousnessSnapshot`]. Contributions are partial: a
//! field an analyzer does not compute stays `None` and is filled either by
//! a lower-precedence analyzer or by the documented default.

use consonance_types::{
    ConsciousnessSnapshot, DEFAULT_METRIC, HarmonicResonance, TriAxialCoherence,
};
use futures::future::BoxFuture;

/// Errors an analyzer subsystem can report.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The analyzer did not finish within the aggregator's bounded wait.
    #[error("analyzer {name} timed out after {timeout_ms}ms")]
    Timeout {
        /// Name of the analyzer.
        name: &'static str,
        /// The bounded wait in milliseconds.
        timeout_ms: u64,
    },

    /// The analyzer failed internally.
    #[error("analyzer {name} failed: {message}")]
    Failed {
        /// Name of the analyzer.
        name: &'static str,
        /// Description of the failure.
        message: String,
    },
}

/// Everything an analyzer may look at for one chat turn.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    /// The user's message.
    pub message: String,
    /// Number of previous turns in this connection's conversation.
    pub previous_turns: usize,
}

impl AnalysisInput {
    /// Input for a message with no conversation history.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            previous_turns: 0,
        }
    }
}

/// A partial set of snapshot fields supplied by one analyzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricContribution {
    /// Contributed `phi`.
    pub phi: Option<f64>,
    /// Contributed `awareness`.
    pub awareness: Option<f64>,
    /// Contributed `coherence`.
    pub coherence: Option<f64>,
    /// Contributed `resonance`.
    pub resonance: Option<f64>,
    /// Contributed `oversoulResonance`.
    pub oversoul_resonance: Option<f64>,
    /// Contributed `metaObservationLevel`.
    pub meta_observation_level: Option<f64>,
    /// Contributed tri-axial bundle.
    pub tri_axial: Option<TriAxialCoherence>,
    /// Contributed harmonic bundle.
    pub harmonic_resonance: Option<HarmonicResonance>,
}

impl MetricContribution {
    /// Fill every field still unset in `self` from `lower`.
    ///
    /// `self` has precedence: a value it already holds is never replaced.
    /// Non-finite scalars count as unset.
    #[must_use]
    pub fn overlay(self, lower: Self) -> Self {
        Self {
            phi: finite(self.phi).or(lower.phi),
            awareness: finite(self.awareness).or(lower.awareness),
            coherence: finite(self.coherence).or(lower.coherence),
            resonance: finite(self.resonance).or(lower.resonance),
            oversoul_resonance: finite(self.oversoul_resonance).or(lower.oversoul_resonance),
            meta_observation_level: finite(self.meta_observation_level)
                .or(lower.meta_observation_level),
            tri_axial: self.tri_axial.or(lower.tri_axial),
            harmonic_resonance: self.harmonic_resonance.or(lower.harmonic_resonance),
        }
    }

    /// Build a clamped snapshot, using defaults for every unset field.
    pub fn into_snapshot(self) -> ConsciousnessSnapshot {
        ConsciousnessSnapshot {
            phi: self.phi.unwrap_or(DEFAULT_METRIC),
            awareness: self.awareness.unwrap_or(DEFAULT_METRIC),
            coherence: self.coherence.unwrap_or(DEFAULT_METRIC),
            resonance: self.resonance.unwrap_or(DEFAULT_METRIC),
            oversoul_resonance: self.oversoul_resonance.unwrap_or(DEFAULT_METRIC),
            meta_observation_level: self.meta_observation_level.unwrap_or(DEFAULT_METRIC),
            tri_axial: self.tri_axial.unwrap_or_default(),
            harmonic_resonance: self.harmonic_resonance.unwrap_or_default(),
        }
        .clamped()
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// An opaque analyzer subsystem.
///
/// Implementations must be cheap to call concurrently; the aggregator polls
/// every registered analyzer at once for each chat turn.
pub trait Analyzer: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Compute this analyzer's contribution for one turn.
    fn analyze<'a>(
        &'a self,
        input: &'a AnalysisInput,
    ) -> BoxFuture<'a, Result<MetricContribution, AnalyzerError>>;
}
