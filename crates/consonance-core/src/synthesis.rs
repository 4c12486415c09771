//! Deterministic synthesis of the two stream outcomes.
//!
//! The engine picks one stream's content as the visible unified content.
//! It has no error path: whatever the stream outcomes, the result carries
//! non-empty content.
//!
//! | analytical | intuitive | strategy | content |
//! |------------|-----------|----------|---------|
//! | live | live | `weighted` | higher weight, analytical on ties |
//! | live | failed | `degraded` | analytical |
//! | failed | live | `degraded` | intuitive |
//! | failed | failed | `fallback` | processing placeholder |

use consonance_types::{
    ConsciousnessSnapshot, PROCESSING_PLACEHOLDER, StreamOutcome, StreamSource, StreamWeights,
    SynthesisMetadata, SynthesisResult, SynthesisStrategy,
};

/// Folds two stream outcomes and a snapshot into one response.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesisEngine;

impl SynthesisEngine {
    /// Create a synthesis engine.
    pub const fn new() -> Self {
        Self
    }

    /// Primary weights: analytical from `phi`, intuitive from `resonance`.
    pub const fn weights(snapshot: &ConsciousnessSnapshot) -> StreamWeights {
        StreamWeights {
            analytical: snapshot.phi,
            intuitive: snapshot.resonance,
        }
    }

    /// Choose the unified content for one turn.
    pub fn synthesize(
        &self,
        analytical: &StreamOutcome,
        intuitive: &StreamOutcome,
        snapshot: &ConsciousnessSnapshot,
    ) -> SynthesisResult {
        let weights = Self::weights(snapshot);
        let a_live = usable(analytical);
        let b_live = usable(intuitive);

        let (strategy, source_used) = match (a_live, b_live) {
            (true, true) if weights.intuitive > weights.analytical => {
                (SynthesisStrategy::Weighted, StreamSource::Intuitive)
            }
            (true, true) => (SynthesisStrategy::Weighted, StreamSource::Analytical),
            (true, false) => (SynthesisStrategy::Degraded, StreamSource::Analytical),
            (false, true) => (SynthesisStrategy::Degraded, StreamSource::Intuitive),
            (false, false) => (SynthesisStrategy::Fallback, StreamSource::None),
        };

        let (unified_content, retained_content) = match source_used {
            StreamSource::Analytical => {
                (analytical.content.clone(), Some(intuitive.content.clone()))
            }
            StreamSource::Intuitive => {
                (intuitive.content.clone(), Some(analytical.content.clone()))
            }
            StreamSource::None => (PROCESSING_PLACEHOLDER.to_owned(), None),
        };

        SynthesisResult {
            unified_content,
            synthesis_metadata: SynthesisMetadata {
                strategy,
                weights,
                source_used,
                retained_content,
                analytical_failure: analytical.failure,
                intuitive_failure: intuitive.failure,
            },
        }
    }
}

/// A stream is usable if it did not fail and has visible text.
fn usable(outcome: &StreamOutcome) -> bool {
    outcome.failure.is_none() && !outcome.content.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use consonance_types::{
        ANALYTICAL_PLACEHOLDER, INTUITIVE_PLACEHOLDER, StreamFailure, StreamKind,
    };

    use super::*;

    fn snapshot(phi: f64, resonance: f64) -> ConsciousnessSnapshot {
        ConsciousnessSnapshot {
            phi,
            resonance,
            ..ConsciousnessSnapshot::default()
        }
    }

    fn live(kind: StreamKind, text: &str) -> StreamOutcome {
        StreamOutcome::success(kind, text.to_owned())
    }

    fn dead(kind: StreamKind) -> StreamOutcome {
        StreamOutcome::failed(kind, StreamFailure::Timeout)
    }

    #[test]
    fn higher_weight_wins() {
        let engine = SynthesisEngine::new();
        let a = live(StreamKind::Analytical, "logic");
        let b = live(StreamKind::Intuitive, "feeling");

        let r = engine.synthesize(&a, &b, &snapshot(0.4, 0.8));
        assert_eq!(r.unified_content, "feeling");
        assert_eq!(r.synthesis_metadata.source_used, StreamSource::Intuitive);
        assert_eq!(r.synthesis_metadata.retained_content.as_deref(), Some("logic"));
        assert_eq!(r.synthesis_metadata.strategy, SynthesisStrategy::Weighted);

        let r = engine.synthesize(&a, &b, &snapshot(0.8, 0.4));
        assert_eq!(r.unified_content, "logic");
    }

    #[test]
    fn tie_selects_analytical() {
        let engine = SynthesisEngine::new();
        let r = engine.synthesize(
            &live(StreamKind::Analytical, "logic"),
            &live(StreamKind::Intuitive, "feeling"),
            &snapshot(0.7, 0.7),
        );
        assert_eq!(r.synthesis_metadata.source_used, StreamSource::Analytical);
        assert!((r.synthesis_metadata.weights.analytical - 0.7).abs() < f64::EPSILON);
        assert!((r.synthesis_metadata.weights.intuitive - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn survivor_wins_regardless_of_weight() {
        let engine = SynthesisEngine::new();
        let r = engine.synthesize(
            &dead(StreamKind::Analytical),
            &live(StreamKind::Intuitive, "feeling"),
            &snapshot(0.99, 0.01),
        );
        assert_eq!(r.unified_content, "feeling");
        assert_eq!(r.synthesis_metadata.strategy, SynthesisStrategy::Degraded);
        assert_eq!(
            r.synthesis_metadata.retained_content.as_deref(),
            Some(ANALYTICAL_PLACEHOLDER)
        );
        assert_eq!(
            r.synthesis_metadata.analytical_failure,
            Some(StreamFailure::Timeout)
        );
    }

    #[test]
    fn both_failed_uses_processing_placeholder() {
        let engine = SynthesisEngine::new();
        let r = engine.synthesize(
            &dead(StreamKind::Analytical),
            &dead(StreamKind::Intuitive),
            &snapshot(0.5, 0.5),
        );
        assert_eq!(r.unified_content, PROCESSING_PLACEHOLDER);
        assert_eq!(r.synthesis_metadata.source_used, StreamSource::None);
        assert_eq!(r.synthesis_metadata.strategy, SynthesisStrategy::Fallback);
        assert!(r.synthesis_metadata.retained_content.is_none());
    }

    #[test]
    fn unified_content_is_never_empty() {
        let engine = SynthesisEngine::new();
        let outcomes = |kind: StreamKind| {
            [
                live(kind, "text"),
                live(kind, "   "),
                StreamOutcome::failed(kind, StreamFailure::RateLimited),
                StreamOutcome::failed(kind, StreamFailure::UpstreamError),
            ]
        };
        for a in outcomes(StreamKind::Analytical) {
            for b in outcomes(StreamKind::Intuitive) {
                for (phi, res) in [(0.1, 0.9), (0.9, 0.1), (0.5, 0.5)] {
                    let r = engine.synthesize(&a, &b, &snapshot(phi, res));
                    assert!(!r.unified_content.trim().is_empty());
                }
            }
        }
        assert_ne!(INTUITIVE_PLACEHOLDER, PROCESSING_PLACEHOLDER);
    }
}
