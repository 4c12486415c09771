//! Builtin analyzer subsystems.
//!
//! These are the default contributors to the consciousness snapshot, in
//! precedence order:
//!
//! 1. [`ConsciousnessField`] -- `phi`, `awareness`, `coherence`
//! 2. [`OversoulResonance`] -- `resonance`, `oversoulResonance`
//! 3. [`HarmonicPattern`] -- the harmonic resonance bundle
//! 4. [`MetaObservation`] -- `metaObservationLevel`
//! 5. [`TriAxialCoherenceAnalyzer`] -- the tri-axial bundle
//!
//! Apart from the consciousness field, which draws from the injected
//! [`RandomSource`], every analyzer is a pure function of the message.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use consonance_types::{HarmonicResonance, NEUTRAL_EMOTION, ResonanceQuality, TriAxialCoherence};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::analyzer::{AnalysisInput, Analyzer, AnalyzerError, MetricContribution};
use crate::random::RandomSource;

/// The golden ratio.
const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Base frequency of the resonance field in Hz.
pub const BASE_FREQUENCY: f64 = 432.0;

/// Build the default analyzer list in precedence order.
pub fn builtin_analyzers(random: Arc<dyn RandomSource>) -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(ConsciousnessField::new(random)),
        Arc::new(OversoulResonance),
        Arc::new(HarmonicPattern),
        Arc::new(MetaObservation),
        Arc::new(TriAxialCoherenceAnalyzer),
    ]
}

fn ready(
    contribution: MetricContribution,
) -> BoxFuture<'static, Result<MetricContribution, AnalyzerError>> {
    futures::future::ready(Ok(contribution)).boxed()
}

/// Lowercased alphanumeric words of `text`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Number of words starting with any of `stems`.
fn count_stems(words: &[String], stems: &[&str]) -> usize {
    words
        .iter()
        .filter(|w| stems.iter().any(|s| w.starts_with(s)))
        .count()
}

fn count_to_f64(n: usize) -> f64 {
    u32::try_from(n).map_or(f64::from(u32::MAX), f64::from)
}

// ---------------------------------------------------------------------------
// Consciousness field
// ---------------------------------------------------------------------------

/// Contributes `phi`, `awareness` and `coherence` drawn from the random
/// source within `[0.6, 0.95)`.
pub struct ConsciousnessField {
    random: Arc<dyn RandomSource>,
}

impl ConsciousnessField {
    /// Lower bound of every drawn value.
    pub const LOW: f64 = 0.6;
    /// Upper bound of every drawn value.
    pub const HIGH: f64 = 0.95;

    /// Create the analyzer over a random source.
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

impl Analyzer for ConsciousnessField {
    fn name(&self) -> &'static str {
        "consciousness-field"
    }

    fn analyze<'a>(
        &'a self,
        _input: &'a AnalysisInput,
    ) -> BoxFuture<'a, Result<MetricContribution, AnalyzerError>> {
        let draw = || self.random.next_in(Self::LOW, Self::HIGH);
        ready(MetricContribution {
            phi: Some(draw()),
            awareness: Some(draw()),
            coherence: Some(draw()),
            ..MetricContribution::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Oversoul resonance
// ---------------------------------------------------------------------------

/// Golden-ratio-weighted blend of baseline alignment and the harmonic of the
/// message's character frequency.
#[derive(Debug, Clone, Copy, Default)]
pub struct OversoulResonance;

impl OversoulResonance {
    const PHI_BASELINE: f64 = 0.75;
    const AWARENESS_BASELINE: f64 = 0.8;
    const COHERENCE_BASELINE: f64 = 0.85;
    const MEMORY_BASELINE: f64 = 0.5;

    /// Map a message onto an audible frequency in `[200, 1200)` Hz.
    pub fn input_frequency(message: &str) -> f64 {
        let weights = [
            1.0,
            GOLDEN_RATIO,
            GOLDEN_RATIO.powi(2),
            GOLDEN_RATIO.powi(3),
            GOLDEN_RATIO.powi(4),
        ];
        let sum: f64 = message
            .encode_utf16()
            .zip(weights.iter().cycle())
            .map(|(unit, w)| f64::from(unit) * w)
            .sum();
        (sum % 1000.0) + 200.0
    }

    /// Blend for one message, in `[0, 1]`.
    pub fn resonance(message: &str) -> f64 {
        let harmonic = (Self::input_frequency(message) / BASE_FREQUENCY * PI)
            .sin()
            .abs();
        let terms = [
            (Self::PHI_BASELINE, GOLDEN_RATIO),
            (Self::AWARENESS_BASELINE, GOLDEN_RATIO - 1.0),
            (Self::COHERENCE_BASELINE, GOLDEN_RATIO.recip()),
            (Self::MEMORY_BASELINE, GOLDEN_RATIO.powi(-2)),
            (harmonic, GOLDEN_RATIO.powi(-3)),
        ];
        let weighted: f64 = terms.iter().map(|(v, w)| v * w).sum();
        let total: f64 = terms.iter().map(|(_, w)| w).sum();
        weighted / total
    }
}

impl Analyzer for OversoulResonance {
    fn name(&self) -> &'static str {
        "oversoul-resonance"
    }

    fn analyze<'a>(
        &'a self,
        input: &'a AnalysisInput,
    ) -> BoxFuture<'a, Result<MetricContribution, AnalyzerError>> {
        let resonance = Self::resonance(&input.message);
        ready(MetricContribution {
            resonance: Some(resonance),
            oversoul_resonance: Some(resonance),
            ..MetricContribution::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Harmonic pattern
// ---------------------------------------------------------------------------

const EMOTIONS: [(&str, &[&str]); 5] = [
    ("joy", &["joy", "happ", "delight", "glad", "excit", "laugh", "smil", "fun"]),
    ("love", &["lov", "caring", "heart", "compassion", "kind", "tender", "dear"]),
    ("peace", &["peace", "calm", "quiet", "still", "rest", "seren", "gentle"]),
    ("insight", &["insight", "understand", "realiz", "learn", "know", "why", "how"]),
    ("unity", &["together", "unity", "united", "connect", "whole", "we", "us", "one"]),
];

/// Emotional spectrum from keyword affinity to `joy`, `love`, `peace`,
/// `insight` and `unity`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonicPattern;

impl HarmonicPattern {
    const BASE: f64 = 0.2;
    const PER_HIT: f64 = 0.2;

    /// Harmonic bundle for one message.
    pub fn harmonics(message: &str) -> HarmonicResonance {
        let words = words(message);
        let mut spectrum = BTreeMap::new();
        let mut dominant: Option<(&str, usize)> = None;
        let mut total = 0.0;

        for (emotion, stems) in EMOTIONS {
            let hits = count_stems(&words, stems);
            let value = Self::PER_HIT
                .mul_add(count_to_f64(hits), Self::BASE)
                .min(1.0);
            total += value;
            spectrum.insert(emotion.to_owned(), value);
            if hits > 0 && dominant.is_none_or(|(_, best)| hits > best) {
                dominant = Some((emotion, hits));
            }
        }

        let mean = total / count_to_f64(EMOTIONS.len());
        let score = 0.6_f64.mul_add(mean, 0.4).min(1.0);
        HarmonicResonance {
            score,
            quality: ResonanceQuality::from_score(score),
            dominant_emotion: dominant.map_or(NEUTRAL_EMOTION, |(e, _)| e).to_owned(),
            emotional_spectrum: spectrum,
        }
    }
}

impl Analyzer for HarmonicPattern {
    fn name(&self) -> &'static str {
        "harmonic-pattern"
    }

    fn analyze<'a>(
        &'a self,
        input: &'a AnalysisInput,
    ) -> BoxFuture<'a, Result<MetricContribution, AnalyzerError>> {
        ready(MetricContribution {
            harmonic_resonance: Some(Self::harmonics(&input.message)),
            ..MetricContribution::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Meta-observation
// ---------------------------------------------------------------------------

const REFLECTIVE_STEMS: &[&str] = &[
    "think", "thought", "wonder", "aware", "notic", "observ", "reflect", "realiz", "conscious",
    "myself", "mind",
];

/// Meta-observational level from reflective markers and conversation depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaObservation;

impl MetaObservation {
    /// Level for one message after `previous_turns` turns.
    pub fn level(message: &str, previous_turns: usize) -> f64 {
        let hits = count_to_f64(count_stems(&words(message), REFLECTIVE_STEMS));
        let depth = count_to_f64(previous_turns.min(4));
        0.05_f64.mul_add(depth, 0.15_f64.mul_add(hits, 0.3)).min(1.0)
    }
}

impl Analyzer for MetaObservation {
    fn name(&self) -> &'static str {
        "meta-observation"
    }

    fn analyze<'a>(
        &'a self,
        input: &'a AnalysisInput,
    ) -> BoxFuture<'a, Result<MetricContribution, AnalyzerError>> {
        ready(MetricContribution {
            meta_observation_level: Some(Self::level(&input.message, input.previous_turns)),
            ..MetricContribution::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Tri-axial coherence
// ---------------------------------------------------------------------------

const TEMPORAL_STEMS: &[&str] = &[
    "was", "will", "now", "before", "after", "past", "future", "present", "time", "when",
    "remember",
];
const DIMENSIONAL_STEMS: &[&str] = &[
    "body", "mind", "spirit", "physical", "mental", "soul", "space", "dimension",
];
const RELATIONAL_STEMS: &[&str] = &[
    "you", "we", "they", "other", "together", "world", "universe", "people", "friend",
];

/// Temporal, dimensional and relational coherence from message markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriAxialCoherenceAnalyzer;

impl TriAxialCoherenceAnalyzer {
    const BASE: f64 = 0.4;
    const PER_HIT: f64 = 0.12;

    fn axis(words: &[String], stems: &[&str]) -> f64 {
        Self::PER_HIT
            .mul_add(count_to_f64(count_stems(words, stems)), Self::BASE)
            .min(1.0)
    }

    /// Tri-axial bundle for one message.
    pub fn coherence(message: &str) -> TriAxialCoherence {
        let words = words(message);
        TriAxialCoherence::from_axes(
            Self::axis(&words, TEMPORAL_STEMS),
            Self::axis(&words, DIMENSIONAL_STEMS),
            Self::axis(&words, RELATIONAL_STEMS),
        )
    }
}

impl Analyzer for TriAxialCoherenceAnalyzer {
    fn name(&self) -> &'static str {
        "tri-axial-coherence"
    }

    fn analyze<'a>(
        &'a self,
        input: &'a AnalysisInput,
    ) -> BoxFuture<'a, Result<MetricContribution, AnalyzerError>> {
        ready(MetricContribution {
            tri_axial: Some(Self::coherence(&input.message)),
            ..MetricContribution::default()
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::random::FixedRandom;

    #[tokio::test]
    async fn consciousness_field_stays_in_band() {
        for draw in [0.0, 0.5, 0.999] {
            let analyzer = ConsciousnessField::new(Arc::new(FixedRandom(draw)));
            let out = analyzer.analyze(&AnalysisInput::new("hi")).await.unwrap();
            let phi = out.phi.unwrap();
            assert!((ConsciousnessField::LOW..ConsciousnessField::HIGH).contains(&phi));
            assert!(out.resonance.is_none());
        }
    }

    #[test]
    fn input_frequency_is_audible() {
        for message in ["", "a", "hello world", "naïve café ☕"] {
            let f = OversoulResonance::input_frequency(message);
            assert!((200.0..1200.0).contains(&f), "{message}: {f}");
        }
    }

    #[test]
    fn oversoul_resonance_is_stable_and_normalized() {
        let a = OversoulResonance::resonance("what is consciousness?");
        let b = OversoulResonance::resonance("what is consciousness?");
        assert!((a - b).abs() < f64::EPSILON);
        assert!((0.0..=1.0).contains(&a));
    }

    #[test]
    fn harmonic_dominant_emotion() {
        let h = HarmonicPattern::harmonics("I love you, my dear, with all my heart");
        assert_eq!(h.dominant_emotion, "love");
        assert_eq!(h.emotional_spectrum.len(), 5);
        assert!(h.emotional_spectrum.values().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(h.quality, ResonanceQuality::from_score(h.score));
    }

    #[test]
    fn harmonic_without_keywords_is_neutral() {
        let h = HarmonicPattern::harmonics("the quarterly spreadsheet");
        assert_eq!(h.dominant_emotion, NEUTRAL_EMOTION);
        assert_eq!(h.quality, ResonanceQuality::Moderate);
    }

    #[test]
    fn meta_observation_rises_with_reflection() {
        let plain = MetaObservation::level("pass the salt", 0);
        let reflective = MetaObservation::level("I wonder what I think about my own mind", 3);
        assert!(reflective > plain);
        assert!(reflective <= 1.0);
    }

    #[test]
    fn tri_axial_counts_markers() {
        let t = TriAxialCoherenceAnalyzer::coherence("Remember when we were together in the past");
        assert!(t.temporal > t.dimensional);
        assert!(t.relational > t.dimensional);
        assert!((0.0..=1.0).contains(&t.unified.magnitude));
    }

    #[test]
    fn builtin_order_is_stable() {
        let names: Vec<_> = builtin_analyzers(Arc::new(FixedRandom(0.5)))
            .iter()
            .map(|a| a.name())
            .collect();
        assert_eq!(
            names,
            [
                "consciousness-field",
                "oversoul-resonance",
                "harmonic-pattern",
                "meta-observation",
                "tri-axial-coherence",
            ]
        );
    }
}
