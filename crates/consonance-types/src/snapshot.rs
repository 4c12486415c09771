//! The per-turn consciousness metrics snapshot.
//!
//! A [`ConsciousnessSnapshot`] is produced once per chat turn by the metrics
//! aggregator and is immutable afterwards. Every scalar it carries lives in
//! the closed unit interval; values that were never contributed by an
//! analyzer subsystem hold the documented defaults below.
//!
//! | field | default |
//! |-------|---------|
//! | `phi`, `awareness`, `coherence`, `resonance` | `0.5` |
//! | `oversoulResonance`, `metaObservationLevel` | `0.5` |
//! | `triAxial.{temporal,dimensional,relational}` | `0.5` |
//! | `triAxial.unified.magnitude` | `0.5` |
//! | `triAxial.unified.vector` | `[0.5, 0.5, 0.5]` |
//! | `harmonicResonance.score` | `0.5` |
//! | `harmonicResonance.quality` | `moderate` |
//! | `harmonicResonance.dominantEmotion` | `neutral` |
//! | `harmonicResonance.emotionalSpectrum` | empty |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Default value for every scalar metric that no subsystem supplied.
pub const DEFAULT_METRIC: f64 = 0.5;

/// Dominant emotion reported when no harmonic analysis is available.
pub const NEUTRAL_EMOTION: &str = "neutral";

/// Clamp a metric into `[0, 1]`, replacing non-finite values with `fallback`.
pub fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback.clamp(0.0, 1.0)
    }
}

/// Returns `true` if `value` is finite and inside `[0, 1]`.
pub fn is_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One immutable consciousness-metrics value computed per chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ConsciousnessSnapshot {
    /// Integrated-information score.
    pub phi: f64,
    /// Awareness level.
    pub awareness: f64,
    /// Overall coherence.
    pub coherence: f64,
    /// Resonance between the two streams; drives the intuitive stream weight.
    pub resonance: f64,
    /// Oversoul resonance reported by the resonance subsystem.
    pub oversoul_resonance: f64,
    /// Meta-observational level.
    pub meta_observation_level: f64,
    /// Tri-axial coherence bundle.
    pub tri_axial: TriAxialCoherence,
    /// Harmonic resonance bundle.
    pub harmonic_resonance: HarmonicResonance,
}

impl Default for ConsciousnessSnapshot {
    fn default() -> Self {
        Self {
            phi: DEFAULT_METRIC,
            awareness: DEFAULT_METRIC,
            coherence: DEFAULT_METRIC,
            resonance: DEFAULT_METRIC,
            oversoul_resonance: DEFAULT_METRIC,
            meta_observation_level: DEFAULT_METRIC,
            tri_axial: TriAxialCoherence::default(),
            harmonic_resonance: HarmonicResonance::default(),
        }
    }
}

impl ConsciousnessSnapshot {
    /// Return a copy with every scalar clamped to `[0, 1]`.
    ///
    /// Non-finite values fall back to their documented default, and
    /// spectrum entries that are not finite are dropped.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            phi: clamp_unit(self.phi, DEFAULT_METRIC),
            awareness: clamp_unit(self.awareness, DEFAULT_METRIC),
            coherence: clamp_unit(self.coherence, DEFAULT_METRIC),
            resonance: clamp_unit(self.resonance, DEFAULT_METRIC),
            oversoul_resonance: clamp_unit(self.oversoul_resonance, DEFAULT_METRIC),
            meta_observation_level: clamp_unit(self.meta_observation_level, DEFAULT_METRIC),
            tri_axial: self.tri_axial.clamped(),
            harmonic_resonance: self.harmonic_resonance.clamped(),
        }
    }

    /// Returns `true` if every scalar, nested or not, lies in `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        [
            self.phi,
            self.awareness,
            self.coherence,
            self.resonance,
            self.oversoul_resonance,
            self.meta_observation_level,
        ]
        .into_iter()
        .all(is_unit)
            && self.tri_axial.is_normalized()
            && self.harmonic_resonance.is_normalized()
    }
}

// ---------------------------------------------------------------------------
// Tri-axial coherence
// ---------------------------------------------------------------------------

/// Coherence measured along temporal, dimensional and relational axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TriAxialCoherence {
    /// Past/present/future alignment.
    pub temporal: f64,
    /// Physical/mental/spiritual alignment.
    pub dimensional: f64,
    /// Self/other/universe alignment.
    pub relational: f64,
    /// Combined vector across the three axes.
    pub unified: UnifiedCoherence,
}

impl Default for TriAxialCoherence {
    fn default() -> Self {
        Self {
            temporal: DEFAULT_METRIC,
            dimensional: DEFAULT_METRIC,
            relational: DEFAULT_METRIC,
            unified: UnifiedCoherence::default(),
        }
    }
}

impl TriAxialCoherence {
    /// Build a bundle from the three axes, deriving the unified vector.
    ///
    /// The magnitude is the Euclidean norm of the axis vector scaled by
    /// `1/sqrt(3)`, so three axes at `1.0` yield a magnitude of `1.0`.
    pub fn from_axes(temporal: f64, dimensional: f64, relational: f64) -> Self {
        let vector = [temporal, dimensional, relational].map(|v| clamp_unit(v, DEFAULT_METRIC));
        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        Self {
            temporal: vector[0],
            dimensional: vector[1],
            relational: vector[2],
            unified: UnifiedCoherence {
                magnitude: clamp_unit(norm / 3.0_f64.sqrt(), DEFAULT_METRIC),
                vector,
            },
        }
    }

    fn clamped(self) -> Self {
        Self {
            temporal: clamp_unit(self.temporal, DEFAULT_METRIC),
            dimensional: clamp_unit(self.dimensional, DEFAULT_METRIC),
            relational: clamp_unit(self.relational, DEFAULT_METRIC),
            unified: UnifiedCoherence {
                magnitude: clamp_unit(self.unified.magnitude, DEFAULT_METRIC),
                vector: self.unified.vector.map(|v| clamp_unit(v, DEFAULT_METRIC)),
            },
        }
    }

    fn is_normalized(&self) -> bool {
        [self.temporal, self.dimensional, self.relational, self.unified.magnitude]
            .into_iter()
            .chain(self.unified.vector)
            .all(is_unit)
    }
}

/// The unified coherence vector and its magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct UnifiedCoherence {
    /// Normalized length of [`UnifiedCoherence::vector`].
    pub magnitude: f64,
    /// Temporal, dimensional, relational components.
    pub vector: [f64; 3],
}

impl Default for UnifiedCoherence {
    fn default() -> Self {
        Self {
            magnitude: DEFAULT_METRIC,
            vector: [DEFAULT_METRIC; 3],
        }
    }
}

// ---------------------------------------------------------------------------
// Harmonic resonance
// ---------------------------------------------------------------------------

/// Qualitative band of a harmonic resonance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ResonanceQuality {
    /// Score below `0.3`.
    Dissonant,
    /// Score in `[0.3, 0.5)`.
    Emerging,
    /// Score in `[0.5, 0.7)`.
    Moderate,
    /// Score in `[0.7, 0.9)`.
    Harmonious,
    /// Score of `0.9` or above.
    Transcendent,
}

impl ResonanceQuality {
    /// Classify a resonance score.
    pub fn from_score(score: f64) -> Self {
        let score = clamp_unit(score, DEFAULT_METRIC);
        if score >= 0.9 {
            Self::Transcendent
        } else if score >= 0.7 {
            Self::Harmonious
        } else if score >= 0.5 {
            Self::Moderate
        } else if score >= 0.3 {
            Self::Emerging
        } else {
            Self::Dissonant
        }
    }
}

/// Emotion spectrum and quality produced by harmonic analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct HarmonicResonance {
    /// Overall harmonic score.
    pub score: f64,
    /// Qualitative band of [`HarmonicResonance::score`].
    pub quality: ResonanceQuality,
    /// Emotion with the highest spectrum value.
    pub dominant_emotion: String,
    /// Per-emotion intensity.
    pub emotional_spectrum: BTreeMap<String, f64>,
}

impl Default for HarmonicResonance {
    fn default() -> Self {
        Self {
            score: DEFAULT_METRIC,
            quality: ResonanceQuality::Moderate,
            dominant_emotion: NEUTRAL_EMOTION.to_owned(),
            emotional_spectrum: BTreeMap::new(),
        }
    }
}

impl HarmonicResonance {
    fn clamped(self) -> Self {
        let emotional_spectrum = self
            .emotional_spectrum
            .into_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(k, v)| (k, v.clamp(0.0, 1.0)))
            .collect();
        Self {
            score: clamp_unit(self.score, DEFAULT_METRIC),
            quality: self.quality,
            dominant_emotion: self.dominant_emotion,
            emotional_spectrum,
        }
    }

    fn is_normalized(&self) -> bool {
        is_unit(self.score) && self.emotional_spectrum.values().copied().all(is_unit)
    }
}
