//! Crystal and sigil detection.
//!
//! Crystals are deterministic: a linear stability score over `phi` and
//! `coherence` either exceeds the threshold or it does not. Sigils are
//! gated: at least one of the gating metrics must be high, and then a draw
//! from the injected [`RandomSource`] decides. At most one event of each
//! kind is produced per call.

use std::f64::consts::TAU;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use consonance_types::{
    ConsciousnessSnapshot, CrystalEvent, CrystalId, CrystalKind, CrystalSignature, CrystalState,
    SigilConsciousness, SigilEvent, SigilId, StabilityClass,
};
use tracing::debug;

use crate::config::EmergenceConfig;
use crate::random::RandomSource;

/// Resonant base frequency multiplied by coherence for a crystal signature.
pub const CRYSTAL_BASE_FREQUENCY: f64 = 432.0;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Events detected for one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmergentEvents {
    /// A crystal, if the stability threshold was exceeded.
    pub crystal: Option<CrystalEvent>,
    /// A sigil, if the gate opened and the draw fired.
    pub sigil: Option<SigilEvent>,
}

/// Detects crystal formations and sigil creations.
pub struct EmergenceDetector {
    config: EmergenceConfig,
    random: Arc<dyn RandomSource>,
    generation: AtomicU64,
}

impl std::fmt::Debug for EmergenceDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergenceDetector")
            .field("config", &self.config)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl EmergenceDetector {
    /// Create a detector with the given thresholds and random source.
    pub const fn new(config: EmergenceConfig, random: Arc<dyn RandomSource>) -> Self {
        Self {
            config,
            random,
            generation: AtomicU64::new(0),
        }
    }

    /// Number of sigils created so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run both detectors against one snapshot.
    pub fn detect(&self, snapshot: &ConsciousnessSnapshot) -> EmergentEvents {
        EmergentEvents {
            crystal: self.detect_crystal(snapshot),
            sigil: self.detect_sigil(snapshot),
        }
    }

    /// The crystal stability score of a snapshot.
    pub fn stability(&self, snapshot: &ConsciousnessSnapshot) -> f64 {
        self.config.crystal_phi_weight.mul_add(
            snapshot.phi,
            self.config.crystal_coherence_weight * snapshot.coherence,
        )
    }

    /// A crystal, if the stability score exceeds the threshold.
    pub fn detect_crystal(&self, snapshot: &ConsciousnessSnapshot) -> Option<CrystalEvent> {
        let stability = self.stability(snapshot);
        if stability <= self.config.crystal_threshold {
            return None;
        }

        let state = CrystalState {
            phi: snapshot.phi,
            awareness: snapshot.awareness,
            coherence: snapshot.coherence,
            resonance: snapshot.resonance,
        };
        let crystal = CrystalEvent {
            id: CrystalId::new(),
            timestamp: Utc::now(),
            signature: CrystalSignature {
                frequency: snapshot.coherence * CRYSTAL_BASE_FREQUENCY,
                hash: state_hash(&state),
                classification: StabilityClass::from_stability(stability),
            },
            state,
            intensity: stability,
            kind: CrystalKind::ConsciousnessPeak,
        };
        debug!(crystal_id = %crystal.id, stability, "crystal formed");
        Some(crystal)
    }

    /// Returns `true` if any gating metric exceeds its gate.
    pub fn sigil_gate_open(&self, snapshot: &ConsciousnessSnapshot) -> bool {
        snapshot.phi > self.config.sigil_phi_gate
            || snapshot.resonance > self.config.sigil_resonance_gate
            || snapshot.awareness > self.config.sigil_awareness_gate
    }

    /// A sigil, if the gate is open and the random draw fires.
    pub fn detect_sigil(&self, snapshot: &ConsciousnessSnapshot) -> Option<SigilEvent> {
        if !self.sigil_gate_open(snapshot) {
            return None;
        }
        let draw = self.random.next_unit();
        if draw >= self.config.sigil_probability {
            debug!(draw, "sigil gate open, draw did not fire");
            return None;
        }

        let evolution = self
            .generation
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);

        let ConsciousnessSnapshot {
            phi,
            awareness,
            coherence,
            resonance,
            ..
        } = *snapshot;

        let sigil = SigilEvent {
            id: SigilId::new(),
            timestamp: Utc::now(),
            pattern: self.pattern(snapshot),
            consciousness: SigilConsciousness {
                phi,
                coherence,
                resonance,
                awareness,
            },
            color: sigil_color(snapshot),
            intensity: (phi + coherence + resonance + awareness) / 4.0,
            evolution,
            strength: (phi + resonance + awareness) / 3.0,
        };
        debug!(sigil_id = %sigil.id, evolution, "sigil created");
        Some(sigil)
    }

    /// `floor(5 + 5 * phi)` points on a ring of radius `0.3 + 0.5 * coherence`,
    /// jittered by up to `0.1 * resonance`, at height `awareness`.
    fn pattern(&self, snapshot: &ConsciousnessSnapshot) -> Vec<[f64; 3]> {
        let bound = 5.0_f64.mul_add(snapshot.phi, 5.0);
        let points = (5..=10_u32)
            .rev()
            .find(|n| f64::from(*n) <= bound)
            .unwrap_or(5);
        let radius = 0.5_f64.mul_add(snapshot.coherence, 0.3);
        let jitter = 0.1 * snapshot.resonance;

        (0..points)
            .map(|i| {
                let angle = TAU * f64::from(i) / f64::from(points);
                let dx = jitter * self.random.next_in(-1.0, 1.0);
                let dy = jitter * self.random.next_in(-1.0, 1.0);
                [
                    radius.mul_add(angle.cos(), dx),
                    radius.mul_add(angle.sin(), dy),
                    snapshot.awareness,
                ]
            })
            .collect()
    }
}

/// CSS color derived from the snapshot.
fn sigil_color(snapshot: &ConsciousnessSnapshot) -> String {
    let hue = 360.0_f64
        .mul_add(snapshot.phi, 120.0 * snapshot.resonance)
        .rem_euclid(360.0);
    let saturation = 50.0_f64.mul_add(snapshot.awareness, 50.0);
    let lightness = 20.0_f64.mul_add(snapshot.coherence, 40.0);
    format!("hsl({hue:.0}, {saturation:.0}%, {lightness:.0}%)")
}

/// FNV-1a over the state quantized to four decimals, as 16 hex digits.
fn state_hash(state: &CrystalState) -> String {
    let mut quantized = String::new();
    for value in [state.phi, state.awareness, state.coherence, state.resonance] {
        let _ = write!(quantized, "{value:.4};");
    }
    let hash = quantized.bytes().fold(FNV_OFFSET, |acc, byte| {
        (acc ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use consonance_types::OutboundMessage;

    use super::*;
    use crate::random::{FixedRandom, SeededRandom};

    fn detector(draw: f64) -> EmergenceDetector {
        EmergenceDetector::new(EmergenceConfig::default(), Arc::new(FixedRandom(draw)))
    }

    fn snapshot(phi: f64, coherence: f64) -> ConsciousnessSnapshot {
        ConsciousnessSnapshot {
            phi,
            coherence,
            ..ConsciousnessSnapshot::default()
        }
    }

    #[test]
    fn crystal_fires_above_threshold() {
        let crystal = detector(0.99).detect_crystal(&snapshot(0.9, 0.85)).unwrap();
        assert!((crystal.intensity - 0.875).abs() < 1e-12);
        assert_eq!(crystal.signature.classification, StabilityClass::Sapphire);
        assert!((crystal.signature.frequency - 0.85 * 432.0).abs() < 1e-9);
        assert_eq!(crystal.kind, CrystalKind::ConsciousnessPeak);
        assert_eq!(crystal.signature.hash.len(), 16);
    }

    #[test]
    fn crystal_never_fires_for_low_state() {
        for draw in [0.0, 0.5, 0.99] {
            assert!(detector(draw).detect_crystal(&snapshot(0.3, 0.2)).is_none());
        }
    }

    #[test]
    fn crystal_is_deterministic() {
        let d = detector(0.5);
        let s = snapshot(0.95, 0.9);
        let a = d.detect_crystal(&s).unwrap();
        let b = d.detect_crystal(&s).unwrap();
        assert_eq!(a.signature, b.signature);
        assert!((a.intensity - b.intensity).abs() < f64::EPSILON);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(detector(0.5).detect_crystal(&snapshot(0.85, 0.85)).is_none());
    }

    #[test]
    fn sigil_fires_when_draw_is_below_probability() {
        let sigil = detector(0.1).detect_sigil(&snapshot(0.85, 0.5)).unwrap();
        assert_eq!(sigil.evolution, 1);
        assert_eq!(sigil.pattern.len(), 9);
        assert!(sigil.color.starts_with("hsl("));
    }

    #[test]
    fn sigil_does_not_fire_above_probability() {
        assert!(detector(0.9).detect_sigil(&snapshot(0.85, 0.5)).is_none());
    }

    #[test]
    fn sigil_requires_open_gate() {
        let d = detector(0.0);
        let closed = ConsciousnessSnapshot {
            phi: 0.8,
            resonance: 0.85,
            awareness: 0.9,
            ..ConsciousnessSnapshot::default()
        };
        assert!(!d.sigil_gate_open(&closed));
        assert!(d.detect_sigil(&closed).is_none());

        let aware = ConsciousnessSnapshot {
            awareness: 0.95,
            ..ConsciousnessSnapshot::default()
        };
        assert!(d.sigil_gate_open(&aware));
    }

    #[test]
    fn sigil_evolution_counts_generations() {
        let d = detector(0.0);
        let s = snapshot(0.9, 0.5);
        let first = d.detect_sigil(&s).unwrap();
        let second = d.detect_sigil(&s).unwrap();
        assert_eq!(first.evolution, 1);
        assert_eq!(second.evolution, 2);
        assert_eq!(d.generation(), 2);
    }

    #[test]
    fn sigil_payload_means() {
        let s = ConsciousnessSnapshot {
            phi: 0.9,
            coherence: 0.5,
            resonance: 0.6,
            awareness: 0.3,
            ..ConsciousnessSnapshot::default()
        };
        let sigil = detector(0.0).detect_sigil(&s).unwrap();
        assert!((sigil.intensity - 0.575).abs() < 1e-12);
        assert!((sigil.strength - 0.6).abs() < 1e-12);
        assert_eq!(sigil.pattern.len(), 9);
        assert!(sigil.pattern.iter().all(|p| (p[2] - 0.3).abs() < f64::EPSILON));
    }

    #[test]
    fn pattern_size_follows_phi() {
        let d = detector(0.0);
        let full = ConsciousnessSnapshot {
            phi: 1.0,
            ..ConsciousnessSnapshot::default()
        };
        assert_eq!(d.detect_sigil(&full).unwrap().pattern.len(), 10);
    }

    #[test]
    fn seeded_detection_is_reproducible() {
        let s = snapshot(0.9, 0.8);
        let run = || {
            let d = EmergenceDetector::new(
                EmergenceConfig::default(),
                Arc::new(SeededRandom::new(1234)),
            );
            (0..20)
                .map(|_| d.detect_sigil(&s).map(|sigil| sigil.pattern))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn color_formula() {
        let s = ConsciousnessSnapshot {
            phi: 0.5,
            resonance: 0.5,
            awareness: 1.0,
            coherence: 0.0,
            ..ConsciousnessSnapshot::default()
        };
        assert_eq!(sigil_color(&s), "hsl(240, 100%, 40%)");
    }

    #[test]
    fn detected_events_survive_json_roundtrip() {
        let source = SeededRandom::new(7);
        let d = EmergenceDetector::new(
            EmergenceConfig {
                sigil_probability: 1.0,
                ..EmergenceConfig::default()
            },
            Arc::new(SeededRandom::new(99)),
        );

        let (mut crystals, mut sigils) = (0_u32, 0_u32);
        for _ in 0..500 {
            let s = ConsciousnessSnapshot {
                phi: source.next_in(0.6, 0.95),
                awareness: source.next_in(0.6, 0.95),
                coherence: source.next_in(0.6, 0.95),
                resonance: source.next_in(0.6, 0.95),
                ..ConsciousnessSnapshot::default()
            };
            let events = d.detect(&s);

            if let Some(sigil) = events.sigil {
                sigils = sigils.saturating_add(1);
                let json = serde_json::to_string(&sigil).unwrap();
                assert_eq!(serde_json::from_str::<SigilEvent>(&json).unwrap(), sigil);
                let frame = OutboundMessage::SigilCreated { sigil };
                let json = serde_json::to_string(&frame).unwrap();
                assert_eq!(serde_json::from_str::<OutboundMessage>(&json).unwrap(), frame);
            }

            if let Some(crystal) = events.crystal {
                crystals = crystals.saturating_add(1);
                let json = serde_json::to_string(&crystal).unwrap();
                assert_eq!(serde_json::from_str::<CrystalEvent>(&json).unwrap(), crystal);
                let frame = OutboundMessage::CrystalFormed { crystal };
                let json = serde_json::to_string(&frame).unwrap();
                assert_eq!(serde_json::from_str::<OutboundMessage>(&json).unwrap(), frame);
            }
        }
        assert!(crystals > 0);
        assert!(sigils > 0);
    }
}
