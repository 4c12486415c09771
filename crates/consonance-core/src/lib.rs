//! Metrics aggregation, synthesis, and emergent event detection.
//!
//! This crate owns the deterministic heart of a chat turn: everything that
//! happens between "both streams settled" and "events broadcast".
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `consonance-config.yaml` into
//!   strongly-typed structs.
//! - [`random`] -- [`RandomSource`] trait with thread, seeded and fixed
//!   implementations.
//! - [`analyzer`] -- [`Analyzer`] trait and partial metric contributions.
//! - [`builtin`] -- The five builtin analyzer subsystems.
//! - [`metrics`] -- [`MetricsAggregator`], precedence-ordered snapshot
//!   aggregation with a bounded wait.
//! - [`synthesis`] -- [`SynthesisEngine`], deterministic stream selection.
//! - [`emergence`] -- [`EmergenceDetector`], crystal and sigil triggers.
//!
//! [`RandomSource`]: random::RandomSource
//! [`Analyzer`]: analyzer::Analyzer
//! [`MetricsAggregator`]: metrics::MetricsAggregator
//! [`SynthesisEngine`]: synthesis::SynthesisEngine
//! [`EmergenceDetector`]: emergence::EmergenceDetector

pub mod analyzer;
pub mod builtin;
pub mod config;
pub mod emergence;
pub mod metrics;
pub mod random;
pub mod synthesis;

use std::sync::Arc;

use random::{RandomSource, SeededRandom, ThreadRandom};

/// Build the random source selected by `emergence.seed`.
pub fn random_source(seed: Option<u64>) -> Arc<dyn RandomSource> {
    match seed {
        Some(seed) => Arc::new(SeededRandom::new(seed)),
        None => Arc::new(ThreadRandom),
    }
}
