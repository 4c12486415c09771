//! Metrics aggregation across analyzer subsystems.
//!
//! The [`MetricsAggregator`] polls every registered analyzer concurrently,
//! each under the same bounded wait, and folds their contributions into one
//! [`ConsciousnessSnapshot`] in registration order. The first registered
//! analyzer has the highest precedence. Slow or failed analyzers are logged
//! and leave their fields at the documented defaults.

use std::sync::Arc;
use std::time::Duration;

use consonance_types::ConsciousnessSnapshot;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::analyzer::{AnalysisInput, Analyzer, AnalyzerError, MetricContribution};

/// Combines analyzer contributions into one snapshot per turn.
#[derive(Clone)]
pub struct MetricsAggregator {
    analyzers: Vec<Arc<dyn Analyzer>>,
    timeout: Duration,
}

impl std::fmt::Debug for MetricsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAggregator")
            .field(
                "analyzers",
                &self.analyzers.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MetricsAggregator {
    /// Create an aggregator over `analyzers`, highest precedence first.
    pub const fn new(analyzers: Vec<Arc<dyn Analyzer>>, timeout: Duration) -> Self {
        Self { analyzers, timeout }
    }

    /// Number of registered analyzers.
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    /// Returns `true` if no analyzers are registered.
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Compute the snapshot for one turn.
    ///
    /// Never fails: every analyzer error degrades to defaults. Returns after
    /// at most the configured bounded wait.
    pub async fn aggregate(&self, input: &AnalysisInput) -> ConsciousnessSnapshot {
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);

        let calls = self.analyzers.iter().map(|analyzer| async move {
            let name = analyzer.name();
            match tokio::time::timeout(self.timeout, analyzer.analyze(input)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(AnalyzerError::Timeout { name, timeout_ms }),
            }
        });

        let results = join_all(calls).await;

        let merged = self.analyzers.iter().zip(results).fold(
            MetricContribution::default(),
            |acc, (analyzer, result)| match result {
                Ok(contribution) => {
                    debug!(analyzer = analyzer.name(), "analyzer contributed");
                    acc.overlay(contribution)
                }
                Err(e) => {
                    warn!(analyzer = analyzer.name(), error = %e, "analyzer failed, using defaults");
                    acc
                }
            },
        );

        merged.into_snapshot()
    }
}
