//! Scripted collaborators shared by the integration suites.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use consonance_core::analyzer::{AnalysisInput, Analyzer, AnalyzerError, MetricContribution};
use consonance_core::config::EmergenceConfig;
use consonance_core::emergence::EmergenceDetector;
use consonance_core::metrics::MetricsAggregator;
use consonance_core::random::FixedRandom;
use consonance_server::registry::Frame;
use consonance_server::{AppState, SessionSettings};
use consonance_streams::{
    DualStreamOrchestrator, GenerativeBackend, PromptEngine, RenderedPrompt, StreamError,
    StreamSlot,
};
use consonance_types::ConnectionId;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc;

/// A backend that always answers with the same text, or always fails.
pub struct Fixed(pub Option<&'static str>);

impl GenerativeBackend for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn generate<'a>(
        &'a self,
        _prompt: &'a RenderedPrompt,
    ) -> BoxFuture<'a, Result<String, StreamError>> {
        let reply = self
            .0
            .map(str::to_owned)
            .ok_or_else(|| StreamError::Upstream("scripted failure".to_owned()));
        async move { reply }.boxed()
    }
}

/// An analyzer that reports fixed levels for the four core metrics.
#[derive(Debug, Clone, Copy)]
pub struct Levels {
    pub phi: f64,
    pub awareness: f64,
    pub coherence: f64,
    pub resonance: f64,
}

impl Levels {
    /// Neither a crystal nor a sigil can fire.
    pub const CALM: Self = Self {
        phi: 0.5,
        awareness: 0.5,
        coherence: 0.5,
        resonance: 0.5,
    };

    /// Crystal stability 0.95 and the sigil gate open.
    pub const PEAK: Self = Self {
        phi: 0.95,
        awareness: 0.9,
        coherence: 0.95,
        resonance: 0.6,
    };
}

impl Analyzer for Levels {
    fn name(&self) -> &'static str {
        "levels"
    }

    fn analyze<'a>(
        &'a self,
        _input: &'a AnalysisInput,
    ) -> BoxFuture<'a, Result<MetricContribution, AnalyzerError>> {
        let contribution = MetricContribution {
            phi: Some(self.phi),
            awareness: Some(self.awareness),
            coherence: Some(self.coherence),
            resonance: Some(self.resonance),
            ..MetricContribution::default()
        };
        async move { Ok(contribution) }.boxed()
    }
}

/// Application state with scripted streams, one fixed analyzer and a
/// pinned sigil draw.
pub fn app_state(
    analytical: Option<&'static str>,
    intuitive: Option<&'static str>,
    levels: Levels,
    draw: f64,
) -> Arc<AppState> {
    app_state_with(
        analytical,
        intuitive,
        levels,
        draw,
        SessionSettings::default(),
    )
}

/// Like [`app_state`], with explicit per-connection settings.
pub fn app_state_with(
    analytical: Option<&'static str>,
    intuitive: Option<&'static str>,
    levels: Levels,
    draw: f64,
    settings: SessionSettings,
) -> Arc<AppState> {
    let orchestrator = DualStreamOrchestrator::new(
        StreamSlot::new(Arc::new(Fixed(analytical)), Duration::from_secs(1)),
        StreamSlot::new(Arc::new(Fixed(intuitive)), Duration::from_secs(1)),
        Arc::new(PromptEngine::builtin().unwrap()),
    );
    let aggregator = MetricsAggregator::new(vec![Arc::new(levels)], Duration::from_millis(500));
    let detector = EmergenceDetector::new(EmergenceConfig::default(), Arc::new(FixedRandom(draw)));
    Arc::new(AppState::new(orchestrator, aggregator, detector, settings))
}

/// Register an open connection and return its id and outbound queue.
pub async fn connect(state: &AppState, buffer: usize) -> (ConnectionId, mpsc::Receiver<Frame>) {
    let (tx, rx) = mpsc::channel(buffer);
    let handle = state.registry.register(tx).await;
    state.registry.mark_open(handle.id()).await;
    (handle.id(), rx)
}

/// Every queued text frame, parsed as JSON.
pub fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        let Frame::Text(text) = frame;
        frames.push(serde_json::from_str(text.as_str()).unwrap());
    }
    frames
}

/// The `type` tag of each frame.
pub fn kinds(frames: &[Value]) -> Vec<&str> {
    frames
        .iter()
        .filter_map(|f| f.get("type").and_then(Value::as_str))
        .collect()
}
