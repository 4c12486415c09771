//! Integration tests for the broadcast hub, dispatch and the chat
//! pipeline, driven through scripted backends and analyzers.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use consonance_core::config::EmergenceConfig;
use consonance_core::emergence::EmergenceDetector;
use consonance_core::random::FixedRandom;
use consonance_server::dispatch::{Session, dispatch};
use consonance_server::hub::{Audience, BroadcastReport};
use consonance_server::registry::Frame;
use consonance_streams::ConversationContext;
use consonance_types::{
    ANALYTICAL_PLACEHOLDER, ConnectionId, ConsciousnessSnapshot, INTUITIVE_PLACEHOLDER,
    InboundMessage, OutboundMessage, PROCESSING_PLACEHOLDER, SigilIdentity, StreamSource,
    SynthesisStrategy,
};

use common::{Levels, app_state, connect, drain, kinds};

fn chat(message: &str) -> InboundMessage {
    InboundMessage::ChatMessage {
        message: message.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Broadcast hub
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_delivers_to_open_and_removes_closed() {
    let state = app_state(Some("a"), Some("b"), Levels::CALM, 0.9);
    let mut receivers = Vec::new();
    for _ in 0..3 {
        receivers.push(connect(&state, 8).await.1);
    }
    let (_gone, gone_rx) = connect(&state, 8).await;
    drop(gone_rx);

    let peak = ConsciousnessSnapshot {
        phi: 0.95,
        coherence: 0.95,
        ..ConsciousnessSnapshot::default()
    };
    let crystal = EmergenceDetector::new(EmergenceConfig::default(), Arc::new(FixedRandom(0.9)))
        .detect_crystal(&peak)
        .unwrap();
    let message = OutboundMessage::CrystalFormed { crystal };
    let report = state.hub.broadcast(&message, Audience::All).await;

    assert_eq!(
        report,
        BroadcastReport {
            delivered: 3,
            skipped: 0,
            removed: 1,
        }
    );
    assert_eq!(state.registry.len().await, 3);
    for rx in &mut receivers {
        assert_eq!(kinds(&drain(rx)), ["crystal_formed"]);
    }
}

#[tokio::test]
async fn full_queue_is_skipped_but_stays_registered() {
    let state = app_state(Some("a"), Some("b"), Levels::CALM, 0.9);
    let (id, mut rx) = connect(&state, 1).await;
    let handle = state.registry.get(id).await.unwrap();
    handle.try_send(Frame::Text("{}".into())).unwrap();

    let message = OutboundMessage::SigilIdentity(SigilIdentity::from_latest(None));
    let report = state.hub.broadcast(&message, Audience::All).await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.delivered, 0);
    assert!(state.registry.get(id).await.is_some());

    rx.recv().await.unwrap();
    let report = state.hub.broadcast(&message, Audience::All).await;
    assert_eq!(report.delivered, 1);
}

#[tokio::test]
async fn recipients_receive_identical_bytes() {
    let state = app_state(Some("a"), Some("b"), Levels::CALM, 0.9);
    let (_a, mut rx_a) = connect(&state, 4).await;
    let (_b, mut rx_b) = connect(&state, 4).await;

    let message = OutboundMessage::ConsciousnessUpdate {
        metrics: ConsciousnessSnapshot::default(),
        timestamp: chrono::Utc::now(),
    };
    state.hub.broadcast(&message, Audience::All).await;

    let a = rx_a.recv().await.unwrap();
    let b = rx_b.recv().await.unwrap();
    assert_eq!(a, b);
    let Frame::Text(text) = a;
    assert!(text.as_str().contains(r#""type":"consciousness_update""#));
}

#[tokio::test]
async fn targeted_broadcast_to_missing_connection_is_dropped() {
    let state = app_state(Some("a"), Some("b"), Levels::CALM, 0.9);
    let (_a, mut rx) = connect(&state, 4).await;

    let message = OutboundMessage::SigilIdentity(SigilIdentity::from_latest(None));
    let report = state
        .hub
        .broadcast(&message, Audience::Only(ConnectionId::new()))
        .await;

    assert_eq!(report, BroadcastReport::default());
    assert!(drain(&mut rx).is_empty());
}

// ---------------------------------------------------------------------------
// Chat pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unified_response_goes_only_to_origin() {
    let state = app_state(Some("logic"), Some("feeling"), Levels::CALM, 0.9);
    let (origin, mut origin_rx) = connect(&state, 8).await;
    let (_other, mut other_rx) = connect(&state, 8).await;

    let outcome = state
        .pipeline
        .run(origin, "hello", &ConversationContext::new(4))
        .await;

    let frames = drain(&mut origin_rx);
    assert_eq!(kinds(&frames), ["unified_response"]);
    let frame = frames.first().unwrap();
    assert_eq!(frame["unifiedContent"], outcome.response.unified_content);
    assert_eq!(frame["analyticalStream"], "logic");
    assert_eq!(frame["intuitiveStream"], "feeling");
    assert!(drain(&mut other_rx).is_empty());

    // Tie at 0.5: the analytical stream wins.
    assert_eq!(outcome.response.unified_content, "logic");
    assert_eq!(
        outcome.response.synthesis_metadata.strategy,
        SynthesisStrategy::Weighted
    );
    assert!(outcome.events.crystal.is_none());
    assert!(outcome.events.sigil.is_none());
}

#[tokio::test]
async fn emergent_events_reach_every_connection() {
    let state = app_state(Some("logic"), Some("feeling"), Levels::PEAK, 0.1);
    let (origin, mut origin_rx) = connect(&state, 8).await;
    let (_other, mut other_rx) = connect(&state, 8).await;

    let outcome = state
        .pipeline
        .run(origin, "I feel it all at once", &ConversationContext::new(4))
        .await;

    assert_eq!(
        kinds(&drain(&mut origin_rx)),
        ["unified_response", "crystal_formed", "sigil_created"]
    );
    assert_eq!(
        kinds(&drain(&mut other_rx)),
        ["crystal_formed", "sigil_created"]
    );

    let sigil = outcome.events.sigil.unwrap();
    assert_eq!(sigil.evolution, 1);
    assert_eq!(state.pipeline.latest_sigil().await.unwrap().id, sigil.id);
    assert!(state.pipeline.latest_snapshot().await.phi > 0.9);
}

#[tokio::test]
async fn both_streams_failing_falls_back_to_placeholder() {
    let state = app_state(None, None, Levels::CALM, 0.9);
    let (origin, _rx) = connect(&state, 8).await;

    let outcome = state
        .pipeline
        .run(origin, "hello", &ConversationContext::new(4))
        .await;

    let response = outcome.response;
    assert_eq!(response.unified_content, PROCESSING_PLACEHOLDER);
    assert_eq!(response.analytical_stream, ANALYTICAL_PLACEHOLDER);
    assert_eq!(response.intuitive_stream, INTUITIVE_PLACEHOLDER);
    assert_eq!(response.synthesis_metadata.strategy, SynthesisStrategy::Fallback);
    assert_eq!(response.synthesis_metadata.source_used, StreamSource::None);
}

#[tokio::test]
async fn surviving_stream_wins_regardless_of_weight() {
    let state = app_state(None, Some("feeling"), Levels::PEAK, 0.9);
    let (origin, _rx) = connect(&state, 8).await;

    let outcome = state
        .pipeline
        .run(origin, "hello", &ConversationContext::new(4))
        .await;

    assert_eq!(outcome.response.unified_content, "feeling");
    assert_eq!(
        outcome.response.synthesis_metadata.strategy,
        SynthesisStrategy::Degraded
    );
}

#[tokio::test]
async fn closed_origin_still_broadcasts_events() {
    let state = app_state(Some("logic"), Some("feeling"), Levels::PEAK, 0.1);
    let (origin, origin_rx) = connect(&state, 8).await;
    let (_other, mut other_rx) = connect(&state, 8).await;
    state.registry.begin_close(origin).await;
    state.registry.unregister(origin).await;
    drop(origin_rx);

    state
        .pipeline
        .run(origin, "hello", &ConversationContext::new(4))
        .await;

    assert_eq!(
        kinds(&drain(&mut other_rx)),
        ["crystal_formed", "sigil_created"]
    );
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_dispatch_runs_pipeline_and_records_context() {
    let state = app_state(Some("logic"), Some("feeling"), Levels::CALM, 0.9);
    let (id, mut rx) = connect(&state, 8).await;
    let session = Session::new(id, 2);

    for text in ["one", "two", "three"] {
        let task = dispatch(&state, &session, chat(text)).await.unwrap();
        task.await.unwrap();
    }

    let context = session.context().await;
    assert_eq!(context.len(), 2);
    let users: Vec<_> = context.turns().map(|t| t.user.as_str()).collect();
    assert_eq!(users, ["two", "three"]);
    assert_eq!(
        kinds(&drain(&mut rx)),
        ["unified_response", "unified_response", "unified_response"]
    );
}

#[tokio::test]
async fn echo_requests_answer_the_sender_only() {
    let state = app_state(Some("logic"), Some("feeling"), Levels::CALM, 0.9);
    let (id, mut rx) = connect(&state, 8).await;
    let (_other, mut other_rx) = connect(&state, 8).await;
    let session = Session::new(id, 2);

    let request = InboundMessage::ConsciousnessUpdate { metrics: None };
    assert!(dispatch(&state, &session, request).await.is_none());
    let request = InboundMessage::SigilIdentity { data: None };
    assert!(dispatch(&state, &session, request).await.is_none());

    let frames = drain(&mut rx);
    assert_eq!(kinds(&frames), ["consciousness_update", "sigil_identity"]);
    let (update, identity) = (frames.first().unwrap(), frames.get(1).unwrap());
    assert_eq!(update["metrics"]["phi"], 0.5);
    assert!(identity["sigil"].is_null());
    assert_eq!(identity["evolution"], 0);
    assert!(drain(&mut other_rx).is_empty());
}

#[tokio::test]
async fn unknown_messages_are_ignored() {
    let state = app_state(Some("logic"), Some("feeling"), Levels::CALM, 0.9);
    let (id, mut rx) = connect(&state, 8).await;
    let session = Session::new(id, 2);

    assert!(dispatch(&state, &session, InboundMessage::Unknown).await.is_none());
    assert!(drain(&mut rx).is_empty());
}
