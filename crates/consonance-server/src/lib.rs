//! `WebSocket` orchestration server for Consonance.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`, alias `/ws/consciousness`) carrying
//!   JSON envelopes in both directions
//! - **Health endpoint** (`/health`) reporting liveness and the number of
//!   tracked connections
//!
//! # Architecture
//!
//! Every connection has a reader loop and a writer task joined by a bounded
//! queue held in the [`ConnectionRegistry`]. Each `chat_message` runs the
//! [`ChatPipeline`] on its own task; results leave through the
//! [`BroadcastHub`], which fans serialized frames out to registry
//! snapshots without ever blocking on a slow client.
//!
//! [`ConnectionRegistry`]: registry::ConnectionRegistry
//! [`ChatPipeline`]: pipeline::ChatPipeline
//! [`BroadcastHub`]: hub::BroadcastHub

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod pipeline;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use hub::{Audience, BroadcastHub, BroadcastReport};
pub use registry::{ConnectionRegistry, ConnectionState};
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::{AppState, SessionSettings};
