//! Dual-stream generative backend orchestration.
//!
//! Every chat turn queries two generative backends concurrently: the
//! analytical stream and the intuitive stream. This crate renders their
//! prompts, calls them under independent deadlines, and turns every failure
//! into a placeholder outcome so the rest of the pipeline always has two
//! strings to work with.
//!
//! # Modules
//!
//! - [`backend`] -- [`GenerativeBackend`] trait, the seam for test doubles.
//! - [`context`] -- Bounded per-connection conversation window.
//! - [`error`] -- [`StreamError`] and its mapping onto wire failures.
//! - [`llm`] -- `OpenAI`-compatible and Anthropic HTTP backends.
//! - [`orchestrator`] -- [`DualStreamOrchestrator`].
//! - [`prompt`] -- Per-stream system prompts via `minijinja`.
//!
//! [`GenerativeBackend`]: backend::GenerativeBackend
//! [`StreamError`]: error::StreamError
//! [`DualStreamOrchestrator`]: orchestrator::DualStreamOrchestrator

pub mod backend;
pub mod context;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod prompt;

pub use backend::GenerativeBackend;
pub use context::{ConversationContext, Turn};
pub use error::StreamError;
pub use orchestrator::{DualStreamOrchestrator, DualStreamOutput, StreamSlot};
pub use prompt::{PromptEngine, RenderedPrompt};
