//! Inbound frame decoding and routing.
//!
//! Malformed frames are logged at `warn` and dropped without closing the
//! connection. Unknown message types are dropped with a `debug` log. Only
//! `chat_message` starts the pipeline; the other recognized types are
//! informational echoes answered to the sender alone.

use std::sync::Arc;

use chrono::Utc;
use consonance_streams::ConversationContext;
use consonance_types::{ConnectionId, InboundMessage, OutboundMessage, SigilIdentity};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::DispatchError;
use crate::hub::Audience;
use crate::state::AppState;

/// Decode a text frame.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidPayload`] for invalid JSON, a missing
/// `type`, or a missing or ill-typed required field.
pub fn decode_text(text: &str) -> Result<InboundMessage, DispatchError> {
    Ok(InboundMessage::parse(text)?)
}

/// Decode a binary frame as UTF-8 JSON.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidEncoding`] for invalid UTF-8, otherwise
/// the same errors as [`decode_text`].
pub fn decode_binary(bytes: &[u8]) -> Result<InboundMessage, DispatchError> {
    decode_text(std::str::from_utf8(bytes)?)
}

/// Per-connection state the dispatcher needs.
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    context: Arc<Mutex<ConversationContext>>,
}

impl Session {
    /// A session for connection `id` keeping `context_turns` turns.
    pub fn new(id: ConnectionId, context_turns: usize) -> Self {
        Self {
            id,
            context: Arc::new(Mutex::new(ConversationContext::new(context_turns))),
        }
    }

    /// The connection this session belongs to.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// A copy of the conversation so far.
    pub async fn context(&self) -> ConversationContext {
        self.context.lock().await.clone()
    }
}

/// Route one decoded message.
///
/// A chat message runs on its own task so the reader keeps draining the
/// socket; its handle is returned. Echoes are queued before returning.
pub async fn dispatch(
    state: &Arc<AppState>,
    session: &Session,
    message: InboundMessage,
) -> Option<JoinHandle<()>> {
    match message {
        InboundMessage::ChatMessage { message } => {
            debug!(connection_id = %session.id, chars = message.len(), "chat message received");
            let state = Arc::clone(state);
            let session = session.clone();
            Some(tokio::spawn(async move {
                let context = session.context().await;
                let outcome = state.pipeline.run(session.id, &message, &context).await;
                session
                    .context
                    .lock()
                    .await
                    .push(message, outcome.response.unified_content);
            }))
        }
        InboundMessage::ConsciousnessUpdate { .. } => {
            let update = OutboundMessage::ConsciousnessUpdate {
                metrics: state.pipeline.latest_snapshot().await,
                timestamp: Utc::now(),
            };
            state.hub.broadcast(&update, Audience::Only(session.id)).await;
            None
        }
        InboundMessage::SigilIdentity { .. } => {
            let identity = SigilIdentity::from_latest(state.pipeline.latest_sigil().await);
            state
                .hub
                .broadcast(&OutboundMessage::SigilIdentity(identity), Audience::Only(session.id))
                .await;
            None
        }
        InboundMessage::Unknown => {
            debug!(connection_id = %session.id, "dropping message of unknown type");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_chat_message() {
        let msg = decode_text(r#"{"type":"chat_message","message":"hello"}"#);
        assert!(matches!(
            msg,
            Ok(InboundMessage::ChatMessage { ref message }) if message == "hello"
        ));
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let msg = decode_text(r#"{"type":"ping_me","payload":1}"#);
        assert!(matches!(msg, Ok(InboundMessage::Unknown)));
    }

    #[test]
    fn echo_types_ignore_their_fields() {
        assert!(matches!(
            decode_text(r#"{"type":"consciousness_update","metrics":{"phi":2}}"#),
            Ok(InboundMessage::ConsciousnessUpdate { .. })
        ));
        assert!(matches!(
            decode_text(r#"{"type":"sigil_identity"}"#),
            Ok(InboundMessage::SigilIdentity { .. })
        ));
    }

    #[test]
    fn malformed_frames_are_payload_errors() {
        for frame in [
            "not json",
            r#"{"message":"no type"}"#,
            r#"{"type":"chat_message"}"#,
            r#"{"type":"chat_message","message":42}"#,
        ] {
            assert!(
                matches!(decode_text(frame), Err(DispatchError::InvalidPayload(_))),
                "{frame}"
            );
        }
    }

    #[test]
    fn binary_frames_must_be_utf8() {
        assert!(matches!(
            decode_binary(&[0xff, 0xfe, 0x00]),
            Err(DispatchError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode_binary(br#"{"type":"chat_message","message":"hi"}"#),
            Ok(InboundMessage::ChatMessage { .. })
        ));
    }

    #[tokio::test]
    async fn session_context_starts_empty() {
        let session = Session::new(ConnectionId::new(), 3);
        assert!(session.context().await.is_empty());
    }
}
