//! Per-connection conversation context.

use std::collections::VecDeque;

use serde::Serialize;

/// One completed exchange: the user's message and the unified reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// What the user said.
    pub user: String,
    /// The unified content sent back.
    pub reply: String,
}

/// A bounded window of the most recent turns on one connection.
///
/// Lives only in memory for the connection's lifetime. When full, the
/// oldest turn is evicted.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationContext {
    /// An empty context retaining at most `capacity` turns.
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a completed turn.
    pub fn push(&mut self, user: impl Into<String>, reply: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(Turn {
            user: user.into(),
            reply: reply.into(),
        });
    }

    /// The retained turns, oldest first.
    pub fn turns(&self) -> impl ExactSizeIterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Number of retained turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if no turns are retained.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
