//! Bounded memory of earlier chat turns.

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_TURNS: usize = 20;
pub const DEFAULT_HISTORY_CHARS: usize = 32_000;

/// One user line and the agent's rendered reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub agent: String,
}

impl Turn {
    fn chars(&self) -> usize {
        self.user.chars().count() + self.agent.chars().count()
    }
}

/// Keeps the most recent turns within a turn count and a character budget.
///
/// The oldest turns are dropped first. A zero turn limit disables memory.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    max_turns: usize,
    max_chars: usize,
    chars: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_TURNS, DEFAULT_HISTORY_CHARS)
    }
}

impl ConversationHistory {
    pub fn new(max_turns: usize, max_chars: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
            max_chars,
            chars: 0,
        }
    }

    pub fn push(&mut self, user: impl Into<String>, agent: impl Into<String>) {
        let turn = Turn {
            user: user.into(),
            agent: agent.into(),
        };
        self.chars += turn.chars();
        self.turns.push_back(turn);
        self.trim();
    }

    fn trim(&mut self) {
        while self.turns.len() > self.max_turns || self.chars > self.max_chars {
            let Some(dropped) = self.turns.pop_front() else {
                break;
            };
            self.chars -= dropped.chars();
        }
    }

    /// Oldest first
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.chars = 0;
    }
}
