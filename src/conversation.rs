//! Conversation state: the ordered log of turns replayed to the backend.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction text. Never stored by the pipeline, only sent.
    System,
    /// The person talking to Kai.
    User,
    /// Kai.
    Assistant,
}

impl Role {
    /// Wire name used by chat-completion APIs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Turn {
    /// System turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only turn log, seeded with an assistant greeting.
///
/// Never empty: the greeting is always the first turn, including after
/// [`clear`](Self::clear). Turns cannot be edited or removed individually.
#[derive(Debug, Clone)]
pub struct Conversation {
    greeting: String,
    turns: Vec<Turn>,
    started_at: DateTime<Local>,
}

impl Conversation {
    /// New conversation whose first turn is `greeting` from the assistant.
    pub fn new(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            turns: vec![Turn::assistant(greeting.clone())],
            greeting,
            started_at: Local::now(),
        }
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns in causal order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns, greeting included.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Drop everything and re-seed the greeting.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.turns.push(Turn::assistant(self.greeting.clone()));
        self.started_at = Local::now();
    }

    /// Plain-text transcript: a title line, then one `label: content`
    /// paragraph per user or assistant turn.
    pub fn to_transcript(&self, assistant_label: &str, user_label: &str) -> String {
        let mut out = format!(
            "{assistant_label} chat transcript ({})\n\n",
            self.started_at.format("%Y-%m-%d %H:%M")
        );
        for turn in &self.turns {
            let label = match turn.role {
                Role::Assistant => assistant_label,
                Role::User => user_label,
                Role::System => continue,
            };
            out.push_str(label);
            out.push_str(": ");
            out.push_str(&turn.content);
            out.push_str("\n\n");
        }
        out
    }
}
