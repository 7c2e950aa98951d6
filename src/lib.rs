//! Kai: a conversational front-end around a chat-completion backend.
//!
//! Each user turn flows through one pipeline:
//! Input → auxiliary signals → instruction → completion → speech
//!
//! # Architecture
//!
//! - **Input**: one active input per turn, chosen by priority (voice, image text, typed)
//! - **Signals**: best-effort web search, uploaded document excerpt and image text
//! - **Prompt**: persona template plus labelled signal blocks, rebuilt every turn
//! - **Completion**: OpenAI-compatible chat API, fast or deep-reasoning model
//! - **Speech**: spoken prefix of the reply, skipped on any failure
//!
//! [`Kai`] owns the shared collaborators; a [`Session`] owns one user's
//! conversation and toggles.

pub mod completion;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod input;
pub mod prompt;
pub mod session;
pub mod signals;
pub mod speech;

pub use config::{KaiConfig, Mode};
pub use error::{KaiError, Result};
pub use session::{Kai, Session, TurnOutcome, TurnRequest};
