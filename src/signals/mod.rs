//! Auxiliary signal gatherers.
//!
//! Each gatherer is best-effort: it returns a [`Gathered`] value and never an
//! error. Failures become [`Gathered::Diagnostic`] so the turn can continue
//! without that context.

pub mod document;
pub mod search;
pub mod vision;

use std::fmt;

/// Kind of auxiliary context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Web search results.
    Search,
    /// Uploaded document excerpt.
    Document,
    /// Text recognized in a captured image.
    ImageText,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::Document => write!(f, "document"),
            Self::ImageText => write!(f, "image_text"),
        }
    }
}

/// Context text merged into one turn's instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliarySignal {
    /// Where the text came from.
    pub kind: SignalKind,
    /// The text itself.
    pub text: String,
    /// Whether `text` was cut to fit a budget.
    pub truncated: bool,
}

impl AuxiliarySignal {
    /// Untruncated signal.
    pub fn new(kind: SignalKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            truncated: false,
        }
    }

    /// Signal holding at most `max_chars` characters of `text`.
    pub fn bounded(kind: SignalKind, text: &str, max_chars: usize) -> Self {
        let (text, truncated) = truncate_chars(text, max_chars);
        Self {
            kind,
            text,
            truncated,
        }
    }
}

/// Outcome of one gatherer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gathered {
    /// Context to merge.
    Data(AuxiliarySignal),
    /// The provider answered but had nothing. Carries marker text that is
    /// still merged, so the model knows a lookup was made.
    NoResults(AuxiliarySignal),
    /// Nothing to contribute (gatherer inactive or source empty).
    Empty,
    /// The provider failed. Reported to the caller, never merged.
    Diagnostic(String),
}

impl Gathered {
    /// The signal to merge, if any.
    pub fn into_signal(self) -> Option<AuxiliarySignal> {
        match self {
            Self::Data(signal) | Self::NoResults(signal) => Some(signal),
            Self::Empty | Self::Diagnostic(_) => None,
        }
    }

    /// The captured failure, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Diagnostic(message) => Some(message),
            _ => None,
        }
    }
}

/// Keep at most `max_chars` Unicode scalar values of `text`.
///
/// Returns the kept prefix and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].to_owned(), true),
        None => (text.to_owned(), false),
    }
}
