//! Error types for Kai.
//!
//! [`KaiError`] is what crosses the turn boundary to the presentation layer.
//! Each variant carries a stable code (SCREAMING_SNAKE_CASE) included in the
//! Display output and available via [`KaiError::code()`]. The underlying
//! diagnostic is always kept verbatim so it can be shown to the user.
//!
//! [`AuxiliaryError`] covers the best-effort collaborators (search, document,
//! vision, speech). Those errors never reach the caller of
//! [`submit_turn`](crate::session::Kai::submit_turn); they are downgraded to
//! diagnostics by the gatherers.

/// Stable error codes for programmatic handling.
pub mod error_codes {
    /// No credential resolved for the session.
    pub const AUTH_MISSING: &str = "AUTH_MISSING";

    /// The completion backend call failed.
    pub const BACKEND_FAILED: &str = "BACKEND_FAILED";

    /// Invalid or unreadable configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Filesystem error.
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Errors surfaced to the presentation layer.
#[derive(Debug, thiserror::Error)]
pub enum KaiError {
    /// No credential is resolved; dispatch was not attempted.
    #[error("[{}] {}", error_codes::AUTH_MISSING, .0)]
    Auth(String),

    /// The completion backend failed (transport, HTTP status, quota, parse).
    #[error("[{}] {}", error_codes::BACKEND_FAILED, .0)]
    Backend(String),

    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// I/O error.
    #[error("[{}] {}", error_codes::IO_ERROR, .0)]
    Io(#[from] std::io::Error),
}

impl KaiError {
    /// Stable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(_) => error_codes::AUTH_MISSING,
            Self::Backend(_) => error_codes::BACKEND_FAILED,
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Io(_) => error_codes::IO_ERROR,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, KaiError>;

/// Failure of a best-effort collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AuxiliaryError {
    /// Web search failed.
    #[error("web search failed: {0}")]
    Search(String),

    /// Document text extraction failed.
    #[error("document extraction failed: {0}")]
    Document(String),

    /// Image decoding or text recognition failed.
    #[error("text recognition failed: {0}")]
    Vision(String),

    /// Speech synthesis failed.
    #[error("speech synthesis failed: {0}")]
    Speech(String),
}

/// Render `err` and every error in its `source()` chain, joined by `: `.
///
/// Causes whose text is already part of the message are skipped.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        cause = inner.source();
    }
    message
}
