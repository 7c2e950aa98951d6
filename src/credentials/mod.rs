//! API key resolution.
//!
//! A [`Credential`] is resolved once per session through a chain of
//! [`CredentialSource`]s:
//!
//! 1. environment variable (`DEEPSEEK_API_KEY` by default)
//! 2. platform keyring entry (via the `keyring` crate)
//! 3. hidden interactive prompt, only when stdin is a terminal
//!
//! The first non-blank value wins. Sources never fail: storage errors are
//! logged and treated as "no credential here".
//!
//! ```no_run
//! use kai::config::CredentialsConfig;
//! use kai::credentials::{ChainSource, CredentialSource};
//!
//! let chain = ChainSource::from_config(&CredentialsConfig::default());
//! if let Some(credential) = chain.resolve() {
//!     println!("resolved {credential:?}");
//! }
//! ```

mod secure;
mod sources;

pub use sources::{ChainSource, EnvSource, KeyringSource, PromptSource, StaticSource};

use std::fmt;

/// An API key.
///
/// Never logged: `Debug` is redacted, and the backing buffer is zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret. Surrounding whitespace is trimmed; blank input yields `None`.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let mut raw = secret.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            secure::zeroize_string(&mut raw);
            return None;
        }
        if trimmed.len() != raw.len() {
            let owned = trimmed.to_owned();
            secure::zeroize_string(&mut raw);
            return Some(Self(owned));
        }
        Some(Self(raw))
    }

    /// The secret value, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        secure::zeroize_string(&mut self.0);
    }
}

/// Errors from credential storage.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Platform keyring access failed.
    #[error("keyring access error: {0}")]
    KeyringAccess(String),

    /// No entry stored for the account.
    #[error("credential not found")]
    NotFound,
}

/// A place a credential can come from.
pub trait CredentialSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Look up a credential. `None` when this source has nothing usable.
    fn resolve(&self) -> Option<Credential>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn blank_secret_is_rejected() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   \n").is_none());
    }

    #[test]
    fn secret_is_trimmed() {
        let c = Credential::new("  sk-abc \n").unwrap();
        assert_eq!(c.expose(), "sk-abc");
    }

    #[test]
    fn debug_is_redacted() {
        let c = Credential::new("sk-very-secret").unwrap();
        let shown = format!("{c:?}");
        assert_eq!(shown, "Credential(***)");
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn credential_error_display() {
        assert_eq!(CredentialError::NotFound.to_string(), "credential not found");
        assert!(
            CredentialError::KeyringAccess("locked".into())
                .to_string()
                .contains("locked")
        );
    }
}
