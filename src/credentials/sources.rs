//! Concrete credential sources.

use super::{Credential, CredentialError, CredentialSource};
use crate::config::CredentialsConfig;
use std::io::IsTerminal;

/// Reads the key from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSource {
    var: String,
}

impl EnvSource {
    /// Source reading `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvSource {
    fn name(&self) -> &str {
        "env"
    }

    fn resolve(&self) -> Option<Credential> {
        std::env::var(&self.var).ok().and_then(Credential::new)
    }
}

/// Reads the key from the platform keyring.
#[derive(Debug, Clone)]
pub struct KeyringSource {
    service: String,
    account: String,
}

impl KeyringSource {
    /// Source for the given keyring service and account.
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, &self.account).map_err(|e| {
            CredentialError::KeyringAccess(format!("failed to create keyring entry: {e}"))
        })
    }

    /// Read the stored key.
    ///
    /// # Errors
    ///
    /// [`CredentialError::NotFound`] when no entry exists, otherwise
    /// [`CredentialError::KeyringAccess`].
    pub fn load(&self) -> Result<Credential, CredentialError> {
        match self.entry()?.get_password() {
            Ok(password) => Credential::new(password).ok_or(CredentialError::NotFound),
            Err(keyring::Error::NoEntry) => Err(CredentialError::NotFound),
            Err(e) => Err(CredentialError::KeyringAccess(format!(
                "failed to read credential: {e}"
            ))),
        }
    }

    /// Store `credential`, replacing any existing entry.
    ///
    /// The key is read back through a fresh entry before returning, so `Ok`
    /// means a later process can resolve it.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::KeyringAccess`] if the platform store fails
    /// or does not keep the key.
    pub fn store(&self, credential: &Credential) -> Result<(), CredentialError> {
        self.entry()?
            .set_password(credential.expose())
            .map_err(|e| CredentialError::KeyringAccess(format!("failed to store credential: {e}")))?;
        match self.load() {
            Ok(stored) if stored.expose() == credential.expose() => Ok(()),
            Ok(_) | Err(CredentialError::NotFound) => Err(CredentialError::KeyringAccess(
                "keyring accepted the key but did not keep it".to_owned(),
            )),
            Err(e) => Err(e),
        }
    }

    /// Remove the stored entry. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::KeyringAccess`] if the platform store fails.
    pub fn delete(&self) -> Result<(), CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::KeyringAccess(format!(
                "failed to delete credential: {e}"
            ))),
        }
    }
}

impl CredentialSource for KeyringSource {
    fn name(&self) -> &str {
        "keyring"
    }

    fn resolve(&self) -> Option<Credential> {
        match self.load() {
            Ok(credential) => Some(credential),
            Err(CredentialError::NotFound) => None,
            Err(e) => {
                tracing::warn!(error = %e, "keyring unavailable, skipping");
                None
            }
        }
    }
}

/// Asks for the key on the terminal without echoing it.
///
/// Resolves to `None` when stdin is not a terminal.
#[derive(Debug, Clone)]
pub struct PromptSource {
    label: String,
}

impl PromptSource {
    /// Prompt shown as `"{label}: "`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl CredentialSource for PromptSource {
    fn name(&self) -> &str {
        "prompt"
    }

    fn resolve(&self) -> Option<Credential> {
        if !std::io::stdin().is_terminal() {
            return None;
        }
        match rpassword::prompt_password(format!("{}: ", self.label)) {
            Ok(secret) => Credential::new(secret),
            Err(e) => {
                tracing::warn!(error = %e, "could not read key from terminal");
                None
            }
        }
    }
}

/// Fixed credential, or none. Useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource(Option<Credential>);

impl StaticSource {
    /// Source that always yields `credential`.
    pub fn new(credential: Option<Credential>) -> Self {
        Self(credential)
    }
}

impl CredentialSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn resolve(&self) -> Option<Credential> {
        self.0.clone()
    }
}

/// Tries each source in order; the first hit wins.
#[derive(Default)]
pub struct ChainSource {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl ChainSource {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source at the lowest priority.
    #[must_use]
    pub fn with(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Environment variable, then keyring, then terminal prompt.
    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self::new()
            .with(EnvSource::new(&config.env_var))
            .with(KeyringSource::new(
                &config.keyring_service,
                &config.keyring_account,
            ))
            .with(PromptSource::new("DeepSeek API key"))
    }

    /// Like [`resolve`](CredentialSource::resolve), but also reports which
    /// source answered.
    pub fn resolve_with_origin(&self) -> Option<(Credential, &str)> {
        self.sources.iter().find_map(|source| {
            let credential = source.resolve()?;
            tracing::debug!(source = source.name(), "credential resolved");
            Some((credential, source.name()))
        })
    }
}

impl CredentialSource for ChainSource {
    fn name(&self) -> &str {
        "chain"
    }

    fn resolve(&self) -> Option<Credential> {
        self.resolve_with_origin().map(|(credential, _)| credential)
    }
}
