//! OS-keyring-backed secret store.
//!
//! Grounded on the teacher's `services/credential_store.rs::CredentialStore`
//! (same `keyring::Entry` usage, same `zeroize`-on-drop discipline),
//! narrowed from the teacher's fixed `CredentialType` taxonomy to the spec's
//! plain `get(name)` / `set(name, value)` contract — this core has no
//! notion of SSH passwords or database passwords, only opaque named
//! secrets (API keys, provider tokens) under an agent's control.

use keyring::Error as KeyringError;
use thiserror::Error;
use zeroize::Zeroize;

const SERVICE_NAME: &str = "com.agentcore.secrets";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("keyring error: {0}")]
    Keyring(#[from] KeyringError),

    #[error("secret not found: {0}")]
    NotFound(String),
}

/// A secret value that zeroizes its backing memory on drop.
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// OS-keyring-backed store for named secrets.
pub struct SecretStore;

impl SecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Store `value` under `name`, overwriting any existing entry.
    pub fn set(&self, name: &str, value: &str) -> Result<(), SecretError> {
        let entry = keyring::Entry::new(SERVICE_NAME, name)?;
        entry.set_password(value)?;
        Ok(())
    }

    /// Retrieve the secret stored under `name`.
    pub fn get(&self, name: &str) -> Result<Secret, SecretError> {
        let entry = keyring::Entry::new(SERVICE_NAME, name)?;
        match entry.get_password() {
            Ok(password) => Ok(Secret(password)),
            Err(KeyringError::NoEntry) => Err(SecretError::NotFound(name.to_string())),
            Err(e) => Err(SecretError::Keyring(e)),
        }
    }

    /// Remove the secret stored under `name`, if any.
    pub fn delete(&self, name: &str) -> Result<(), SecretError> {
        let entry = keyring::Entry::new(SERVICE_NAME, name)?;
        match entry.delete_password() {
            Ok(_) => Ok(()),
            Err(KeyringError::NoEntry) => Err(SecretError::NotFound(name.to_string())),
            Err(e) => Err(SecretError::Keyring(e)),
        }
    }

    /// Returns `true` if a secret is stored under `name`.
    pub fn exists(&self, name: &str) -> bool {
        keyring::Entry::new(SERVICE_NAME, name)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}

impl Default for SecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests exercise a real OS keyring backend and are ignored by
    // default in headless CI environments without one configured; run with
    // `cargo test -- --ignored` on a machine with a keyring service.

    #[test]
    #[ignore]
    fn set_then_get_round_trips() {
        let store = SecretStore::new();
        store.set("agentcore-test-key", "sk-test-123").unwrap();
        let secret = store.get("agentcore-test-key").unwrap();
        assert_eq!(secret.expose(), "sk-test-123");
        store.delete("agentcore-test-key").ok();
    }

    #[test]
    #[ignore]
    fn delete_then_get_returns_not_found() {
        let store = SecretStore::new();
        store.set("agentcore-test-key-2", "value").unwrap();
        store.delete("agentcore-test-key-2").unwrap();
        let result = store.get("agentcore-test-key-2");
        assert!(matches!(result, Err(SecretError::NotFound(_))));
    }

    #[test]
    fn secret_debug_never_prints_value() {
        let secret = Secret("super-secret".to_string());
        assert_eq!(format!("{secret:?}"), "Secret(***)");
    }
}
