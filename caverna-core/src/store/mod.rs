//! Credential storage
//!
//! The analysis client never touches persistence directly. It is handed a
//! [`CredentialStore`] at construction and the host decides where the
//! credential lives:
//! - [`KvStore`]: embedded SQLite key/value table, survives restarts (default)
//! - [`EnvCredentialStore`]: read-only, from an environment variable
//! - [`MemoryCredentialStore`]: process-local, for tests and one-shot runs

pub mod kv;
pub mod schema;

pub use kv::KvStore;

use std::sync::Mutex;

use crate::error::{Error, Result};

/// Fixed key the completion credential is stored under.
pub const CREDENTIAL_KEY: &str = "openai_key";

/// Environment variable read by [`EnvCredentialStore`] by default.
pub const CREDENTIAL_ENV_VAR: &str = "OPENAI_API_KEY";

/// Capability for reading and writing the completion credential.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored credential, if any.
    fn get(&self) -> Result<Option<String>>;

    /// Stores the credential, replacing any previous value.
    fn set(&self, value: &str) -> Result<()>;
}

impl CredentialStore for KvStore {
    fn get(&self) -> Result<Option<String>> {
        self.get_value(CREDENTIAL_KEY)
    }

    fn set(&self, value: &str) -> Result<()> {
        self.set_value(CREDENTIAL_KEY, value)
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.value.lock().unwrap().clone())
    }

    fn set(&self, value: &str) -> Result<()> {
        *self.value.lock().unwrap() = Some(value.to_string());
        Ok(())
    }
}

/// Read-only store backed by an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    var: String,
}

impl EnvCredentialStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new(CREDENTIAL_ENV_VAR)
    }
}

impl CredentialStore for EnvCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(std::env::var(&self.var).ok().filter(|v| !v.is_empty()))
    }

    fn set(&self, _value: &str) -> Result<()> {
        Err(Error::Config(format!(
            "credential comes from ${} and cannot be changed here",
            self.var
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get().unwrap(), None);
        store.set("sk-one").unwrap();
        store.set("sk-two").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("sk-two"));
    }

    #[test]
    fn test_env_store_is_read_only() {
        let store = EnvCredentialStore::new("CAVERNA_TEST_UNSET_CREDENTIAL");
        assert_eq!(store.get().unwrap(), None);
        assert!(matches!(store.set("sk-x"), Err(Error::Config(_))));
    }

    #[test]
    fn test_kv_store_as_credential_store() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.migrate().unwrap();
        let store: &dyn CredentialStore = &kv;
        store.set("sk-abc").unwrap();
        assert_eq!(kv.get_value(CREDENTIAL_KEY).unwrap().as_deref(), Some("sk-abc"));
        assert_eq!(store.get().unwrap().as_deref(), Some("sk-abc"));
    }
}
