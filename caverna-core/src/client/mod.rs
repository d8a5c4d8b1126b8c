//! Analysis client for the completion and speech-synthesis providers.
//!
//! ## Flow
//!
//! One analysis cycle is strictly sequential:
//! 1. [`AnalysisClient::request_analysis`] builds the prompt and calls the
//!    completion provider with the user's credential
//! 2. Only after it succeeds, [`AnalysisClient::request_audio`] asks the
//!    speech provider to narrate the report
//!
//! Neither call is retried, and the client does not guard against a second
//! cycle starting while one is in flight.
//!
//! ## Credentials
//!
//! The completion credential is user-owned: it lives in an injected
//! [`CredentialStore`] and is cached in memory after the first read. The
//! speech credential is deployment-owned and fixed at construction.

mod completion;
mod speech;

pub use completion::PLACEHOLDER_REPORT;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{CompletionConfig, Config, SpeechConfig};
use crate::error::{Error, Result};
use crate::store::CredentialStore;
use crate::types::Credential;

/// HTTP client for the analysis pipeline
pub struct AnalysisClient {
    store: Arc<dyn CredentialStore>,
    credential: Mutex<Option<Credential>>,
    completion: CompletionConfig,
    speech: SpeechConfig,
    speech_key: Option<String>,
    http: reqwest::Client,
}

impl AnalysisClient {
    /// Create a client from configuration and a credential store
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;

        // Per-request timeouts are applied in the provider calls; this one
        // only bounds connection setup.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(
                config.completion.timeout_secs.max(1),
            ))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        let speech_key = config.speech.resolved_api_key();
        if config.speech.enabled && speech_key.is_none() {
            tracing::info!("No speech API key configured, narration will use the fallback narrator");
        }

        Ok(Self {
            store,
            credential: Mutex::new(None),
            completion: config.completion.clone(),
            speech: config.speech.clone(),
            speech_key,
            http,
        })
    }

    /// Store the completion credential in memory and in the credential store.
    ///
    /// The value is not validated.
    pub fn set_credential(&self, value: &str) -> Result<()> {
        *self.credential.lock().unwrap() = Some(Credential::new(value));
        self.store.set(value)?;
        tracing::info!("Completion credential updated");
        Ok(())
    }

    /// Return the completion credential, hydrating from the store on first use.
    ///
    /// Empty values count as absent.
    pub fn get_credential(&self) -> Result<Option<Credential>> {
        let mut cached = self.credential.lock().unwrap();
        if cached.is_none() {
            *cached = self
                .store
                .get()?
                .filter(|v| !v.is_empty())
                .map(Credential::new);
            if cached.is_some() {
                tracing::debug!("Hydrated completion credential from store");
            }
        }
        Ok(cached.clone().filter(|c| !c.expose().is_empty()))
    }

    /// Whether remote speech synthesis will be attempted.
    pub fn speech_available(&self) -> bool {
        self.speech.enabled && self.speech_key.is_some()
    }

    fn completion_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.completion.endpoint.trim_end_matches('/')
        )
    }

    fn speech_url(&self) -> String {
        format!("{}/v1/tts", self.speech.endpoint.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SPEECH_KEY_ENV_VAR;
    use crate::store::MemoryCredentialStore;

    fn client_with(store: Arc<dyn CredentialStore>) -> AnalysisClient {
        AnalysisClient::new(&Config::default(), store).unwrap()
    }

    #[test]
    fn test_get_credential_absent() {
        let client = client_with(Arc::new(MemoryCredentialStore::new()));
        assert!(client.get_credential().unwrap().is_none());
    }

    #[test]
    fn test_get_credential_hydrates_from_store() {
        let client = client_with(Arc::new(MemoryCredentialStore::with_value("sk-stored")));
        let credential = client.get_credential().unwrap().unwrap();
        assert_eq!(credential.expose(), "sk-stored");
    }

    #[test]
    fn test_set_credential_writes_through() {
        let store = Arc::new(MemoryCredentialStore::new());
        let client = client_with(store.clone());
        client.set_credential("sk-new").unwrap();

        assert_eq!(store.get().unwrap().as_deref(), Some("sk-new"));
        assert_eq!(client.get_credential().unwrap().unwrap().expose(), "sk-new");
    }

    #[test]
    fn test_empty_credential_counts_as_absent() {
        let client = client_with(Arc::new(MemoryCredentialStore::with_value("")));
        assert!(client.get_credential().unwrap().is_none());

        client.set_credential("").unwrap();
        assert!(client.get_credential().unwrap().is_none());
    }

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let mut config = Config::default();
        config.completion.endpoint = "http://localhost:9000/".to_string();
        config.speech.endpoint = "http://localhost:9001/".to_string();
        let client = AnalysisClient::new(&config, Arc::new(MemoryCredentialStore::new())).unwrap();

        assert_eq!(client.completion_url(), "http://localhost:9000/v1/chat/completions");
        assert_eq!(client.speech_url(), "http://localhost:9001/v1/tts");
    }

    #[test]
    fn test_speech_unavailable_without_key() {
        std::env::remove_var(SPEECH_KEY_ENV_VAR);

        let mut config = Config::default();
        config.speech.enabled = true;
        config.speech.api_key = None;
        let client = AnalysisClient::new(&config, Arc::new(MemoryCredentialStore::new())).unwrap();
        assert!(!client.speech_available());

        config.speech.api_key = Some(String::new());
        let client = AnalysisClient::new(&config, Arc::new(MemoryCredentialStore::new())).unwrap();
        assert!(!client.speech_available());
    }

    #[tokio::test]
    async fn test_synthesize_without_key_is_config_error() {
        std::env::remove_var(SPEECH_KEY_ENV_VAR);

        let mut config = Config::default();
        config.speech.api_key = Some(String::new());
        let client = AnalysisClient::new(&config, Arc::new(MemoryCredentialStore::new())).unwrap();
        assert!(matches!(
            client.synthesize("Olá").await,
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_speech_disabled_is_unavailable() {
        let mut config = Config::default();
        config.speech.enabled = false;
        config.speech.api_key = Some("fa_test".to_string());
        let client = AnalysisClient::new(&config, Arc::new(MemoryCredentialStore::new())).unwrap();
        assert!(!client.speech_available());
    }
}
