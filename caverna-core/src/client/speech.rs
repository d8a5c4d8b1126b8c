//! Speech-synthesis call.

use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use super::AnalysisClient;
use crate::audio::{AudioOutcome, AudioResource};
use crate::error::{Error, Result};

const PROVIDER: &str = "fish.audio";

/// Request body for POST /v1/tts
#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    voice: &'a str,
    speed: f64,
    pitch: f64,
    format: &'a str,
}

impl AnalysisClient {
    /// Narrate `text` through the speech provider.
    ///
    /// Never fails: any error is logged and reported as
    /// [`AudioOutcome::Unavailable`] so the caller can fall back to
    /// on-device narration.
    pub async fn request_audio(&self, text: &str) -> AudioOutcome {
        if !self.speech.enabled {
            tracing::debug!("Speech synthesis disabled, skipping");
            return AudioOutcome::Unavailable;
        }

        match self.synthesize(text).await {
            Ok(resource) => {
                tracing::info!(bytes = resource.len(), "Audio ready");
                AudioOutcome::Ready(resource)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Audio generation failed, using fallback narrator");
                AudioOutcome::Unavailable
            }
        }
    }

    /// Narrate `text` through the speech provider, surfacing failures.
    pub async fn synthesize(&self, text: &str) -> Result<AudioResource> {
        let key = self
            .speech_key
            .as_deref()
            .ok_or_else(|| Error::Config("speech.api_key is not configured".to_string()))?;

        let auth = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|e| Error::Config(format!("invalid speech api_key: {}", e)))?;

        let body = SpeechRequest {
            text,
            voice: &self.speech.voice,
            speed: self.speech.speed,
            pitch: self.speech.pitch,
            format: &self.speech.format,
        };

        let response = self
            .http
            .post(self.speech_url())
            .timeout(Duration::from_secs(self.speech.timeout_secs.max(1)))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::provider(PROVIDER, status));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::MalformedResponse {
                provider: PROVIDER.to_string(),
                message: "empty audio payload".to_string(),
            });
        }

        AudioResource::from_bytes(&bytes, &self.speech.format)
    }
}
