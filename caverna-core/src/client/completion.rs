//! Chat-completion call.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use super::AnalysisClient;
use crate::error::{Error, Result};
use crate::prompt::{build_prompt, prompt_fingerprint};
use crate::types::{AnalysisRequest, AnalysisResult};

const PROVIDER: &str = "openai";

/// Report text used when the provider answers without usable content.
pub const PLACEHOLDER_REPORT: &str = "Erro ao gerar análise";

/// Request body for POST /v1/chat/completions
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl AnalysisClient {
    /// Generate a report for `request`.
    ///
    /// Fails with [`Error::MissingCredential`] before any network traffic if no
    /// credential is set, and with [`Error::Provider`] on a non-success status.
    /// A success response without `choices[0].message.content` yields
    /// [`PLACEHOLDER_REPORT`]. The returned result never carries audio.
    pub async fn request_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let credential = self.get_credential()?.ok_or(Error::MissingCredential)?;

        if request.selected_metrics.is_empty() {
            tracing::warn!("No metrics selected, prompt carries instructions only");
        }

        let prompt = build_prompt(request);
        tracing::info!(
            period = %request.period,
            metrics = request.selected_metrics.len(),
            auto = request.auto_mode,
            prompt_sha = %prompt_fingerprint(&prompt),
            model = %self.completion.model,
            "Requesting analysis"
        );

        let body = ChatCompletionRequest {
            model: &self.completion.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            max_tokens: self.completion.max_tokens,
            temperature: self.completion.temperature,
        };

        let auth = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|e| Error::Config(format!("invalid credential header: {}", e)))?;

        let response = self
            .http
            .post(self.completion_url())
            .timeout(Duration::from_secs(self.completion.timeout_secs.max(1)))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %detail, "Completion request failed");
            return Err(Error::provider(PROVIDER, status));
        }

        let text = response.text().await?;
        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| Error::MalformedResponse {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let report = match extract_report(&json) {
            Some(report) => report.to_string(),
            None => {
                tracing::warn!("Completion response had no content, using placeholder");
                PLACEHOLDER_REPORT.to_string()
            }
        };

        tracing::info!(chars = report.chars().count(), "Analysis generated");

        Ok(AnalysisResult {
            report,
            audio: None,
            period: request.period,
            generated_at: Utc::now(),
        })
    }
}

/// Pull `choices[0].message.content` out of a completion response.
///
/// Missing, non-string and empty content all count as absent.
fn extract_report(json: &serde_json::Value) -> Option<&str> {
    json.get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("message"))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}
