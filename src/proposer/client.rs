//! HTTP client for the Gemini-backed schedule proposer.
//!
//! One round trip per group: POST the prompt to the generateContent endpoint,
//! pull the text out of the first candidate, and parse it strictly. The
//! request timeout is the only unbounded-latency bound in the system.

use super::error::ProposerError;
use super::{parse_proposal_payload, ProposedSchedule, ScheduleProposer};
use crate::config::ProposerSettings;
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{error, info};
use url::Url;

pub struct GeminiProposer {
    client: Client,
    settings: ProposerSettings,
}

impl GeminiProposer {
    /// Builds a proposer client with the configured timeouts baked in.
    pub fn from_settings(settings: ProposerSettings) -> Result<Self, ProposerError> {
        // Validate early so a bad config fails at startup, not mid-request.
        Url::parse(&settings.base_url)?;

        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ProposerError::Network {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, settings })
    }

    fn endpoint(&self, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model,
            api_key
        )
    }

    fn map_request_error(&self, err: reqwest::Error) -> ProposerError {
        if err.is_timeout() {
            ProposerError::Timeout {
                timeout_secs: self.settings.request_timeout_secs,
            }
        } else {
            ProposerError::Network {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ScheduleProposer for GeminiProposer {
    async fn propose(&self, prompt: &str) -> Result<Vec<ProposedSchedule>, ProposerError> {
        let api_key = self
            .settings
            .resolved_api_key()
            .ok_or(ProposerError::MissingApiKey)?;

        let correlation_id = generate_correlation_id();
        let start = Instant::now();

        info!(
            correlation_id = %correlation_id,
            model = %self.settings.model,
            prompt_len = prompt.len(),
            "Requesting schedule proposal"
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let response = self
            .client
            .post(self.endpoint(&api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                correlation_id = %correlation_id,
                status = status.as_u16(),
                "Proposer API returned an error"
            );
            return Err(ProposerError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let text = extract_candidate_text(&payload).ok_or_else(|| {
            ProposerError::MalformedPayload {
                message: "response carried no candidate text".to_string(),
            }
        })?;

        let proposals = parse_proposal_payload(text)?;

        info!(
            correlation_id = %correlation_id,
            proposals = proposals.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Schedule proposal received"
        );

        Ok(proposals)
    }
}

/// Pulls the generated text out of a generateContent response:
/// `candidates[0].content.parts[0].text`.
fn extract_candidate_text(payload: &Value) -> Option<&str> {
    payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
