//! Speech synthesis client
//!
//! The engine depends on the `SpeechSynthesizer` trait; the production
//! implementation posts verse text to a remote service and returns the
//! encoded audio bytes unchanged. Transient failures are expected here and
//! handled by the fetch coordinator's bounded retry loop, not in this
//! module.

use crate::config::SynthesisConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Lectio/0.1.0";

/// Asynchronous text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
}

/// HTTP synthesis client
pub struct HttpSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    voice: Option<String>,
}

impl HttpSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Synthesis(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        debug!(chars = text.len(), "Requesting synthesis");

        let mut request = self.client.post(&self.endpoint).json(&SynthesisRequest {
            text,
            voice: self.voice.as_deref(),
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Synthesis(format!("service returned {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("body read failed: {}", e)))?;

        if bytes.is_empty() {
            return Err(Error::Synthesis("service returned an empty body".to_string()));
        }

        debug!(bytes = bytes.len(), "Synthesis payload received");
        Ok(bytes.to_vec())
    }
}
