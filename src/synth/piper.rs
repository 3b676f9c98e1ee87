use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::{Synthesizer, VoiceInfo};
use crate::audio::AudioBuffer;
use crate::config::SynthConfig;
use crate::error::{Result, RedubError};

#[derive(Debug, Clone, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    length_scale: Option<f32>,
}

/// Client for Piper-style HTTP speech servers: `GET /voices` lists voice
/// configs keyed by id, `POST /` returns a WAV body.
pub struct PiperSynthesizer {
    client: Client,
    config: SynthConfig,
}

impl PiperSynthesizer {
    pub fn new(config: SynthConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }
}

/// Convert the server's voice map into voice descriptions.
fn parse_voices(listing: BTreeMap<String, serde_json::Value>) -> Vec<VoiceInfo> {
    listing
        .into_iter()
        .map(|(id, voice_config)| {
            let language = voice_config
                .pointer("/language/code")
                .or_else(|| voice_config.get("language"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            VoiceInfo { id, language }
        })
        .collect()
}

#[async_trait]
impl Synthesizer for PiperSynthesizer {
    async fn installed_voices(&self) -> Result<Vec<VoiceInfo>> {
        let url = self.url("voices");
        debug!("Fetching installed voices from: {}", url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| RedubError::Configuration(format!("Speech engine unreachable at {}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RedubError::Configuration(format!(
                "Speech engine voice listing failed {}: {}",
                status,
                body.trim()
            )));
        }

        let listing: BTreeMap<String, serde_json::Value> = response.json().await
            .map_err(|e| RedubError::Configuration(format!("Failed to parse voice listing: {}", e)))?;
        Ok(parse_voices(listing))
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioBuffer> {
        if text.trim().is_empty() {
            return Err(RedubError::Synthesis("Cannot synthesize empty text".to_string()));
        }

        let request = SynthesisRequest {
            text,
            voice,
            length_scale: self.config.length_scale,
        };

        let url = self.url("");
        debug!("Sending synthesis request ({} chars, voice {}) to: {}", text.len(), voice, url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RedubError::Synthesis(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RedubError::Synthesis(format!(
                "Speech engine error {}: {}",
                status,
                body.trim()
            )));
        }

        let bytes = response.bytes().await
            .map_err(|e| RedubError::Synthesis(format!("Failed to read audio body: {}", e)))?;
        let audio = AudioBuffer::from_wav_bytes(&bytes)
            .map_err(|e| RedubError::Synthesis(format!("Engine returned unreadable audio: {}", e)))?;

        if audio.is_empty() {
            return Err(RedubError::Synthesis("Engine returned no audio".to_string()));
        }
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_voices_reads_nested_language() {
        let mut listing = BTreeMap::new();
        listing.insert("es_ES-davefx-medium".to_string(), json!({"language": {"code": "es_ES"}}));
        listing.insert("fr_FR-siwis-low".to_string(), json!({"language": "fr"}));
        listing.insert("custom".to_string(), json!({}));

        let voices = parse_voices(listing);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[0].id, "custom");
        assert_eq!(voices[0].language, None);
        assert_eq!(voices[1].language.as_deref(), Some("es_ES"));
        assert_eq!(voices[2].language.as_deref(), Some("fr"));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_request() {
        let synthesizer = PiperSynthesizer::new(SynthConfig::default()).unwrap();
        let result = synthesizer.synthesize("  ", "es_ES-davefx-medium").await;
        assert!(matches!(result, Err(RedubError::Synthesis(_))));
    }
}
