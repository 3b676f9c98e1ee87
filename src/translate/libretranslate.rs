use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{InstalledLanguage, Translator};
use crate::config::TranslateConfig;
use crate::error::{Result, RedubError};

#[derive(Debug, Clone, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Client for LibreTranslate-compatible servers (Argos Translate models).
pub struct LibreTranslator {
    client: Client,
    config: TranslateConfig,
}

impl LibreTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }
}

/// Pull the server's error message out of a failed response body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl Translator for LibreTranslator {
    async fn installed_languages(&self) -> Result<Vec<InstalledLanguage>> {
        let url = self.url("languages");
        debug!("Fetching installed languages from: {}", url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| RedubError::Configuration(format!("Translation engine unreachable at {}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RedubError::Configuration(format!(
                "Translation engine language listing failed {}: {}",
                status,
                error_message(&body)
            )));
        }

        let languages: Vec<InstalledLanguage> = response.json().await
            .map_err(|e| RedubError::Configuration(format!("Failed to parse language listing: {}", e)))?;
        Ok(languages)
    }

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let request = TranslateRequest {
            q: text,
            source: source_lang,
            target: target_lang,
            format: "text",
            api_key: self.config.api_key.as_deref(),
        };

        let url = self.url("translate");
        debug!("Sending translation request {}->{} to: {}", source_lang, target_lang, url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RedubError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RedubError::Translation(format!(
                "Translation engine error {}: {}",
                status,
                error_message(&body)
            )));
        }

        let translation: TranslateResponse = response.json().await
            .map_err(|e| RedubError::Translation(format!("Failed to parse response: {}", e)))?;

        let translated = translation.translated_text.trim().to_string();
        if translated.is_empty() {
            return Err(RedubError::Translation("Empty translation received".to_string()));
        }
        Ok(translated)
    }
}
