//! Process-wide handles to the translation and speech engines.
//!
//! The registry probes both engines once at startup and answers whether a
//! job's language pair and voice are installed before any segment runs.
//! Handles stay valid for the life of the registry; nothing is torn down
//! while a job is in flight.

use std::sync::Arc;
use tracing::info;

use crate::error::{Result, RedubError};
use crate::synth::{Synthesizer, VoiceInfo};
use crate::translate::{InstalledLanguage, TranslationRoute, Translator};

/// Engine resources resolved for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobModels {
    pub source_lang: String,
    pub target_lang: String,
    pub route: TranslationRoute,
    pub voice: String,
}

pub struct ModelRegistry {
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn Synthesizer>,
    languages: Vec<InstalledLanguage>,
    voices: Vec<VoiceInfo>,
    pivot_language: Option<String>,
}

impl ModelRegistry {
    /// Probe both engines. Unreachable engines are configuration errors.
    pub async fn initialize(
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn Synthesizer>,
        pivot_language: &str,
    ) -> Result<Self> {
        let languages = translator.installed_languages().await.map_err(as_configuration)?;
        let voices = synthesizer.installed_voices().await.map_err(as_configuration)?;

        info!(
            "Model registry ready: {} translation languages, {} voices",
            languages.len(),
            voices.len()
        );

        Ok(Self {
            translator,
            synthesizer,
            languages,
            voices,
            pivot_language: Some(pivot_language.trim().to_string()).filter(|p| !p.is_empty()),
        })
    }

    pub fn translator(&self) -> Arc<dyn Translator> {
        Arc::clone(&self.translator)
    }

    pub fn synthesizer(&self) -> Arc<dyn Synthesizer> {
        Arc::clone(&self.synthesizer)
    }

    pub fn languages(&self) -> &[InstalledLanguage] {
        &self.languages
    }

    pub fn voices(&self) -> &[VoiceInfo] {
        &self.voices
    }

    /// Resolve the translation route and voice for a job, failing fast if
    /// either is not installed.
    pub fn prepare_job(&self, source_lang: &str, target_lang: &str, voice: &str) -> Result<JobModels> {
        let route = TranslationRoute::resolve(
            &self.languages,
            source_lang,
            target_lang,
            self.pivot_language.as_deref(),
        )?;

        if !self.voices.iter().any(|v| v.id == voice) {
            return Err(RedubError::Configuration(format!(
                "Voice '{}' is not installed (available: {})",
                voice,
                self.voices.iter().map(|v| v.id.as_str()).collect::<Vec<_>>().join(", ")
            )));
        }

        info!("Resolved translation route {} with voice {}", route, voice);

        Ok(JobModels {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            route,
            voice: voice.to_string(),
        })
    }
}

fn as_configuration(error: RedubError) -> RedubError {
    match error {
        RedubError::Configuration(_) => error,
        other => RedubError::Configuration(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::MockSynthesizer;
    use crate::translate::MockTranslator;

    async fn registry() -> ModelRegistry {
        let mut translator = MockTranslator::new();
        translator.expect_installed_languages().times(1).returning(|| {
            Ok(vec![
                InstalledLanguage {
                    code: "fr".into(),
                    name: "French".into(),
                    targets: vec!["en".into()],
                },
                InstalledLanguage {
                    code: "en".into(),
                    name: "English".into(),
                    targets: vec!["es".into()],
                },
            ])
        });
        let mut synthesizer = MockSynthesizer::new();
        synthesizer.expect_installed_voices().times(1).returning(|| {
            Ok(vec![VoiceInfo {
                id: "es_ES-davefx-medium".into(),
                language: Some("es_ES".into()),
            }])
        });

        ModelRegistry::initialize(Arc::new(translator), Arc::new(synthesizer), "en")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_prepare_job_resolves_pivot_route_and_voice() {
        let registry = registry().await;
        let models = registry.prepare_job("fr", "es", "es_ES-davefx-medium").unwrap();
        assert_eq!(models.route, TranslationRoute::via("fr", "en", "es"));
        assert_eq!(models.voice, "es_ES-davefx-medium");
    }

    #[tokio::test]
    async fn test_unknown_voice_fails_fast() {
        let registry = registry().await;
        let result = registry.prepare_job("fr", "es", "de_DE-thorsten-high");
        assert!(matches!(result, Err(RedubError::Configuration(msg)) if msg.contains("thorsten")));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_configuration_error() {
        let mut translator = MockTranslator::new();
        translator
            .expect_installed_languages()
            .returning(|| Err(RedubError::Translation("connection refused".into())));
        let synthesizer = MockSynthesizer::new();

        let result = ModelRegistry::initialize(Arc::new(translator), Arc::new(synthesizer), "en").await;
        assert!(matches!(result, Err(RedubError::Configuration(_))));
    }
}
