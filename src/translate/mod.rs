// Translation engine adapters
//
// The pipeline talks to translation engines through the `Translator` trait:
// - libretranslate: HTTP client for LibreTranslate / Argos Translate servers
// - route: resolution of direct or pivoted language pairs

pub mod libretranslate;
pub mod route;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use route::TranslationRoute;
use crate::config::TranslateConfig;
use crate::error::Result;

/// A source language installed in the engine and the targets it reaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledLanguage {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Stateless adapter to a machine-translation engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// List installed languages with their reachable targets
    async fn installed_languages(&self) -> Result<Vec<InstalledLanguage>>;

    /// Translate one text unit. No retries.
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    pub fn create_translator(config: TranslateConfig) -> Result<Arc<dyn Translator>> {
        Ok(Arc::new(libretranslate::LibreTranslator::new(config)?))
    }
}
