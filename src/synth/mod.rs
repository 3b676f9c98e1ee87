// Speech synthesis engine adapters
//
// - piper: HTTP client for Piper-compatible speech servers
// - exclusive: single-access guard for engines that are not concurrency-safe

pub mod exclusive;
pub mod piper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub use exclusive::ExclusiveSynthesizer;
use crate::audio::AudioBuffer;
use crate::config::SynthConfig;
use crate::error::Result;

/// An installed voice model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub language: Option<String>,
}

/// Stateless adapter to a text-to-speech engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// List installed voices
    async fn installed_voices(&self) -> Result<Vec<VoiceInfo>>;

    /// Render one text unit with `voice` at the engine's natural pace
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioBuffer>;
}

/// Factory for creating synthesizer instances
pub struct SynthesizerFactory;

impl SynthesizerFactory {
    pub fn create_synthesizer(config: SynthConfig) -> Result<Arc<dyn Synthesizer>> {
        let serialize = config.serialize_requests;
        let engine: Arc<dyn Synthesizer> = Arc::new(piper::PiperSynthesizer::new(config)?);

        if serialize {
            info!("Speech engine requests will be serialized");
            Ok(Arc::new(ExclusiveSynthesizer::new(engine)))
        } else {
            Ok(engine)
        }
    }
}
