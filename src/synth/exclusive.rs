use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Synthesizer, VoiceInfo};
use crate::audio::AudioBuffer;
use crate::error::Result;

/// Serializes access to an engine that cannot take concurrent requests.
/// Callers still dispatch concurrently; only the engine call waits.
pub struct ExclusiveSynthesizer {
    inner: Arc<dyn Synthesizer>,
    guard: Mutex<()>,
}

impl ExclusiveSynthesizer {
    pub fn new(inner: Arc<dyn Synthesizer>) -> Self {
        Self {
            inner,
            guard: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Synthesizer for ExclusiveSynthesizer {
    async fn installed_voices(&self) -> Result<Vec<VoiceInfo>> {
        let _engine = self.guard.lock().await;
        self.inner.installed_voices().await
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioBuffer> {
        let _engine = self.guard.lock().await;
        self.inner.synthesize(text, voice).await
    }
}
