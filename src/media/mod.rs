// Muxing the dubbed track back into video, and encoding it for delivery
//
// - commands: ffmpeg command construction and execution
// - processor: ffmpeg-backed `Muxer`

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::{MediaCommand, MediaCommandBuilder};
pub use processor::FfmpegMuxer;

use crate::config::{AudioFormat, MediaConfig};
use crate::error::Result;

/// Combines a video with a dubbed audio track
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Write `output_path`: the video's picture with `audio_path` as sound
    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()>;

    /// Encode a WAV track into another audio format. The WAV is left in place.
    async fn encode_audio(&self, wav_path: &Path, output_path: &Path, format: AudioFormat) -> Result<()>;

    /// Check that the external tool can be executed
    async fn check_availability(&self) -> Result<()>;

    /// First line of the tool's version banner
    async fn version_info(&self) -> Result<String>;
}

/// Factory for creating muxer instances
pub struct MuxerFactory;

impl MuxerFactory {
    pub fn create_muxer(config: MediaConfig) -> Box<dyn Muxer> {
        Box::new(FfmpegMuxer::new(config))
    }
}
