use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use super::{MediaCommand, MediaCommandBuilder, Muxer};
use crate::config::{AudioFormat, MediaConfig, MuxMode};
use crate::error::{Result, RedubError};

/// ffmpeg-backed muxer
pub struct FfmpegMuxer {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegMuxer {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    /// The command `mux` would run for the configured mode.
    pub fn mux_command(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> MediaCommand {
        match self.config.mux_mode {
            MuxMode::Replace => self.command_builder.replace_audio(
                video_path,
                audio_path,
                output_path,
                &self.config.audio_codec,
                &self.config.extra_options,
            ),
            MuxMode::Overlay => self.command_builder.overlay_audio(
                video_path,
                audio_path,
                output_path,
                self.config.original_volume,
                &self.config.audio_codec,
                &self.config.extra_options,
            ),
        }
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        if !video_path.exists() {
            return Err(RedubError::FileNotFound(video_path.display().to_string()));
        }
        if !audio_path.exists() {
            return Err(RedubError::FileNotFound(audio_path.display().to_string()));
        }

        info!(
            "Muxing {} into {} -> {} ({:?})",
            audio_path.display(),
            video_path.display(),
            output_path.display(),
            self.config.mux_mode
        );

        self.mux_command(video_path, audio_path, output_path).execute().await?;

        info!("Muxing completed");
        Ok(())
    }

    async fn encode_audio(&self, wav_path: &Path, output_path: &Path, format: AudioFormat) -> Result<()> {
        if !wav_path.exists() {
            return Err(RedubError::FileNotFound(wav_path.display().to_string()));
        }

        let Some(command) = self.command_builder.transcode_audio(wav_path, output_path, format) else {
            return Ok(());
        };

        info!("Encoding {} -> {}", wav_path.display(), output_path.display());
        command.execute().await
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| RedubError::Media(format!("Media tool not available: {}", e)))?;
        debug!("Media tool {} is available", self.config.binary_path);
        Ok(())
    }

    async fn version_info(&self) -> Result<String> {
        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| RedubError::Media(format!("Failed to execute media tool: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RedubError::Media(format!("Media tool version check failed: {}", stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }
}
