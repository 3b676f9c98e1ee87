use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use crate::error::{Result, RedubError};

fn default_pivot_language() -> String {
    "en".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_serialize_requests() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub synth: SynthConfig,
    #[serde(default)]
    pub align: AlignConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// LibreTranslate-compatible endpoint URL
    pub endpoint: String,
    /// API key, if the server requires one
    #[serde(default)]
    pub api_key: Option<String>,
    /// Language used to bridge pairs without a direct model (empty disables)
    #[serde(default = "default_pivot_language")]
    pub pivot_language: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Piper-compatible speech server URL
    pub endpoint: String,
    /// Send one synthesis request at a time. Keep enabled unless the
    /// engine is known to handle concurrent requests.
    #[serde(default = "default_serialize_requests")]
    pub serialize_requests: bool,
    /// Speaking-rate hint passed to the engine (lower is faster)
    #[serde(default)]
    pub length_scale: Option<f32>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Largest natural/slot duration ratio that is still time-compressed.
    /// Clips beyond it are emitted at natural length as slot overruns.
    pub max_compression_ratio: f64,
    /// Compress overrunning clips by `max_compression_ratio` before emitting
    /// them, shortening the overrun without fully fitting the slot.
    #[serde(default)]
    pub compress_overruns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Output sample rate of the assembled track
    pub sample_rate: u32,
    /// Fade-out window applied to a clip running into the next segment
    pub crossfade_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of segments processed concurrently
    pub workers: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MuxMode {
    /// Drop the original audio and use the dubbed track only
    Replace,
    /// Mix the dubbed track over the ducked original audio
    Overlay,
}

/// Container of the dubbed track on disk.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Ogg,
    Opus,
    M4a,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
            Self::M4a => "m4a",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = RedubError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            "ogg" => Ok(Self::Ogg),
            "opus" => Ok(Self::Opus),
            "m4a" => Ok(Self::M4a),
            other => Err(RedubError::Configuration(format!(
                "Unsupported audio format: {} (expected wav, mp3, ogg, opus or m4a)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// How the dubbed track is combined with the source video
    pub mux_mode: MuxMode,
    /// Volume of the original audio in overlay mode (0.0 - 1.0)
    pub original_volume: f32,
    /// Audio codec for the muxed output
    pub audio_codec: String,
    /// Additional ffmpeg options appended before the output path
    #[serde(default)]
    pub extra_options: Vec<String>,
    /// Format of the dubbed track; anything but wav is encoded from the WAV by ffmpeg
    #[serde(default)]
    pub audio_format: AudioFormat,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            api_key: None,
            pivot_language: default_pivot_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5001".to_string(),
            serialize_requests: default_serialize_requests(),
            length_scale: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            max_compression_ratio: 1.3,
            compress_overruns: false,
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            crossfade_ms: 80,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            mux_mode: MuxMode::Replace,
            original_volume: 0.15,
            audio_codec: "aac".to_string(),
            extra_options: vec![
                // Example options users can add:
                // "-b:a".to_string(), "160k".to_string(),
            ],
            audio_format: AudioFormat::Wav,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RedubError::Configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| RedubError::Configuration(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RedubError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| RedubError::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.align.max_compression_ratio >= 1.0) {
            return Err(RedubError::Configuration(format!(
                "align.max_compression_ratio must be >= 1.0, got {}",
                self.align.max_compression_ratio
            )));
        }
        if self.assembly.sample_rate == 0 {
            return Err(RedubError::Configuration("assembly.sample_rate must be positive".to_string()));
        }
        if self.pipeline.workers == 0 {
            return Err(RedubError::Configuration("pipeline.workers must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.media.original_volume) {
            return Err(RedubError::Configuration(format!(
                "media.original_volume must be within 0.0..=1.0, got {}",
                self.media.original_volume
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.align.max_compression_ratio, 1.3);
        assert_eq!(config.assembly.crossfade_ms, 80);
        assert!(config.synth.serialize_requests);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            "[pipeline]\nworkers = 8\n\n[align]\nmax_compression_ratio = 1.5\n",
        )
        .unwrap();
        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.align.max_compression_ratio, 1.5);
        assert!(!config.align.compress_overruns);
        assert_eq!(config.translate.pivot_language, "en");
        assert_eq!(config.assembly.sample_rate, 22050);
    }

    #[test]
    fn test_validate_rejects_zero_workers_and_low_ratio() {
        let mut config = Config::default();
        config.pipeline.workers = 0;
        assert!(matches!(config.validate(), Err(RedubError::Configuration(_))));

        let mut config = Config::default();
        config.align.max_compression_ratio = 0.9;
        assert!(matches!(config.validate(), Err(RedubError::Configuration(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redub.toml");
        let mut config = Config::default();
        config.media.mux_mode = MuxMode::Overlay;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.media.mux_mode, MuxMode::Overlay);
        assert_eq!(loaded.translate.endpoint, config.translate.endpoint);
    }

    #[test]
    fn test_audio_format_parsing() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("opus".parse::<AudioFormat>().unwrap().extension(), "opus");
        assert!(matches!("flac".parse::<AudioFormat>(), Err(RedubError::Configuration(_))));

        let config: Config = toml::from_str("[media]\nbinary_path = \"ffmpeg\"\nmux_mode = \"Replace\"\noriginal_volume = 0.2\naudio_codec = \"aac\"\naudio_format = \"m4a\"\n").unwrap();
        assert_eq!(config.media.audio_format, AudioFormat::M4a);
        assert_eq!(Config::default().media.audio_format, AudioFormat::Wav);
    }
}
