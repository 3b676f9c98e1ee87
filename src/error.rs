use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WAV codec error: {0}")]
    Wav(#[from] hound::Error),

    /// Missing model, voice or invalid settings. Always job-fatal.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Invalid segments: {0}")]
    InvalidSegments(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl RedubError {
    /// Errors that abort a job before any segment is dispatched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::InvalidSegments(_)
                | Self::FileNotFound(_)
                | Self::UnsupportedFormat(_)
                | Self::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RedubError>;
