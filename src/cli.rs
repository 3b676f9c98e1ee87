use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dub a timed segment file (SRT or JSON), or a directory of them, into audio tracks
    Run {
        /// Input segment file (.srt or .json) or a directory of segment files
        #[arg(short, long)]
        input: PathBuf,

        /// Source language code
        #[arg(long)]
        source_lang: String,

        /// Target language code
        #[arg(long)]
        target_lang: String,

        /// Voice id installed in the speech engine
        #[arg(long)]
        voice: String,

        /// Output track, or output directory when the input is a directory
        #[arg(short, long)]
        output: PathBuf,

        /// Output audio format: wav, mp3, ogg, opus or m4a (default: media.audio_format)
        #[arg(long)]
        audio_format: Option<String>,

        /// Number of concurrent segment workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Video to mux the dubbed track into
        #[arg(long, requires = "video_output")]
        video: Option<PathBuf>,

        /// Output path for the dubbed video
        #[arg(long, requires = "video")]
        video_output: Option<PathBuf>,

        /// Job report path (default: <output>.report.json); a directory for batch input
        #[arg(long)]
        report: Option<PathBuf>,

        /// Also write the translated subtitles as SRT; a directory for batch input
        #[arg(long)]
        subtitles_output: Option<PathBuf>,
    },

    /// Check that a language pair and voice are installed
    Check {
        /// Source language code
        #[arg(long)]
        source_lang: String,

        /// Target language code
        #[arg(long)]
        target_lang: String,

        /// Voice id
        #[arg(long)]
        voice: String,
    },

    /// List installed translation languages and their targets
    Languages,

    /// List installed voices
    Voices,

    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "redub.toml")]
        output: PathBuf,
    },

    /// Mux an existing dubbed track into a video
    Mux {
        /// Input video file
        #[arg(long)]
        video: PathBuf,

        /// Dubbed audio track
        #[arg(long)]
        audio: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
    },
}
