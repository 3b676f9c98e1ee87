use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::config::AudioFormat;
use crate::error::{Result, RedubError};

/// An external media tool invocation.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    pub fn copy_video(self) -> Self {
        self.arg("-c:v").arg("copy")
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// Run the command, surfacing stderr on failure.
    pub async fn execute(&self) -> Result<()> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| RedubError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RedubError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Builds the ffmpeg invocations the muxer needs.
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Swap the video's audio for the dubbed track. Video is stream-copied;
    /// the track is padded with silence so the output keeps the full
    /// length of the video.
    pub fn replace_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        audio_codec: &str,
        extra_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio replacement")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .copy_video()
            .audio_codec(audio_codec)
            .audio_filter("apad")
            .arg("-shortest")
            .args(extra_options.iter().cloned())
            .output(output_path)
    }

    /// Mix the dubbed track over the original audio, ducked to
    /// `original_volume`.
    pub fn overlay_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        original_volume: f32,
        audio_codec: &str,
        extra_options: &[String],
    ) -> MediaCommand {
        let graph = format!(
            "[0:a]volume={}[bg];[bg][1:a]amix=inputs=2:duration=first:normalize=0[aout]",
            original_volume
        );

        MediaCommand::new(&self.binary_path, "Audio overlay")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .filter_complex(graph)
            .map("0:v:0")
            .map("[aout]")
            .copy_video()
            .audio_codec(audio_codec)
            .args(extra_options.iter().cloned())
            .output(output_path)
    }

    /// Encode the WAV track into `format`. Returns `None` for wav, which
    /// needs no encoding.
    pub fn transcode_audio<P: AsRef<Path>>(
        &self,
        wav_path: P,
        output_path: P,
        format: AudioFormat,
    ) -> Option<MediaCommand> {
        let cmd = MediaCommand::new(&self.binary_path, format!("Encoding to {}", format))
            .overwrite()
            .input(wav_path)
            .arg("-vn");

        let cmd = match format {
            AudioFormat::Wav => return None,
            AudioFormat::Mp3 => cmd.args(["-ar", "44100", "-b:a", "160k"]),
            // Vorbis at quality 5 is plenty for mono speech
            AudioFormat::Ogg => cmd
                .args(["-ac", "1", "-ar", "22050"])
                .audio_codec("libvorbis")
                .args(["-qscale:a", "5"]),
            AudioFormat::Opus => cmd.audio_codec("libopus").args(["-b:a", "96k"]),
            AudioFormat::M4a => cmd.audio_codec("aac").args(["-b:a", "160k"]),
        };

        Some(cmd.output(output_path))
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], value: &str) -> usize {
        args.iter().position(|a| a == value).unwrap()
    }

    #[test]
    fn test_replace_audio_maps_video_and_dubbed_track() {
        let cmd = MediaCommandBuilder::new("ffmpeg").replace_audio(
            "movie.mp4",
            "dub.wav",
            "movie.es.mp4",
            "aac",
            &["-b:a".to_string(), "160k".to_string()],
        );

        assert_eq!(cmd.binary_path, "ffmpeg");
        assert_eq!(cmd.args[0], "-y");
        assert!(position(&cmd.args, "movie.mp4") < position(&cmd.args, "dub.wav"));
        assert_eq!(cmd.args[position(&cmd.args, "-c:v") + 1], "copy");
        assert_eq!(cmd.args[position(&cmd.args, "-c:a") + 1], "aac");
        assert!(cmd.args.contains(&"1:a:0".to_string()));
        assert!(cmd.args.contains(&"160k".to_string()));
        // Output follows the video: the track is padded before -shortest applies
        assert_eq!(cmd.args[position(&cmd.args, "-af") + 1], "apad");
        assert!(position(&cmd.args, "-af") < position(&cmd.args, "-shortest"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("movie.es.mp4"));
    }

    #[test]
    fn test_overlay_audio_ducks_original_track() {
        let cmd = MediaCommandBuilder::new("/opt/ffmpeg/bin/ffmpeg").overlay_audio(
            "movie.mp4",
            "dub.wav",
            "out.mp4",
            0.15,
            "aac",
            &[],
        );

        let graph = &cmd.args[position(&cmd.args, "-filter_complex") + 1];
        assert!(graph.starts_with("[0:a]volume=0.15[bg]"));
        assert!(graph.contains("amix=inputs=2"));
        assert!(cmd.args.contains(&"[aout]".to_string()));
        assert!(!cmd.args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_transcode_audio_per_format() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        assert!(builder.transcode_audio("dub.wav", "dub.wav", AudioFormat::Wav).is_none());

        let mp3 = builder.transcode_audio("dub.wav", "dub.mp3", AudioFormat::Mp3).unwrap();
        assert_eq!(mp3.args[..4], ["-y", "-i", "dub.wav", "-vn"]);
        assert_eq!(mp3.args[position(&mp3.args, "-ar") + 1], "44100");
        assert_eq!(mp3.args[position(&mp3.args, "-b:a") + 1], "160k");
        assert_eq!(mp3.args.last().map(String::as_str), Some("dub.mp3"));

        let ogg = builder.transcode_audio("dub.wav", "dub.ogg", AudioFormat::Ogg).unwrap();
        assert_eq!(ogg.args[position(&ogg.args, "-c:a") + 1], "libvorbis");
        assert_eq!(ogg.args[position(&ogg.args, "-ac") + 1], "1");
        assert_eq!(ogg.args[position(&ogg.args, "-qscale:a") + 1], "5");

        let opus = builder.transcode_audio("dub.wav", "dub.opus", AudioFormat::Opus).unwrap();
        assert_eq!(opus.args[position(&opus.args, "-c:a") + 1], "libopus");
        assert_eq!(opus.args[position(&opus.args, "-b:a") + 1], "96k");

        let m4a = builder.transcode_audio("dub.wav", "dub.m4a", AudioFormat::M4a).unwrap();
        assert_eq!(m4a.args[position(&m4a.args, "-c:a") + 1], "aac");
        assert_eq!(m4a.description, "Encoding to m4a");
    }

    #[tokio::test]
    async fn test_missing_binary_is_media_error() {
        let cmd = MediaCommandBuilder::new("/nonexistent/ffmpeg-redub").version_check();
        let result = cmd.execute().await;
        assert!(matches!(result, Err(RedubError::Media(_))));
    }
}
