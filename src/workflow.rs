use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::{AudioFormat, Config};
use crate::error::{Result, RedubError};
use crate::media::{Muxer, MuxerFactory};
use crate::pipeline::{DubbingJob, ExitStatus, JobReport, Orchestrator};
use crate::registry::ModelRegistry;
use crate::segment::{is_segment_file, load_segments};
use crate::subtitle::write_srt;
use crate::synth::SynthesizerFactory;
use crate::translate::TranslatorFactory;

/// Parameters of one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input: PathBuf,
    pub source_lang: String,
    pub target_lang: String,
    pub voice: String,
    /// Track path for a file input, output directory for a directory input
    pub output: PathBuf,
    /// Source video and where to write the dubbed copy
    pub video: Option<(PathBuf, PathBuf)>,
    pub report: Option<PathBuf>,
    pub subtitles_output: Option<PathBuf>,
    pub show_progress: bool,
}

/// Outcome of dubbing every segment file in a directory.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<(PathBuf, JobReport)>,
    /// Inputs that produced no track, with the reason
    pub failed: Vec<(PathBuf, String)>,
    /// Inputs not started because the batch was cancelled
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn exit_status(&self) -> ExitStatus {
        let all_clean = self
            .completed
            .iter()
            .all(|(_, report)| report.exit_status() == ExitStatus::Success);
        if all_clean && self.failed.is_empty() && self.skipped.is_empty() {
            ExitStatus::Success
        } else {
            ExitStatus::Partial
        }
    }
}

pub struct Workflow {
    config: Config,
    registry: ModelRegistry,
    muxer: Box<dyn Muxer>,
}

impl Workflow {
    /// Connect to both engines and probe what they have installed.
    pub async fn new(config: Config) -> Result<Self> {
        let translator = TranslatorFactory::create_translator(config.translate.clone())?;
        let synthesizer = SynthesizerFactory::create_synthesizer(config.synth.clone())?;
        let registry =
            ModelRegistry::initialize(translator, synthesizer, &config.translate.pivot_language).await?;
        let muxer = MuxerFactory::create_muxer(config.media.clone());

        Ok(Self::from_parts(config, registry, muxer))
    }

    pub fn from_parts(config: Config, registry: ModelRegistry, muxer: Box<dyn Muxer>) -> Self {
        Self {
            config,
            registry,
            muxer,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Dub one segment file. Returns the report once the track (and any
    /// requested artifacts) are on disk; per-segment failures do not make
    /// this fail.
    pub async fn run(&self, request: &RunRequest, cancel: CancellationToken) -> Result<JobReport> {
        let segments = load_segments(&request.input).await?;
        let models = self
            .registry
            .prepare_job(&request.source_lang, &request.target_lang, &request.voice)?;

        if request.video.is_some() {
            self.muxer.check_availability().await?;
        }

        let job = DubbingJob { segments, models };
        let mut orchestrator = Orchestrator::new(&self.registry, &self.config);
        if request.show_progress {
            orchestrator = orchestrator.with_progress(segment_progress(job.segments.len()));
        }

        let result = orchestrator.run(&job, cancel).await?;

        let format = self.config.media.audio_format;
        let (wav_path, audio_path) = track_paths(&request.output, format);

        ensure_parent_dir(&wav_path).await?;
        result.track.write_wav(&wav_path).await?;
        info!("Dubbed track written: {}", wav_path.display());

        let report_path = request
            .report
            .clone()
            .unwrap_or_else(|| default_report_path(&audio_path));
        ensure_parent_dir(&report_path).await?;
        result.report.write_json(&report_path).await?;
        info!("Job report written: {}", report_path.display());

        if let Some(subtitles) = &request.subtitles_output {
            ensure_parent_dir(subtitles).await?;
            write_srt(&result.report.translated_segments(), subtitles).await?;
        }

        if let Some((video, video_output)) = &request.video {
            ensure_parent_dir(video_output).await?;
            self.muxer.mux(video, &wav_path, video_output).await?;
        }

        if format != AudioFormat::Wav {
            self.encode_track(&wav_path, &audio_path, format).await;
        }

        if result.report.failed > 0 || result.report.cancelled > 0 {
            warn!(
                "Partial output: {} failed, {} cancelled of {} segments",
                result.report.failed,
                result.report.cancelled,
                result.report.segments.len()
            );
        }

        Ok(result.report)
    }

    /// Dub every `.srt`/`.json` file directly inside `request.input`, in
    /// file name order. Each file gets `<stem>.<target>.<format>` in the
    /// output directory; `report` and `subtitles_output` name directories.
    /// A file that fails is logged and the batch moves on.
    pub async fn run_batch(&self, request: &RunRequest, cancel: CancellationToken) -> Result<BatchReport> {
        if request.video.is_some() {
            return Err(RedubError::Configuration(
                "a video can only be muxed when dubbing a single segment file".to_string(),
            ));
        }

        let inputs = gather_inputs(&request.input)?;
        self.registry
            .prepare_job(&request.source_lang, &request.target_lang, &request.voice)?;

        fs::create_dir_all(&request.output).await?;
        info!("Found {} segment files to dub", inputs.len());

        let mut batch = BatchReport::default();
        let total = inputs.len();
        for (n, input) in inputs.into_iter().enumerate() {
            if cancel.is_cancelled() {
                batch.skipped.push(input);
                continue;
            }

            info!("[{}/{}] Dubbing {}", n + 1, total, input.display());
            let item = batch_item_request(request, &input);
            match self.run(&item, cancel.clone()).await {
                Ok(report) => batch.completed.push((input, report)),
                Err(e) => {
                    warn!("Failed to dub {}: {}", input.display(), e);
                    batch.failed.push((input, e.to_string()));
                }
            }
        }

        if !batch.skipped.is_empty() {
            warn!("Batch cancelled, {} files not started", batch.skipped.len());
        }

        Ok(batch)
    }

    /// Replace the WAV with an encoded copy. When encoding fails the WAV
    /// stays where it is.
    async fn encode_track(&self, wav_path: &Path, audio_path: &Path, format: AudioFormat) {
        match self.muxer.encode_audio(wav_path, audio_path, format).await {
            Ok(()) => {
                info!("Dubbed track encoded: {}", audio_path.display());
                if let Err(e) = fs::remove_file(wav_path).await {
                    warn!("Could not remove {}: {}", wav_path.display(), e);
                }
            }
            Err(e) => warn!(
                "Encoding to {} failed ({}); keeping WAV at {}",
                format,
                e,
                wav_path.display()
            ),
        }
    }
}

/// Where the WAV is written and where the delivered track ends up. They
/// are the same path for wav output.
pub fn track_paths(output: &Path, format: AudioFormat) -> (PathBuf, PathBuf) {
    match format {
        AudioFormat::Wav => (output.to_path_buf(), output.to_path_buf()),
        other => (output.with_extension("wav"), output.with_extension(other.extension())),
    }
}

/// Segment files directly inside `input_dir`, sorted by file name.
pub fn gather_inputs(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(RedubError::Configuration(format!(
            "{} is not a directory",
            input_dir.display()
        )));
    }

    let inputs: Vec<PathBuf> = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_segment_file(e.path()))
        .map(|e| e.into_path())
        .collect();

    if inputs.is_empty() {
        return Err(RedubError::FileNotFound(format!(
            "no .srt or .json segment files in {}",
            input_dir.display()
        )));
    }
    Ok(inputs)
}

fn batch_item_request(request: &RunRequest, input: &Path) -> RunRequest {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "segments".to_string());
    let name = format!("{}.{}", stem, request.target_lang);

    RunRequest {
        input: input.to_path_buf(),
        output: request.output.join(format!("{}.wav", name)),
        video: None,
        report: request
            .report
            .as_ref()
            .map(|dir| dir.join(format!("{}.report.json", name))),
        subtitles_output: request
            .subtitles_output
            .as_ref()
            .map(|dir| dir.join(format!("{}.srt", name))),
        ..request.clone()
    }
}

/// `<output>.report.json`, next to the track.
pub fn default_report_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".report.json");
    PathBuf::from(name)
}

pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await.map_err(|e| {
                RedubError::Pipeline(format!("Cannot create {}: {}", parent.display(), e))
            })
        }
        _ => Ok(()),
    }
}

fn segment_progress(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
