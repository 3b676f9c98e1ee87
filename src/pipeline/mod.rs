// Segment pipeline orchestration
//
// - state: per-segment lifecycle tracking
// - report: outcomes, job report and exit classes

pub mod report;
pub mod state;

use chrono::Utc;
use indicatif::ProgressBar;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use report::{ExitStatus, JobReport, JobResult, SegmentOutcome, SegmentReport};
pub use state::{SegmentState, SegmentTracker};

use crate::align::{AlignedClip, SynthesizedClip, TimeAligner};
use crate::assemble::{AudioAssembler, Contribution};
use crate::config::Config;
use crate::error::{Result, RedubError};
use crate::registry::{JobModels, ModelRegistry};
use crate::segment::{job_end, validate_segments, Segment, TranslatedSegment};
use crate::synth::Synthesizer;
use crate::translate::Translator;

/// Everything one dubbing run needs.
#[derive(Debug, Clone)]
pub struct DubbingJob {
    pub segments: Vec<Segment>,
    pub models: JobModels,
}

/// What a worker hands back for one segment.
struct SegmentResult {
    segment: Segment,
    target_text: Option<String>,
    outcome: SegmentOutcome,
    clip: Option<AlignedClip>,
}

impl SegmentResult {
    fn cancelled(segment: Segment) -> Self {
        Self {
            segment,
            target_text: None,
            outcome: SegmentOutcome::Cancelled,
            clip: None,
        }
    }

    fn failed(segment: Segment, target_text: Option<String>, outcome: SegmentOutcome) -> Self {
        Self {
            segment,
            target_text,
            outcome,
            clip: None,
        }
    }
}

/// Shared, read-only context for workers.
struct WorkerContext {
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn Synthesizer>,
    aligner: Arc<TimeAligner>,
    models: JobModels,
}

/// Drives segments through translate → synthesize → align on a bounded
/// worker pool, then assembles the track once every segment is terminal.
pub struct Orchestrator {
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn Synthesizer>,
    aligner: Arc<TimeAligner>,
    assembler: AudioAssembler,
    workers: usize,
    progress: Option<ProgressBar>,
}

impl Orchestrator {
    pub fn new(registry: &ModelRegistry, config: &Config) -> Self {
        Self::from_parts(
            registry.translator(),
            registry.synthesizer(),
            TimeAligner::new(&config.align, config.assembly.sample_rate),
            AudioAssembler::new(&config.assembly),
            config.pipeline.workers,
        )
    }

    pub fn from_parts(
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn Synthesizer>,
        aligner: TimeAligner,
        assembler: AudioAssembler,
        workers: usize,
    ) -> Self {
        Self {
            translator,
            synthesizer,
            aligner: Arc::new(aligner),
            assembler,
            workers: workers.max(1),
            progress: None,
        }
    }

    /// Advance `progress` as segments reach a terminal state.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run a job to completion. Per-segment failures are recorded in the
    /// report; only invalid input is returned as an error.
    ///
    /// Once `cancel` fires no further segments are dispatched. Segments
    /// already running finish normally; the rest are reported as cancelled.
    pub async fn run(&self, job: &DubbingJob, cancel: CancellationToken) -> Result<JobResult> {
        validate_segments(&job.segments)?;

        info!(
            "Dubbing {} segments over {:.2}s ({}, voice {}) with {} workers",
            job.segments.len(),
            job_end(&job.segments),
            job.models.route,
            job.models.voice,
            self.workers
        );

        let context = Arc::new(WorkerContext {
            translator: Arc::clone(&self.translator),
            synthesizer: Arc::clone(&self.synthesizer),
            aligner: Arc::clone(&self.aligner),
            models: job.models.clone(),
        });

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut results: BTreeMap<usize, SegmentResult> = BTreeMap::new();
        let mut in_flight: HashMap<Id, Segment> = HashMap::new();

        for segment in &job.segments {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => Some(
                    permit.map_err(|e| RedubError::Pipeline(format!("worker pool closed: {}", e)))?
                ),
            };

            let Some(permit) = permit else {
                SegmentTracker::new(segment.index).advance(SegmentState::Cancelled);
                self.tick();
                results.insert(segment.index, SegmentResult::cancelled(segment.clone()));
                continue;
            };

            let context = Arc::clone(&context);
            let handle = tasks.spawn({
                let segment = segment.clone();
                async move {
                    let result = process_segment(segment, &context).await;
                    drop(permit);
                    result
                }
            });
            in_flight.insert(handle.id(), segment.clone());
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let result = match joined {
                Ok((id, result)) => {
                    in_flight.remove(&id);
                    result
                }
                Err(e) => {
                    let segment = in_flight.remove(&e.id()).ok_or_else(|| {
                        RedubError::Pipeline(format!("worker task {} has no segment", e.id()))
                    })?;
                    let reason = join_failure_reason(e);
                    warn!(segment = segment.index, "Worker failed: {}", reason);
                    SegmentResult::failed(segment, None, SegmentOutcome::WorkerFailed { reason })
                }
            };
            self.tick();
            results.insert(result.segment.index, result);
        }

        if results.len() != job.segments.len() {
            return Err(RedubError::Pipeline(format!(
                "expected {} segment results, collected {}",
                job.segments.len(),
                results.len()
            )));
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        Ok(self.finish(job, results))
    }

    fn tick(&self) {
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
    }

    /// Assemble the track and build the report, strictly in index order.
    fn finish(&self, job: &DubbingJob, results: BTreeMap<usize, SegmentResult>) -> JobResult {
        let mut contributions = Vec::with_capacity(results.len());
        let mut segments = Vec::with_capacity(results.len());

        for (_, result) in results {
            let mut entry = SegmentReport::new(&result.segment, result.outcome);
            entry.target_text = result.target_text;

            match result.clip {
                Some(clip) => {
                    entry.alignment = Some(clip.alignment);
                    entry.slot_overrun_secs = clip.slot_overrun();
                    contributions.push(Contribution::Clip(clip));
                }
                None => contributions.push(Contribution::Silence {
                    index: result.segment.index,
                    start: result.segment.start,
                    end: result.segment.end,
                }),
            }
            segments.push(entry);
        }

        let track = self.assembler.assemble(&contributions);

        let succeeded = segments.iter().filter(|s| s.outcome.is_success()).count();
        let failed = segments.iter().filter(|s| s.outcome.is_failure()).count();
        let cancelled = segments
            .iter()
            .filter(|s| s.outcome == SegmentOutcome::Cancelled)
            .count();
        let slot_overruns = segments.iter().filter(|s| s.slot_overrun_secs.is_some()).count();

        info!(
            "Job finished: {} succeeded, {} failed, {} cancelled, {} slot overruns, {:.2}s track",
            succeeded,
            failed,
            cancelled,
            slot_overruns,
            track.duration_secs()
        );

        let report = JobReport {
            job_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            source_lang: job.models.source_lang.clone(),
            target_lang: job.models.target_lang.clone(),
            voice: job.models.voice.clone(),
            route: job.models.route.to_string(),
            sample_rate: track.sample_rate,
            track_duration_secs: track.duration_secs(),
            succeeded,
            failed,
            cancelled,
            slot_overruns,
            segments,
        };

        JobResult { track, report }
    }
}

/// Panic message or cancellation cause of a worker task.
fn join_failure_reason(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("worker task failed: {}", error);
    }
    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("worker panicked: {}", message)
}

/// Take one segment through every stage. Never returns an error: failures
/// become the segment's outcome.
async fn process_segment(segment: Segment, context: &WorkerContext) -> SegmentResult {
    let mut tracker = SegmentTracker::new(segment.index);

    tracker.advance(SegmentState::Translating);
    let target_text = match context
        .models
        .route
        .translate(context.translator.as_ref(), &segment.source_text)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            warn!(segment = segment.index, "Translation failed: {}", e);
            tracker.advance(SegmentState::Failed);
            let outcome = SegmentOutcome::TranslationFailed { reason: e.to_string() };
            return SegmentResult::failed(segment, None, outcome);
        }
    };

    tracker.advance(SegmentState::Synthesizing);
    let audio = match context
        .synthesizer
        .synthesize(&target_text, &context.models.voice)
        .await
    {
        Ok(audio) => audio,
        Err(e) => {
            warn!(segment = segment.index, "Synthesis failed: {}", e);
            tracker.advance(SegmentState::Failed);
            let outcome = SegmentOutcome::SynthesisFailed { reason: e.to_string() };
            return SegmentResult::failed(segment, Some(target_text), outcome);
        }
    };

    tracker.advance(SegmentState::Aligning);
    let clip = SynthesizedClip {
        translated: TranslatedSegment {
            segment: segment.clone(),
            target_text: target_text.clone(),
        },
        audio,
    };
    debug!(
        segment = segment.index,
        speech_secs = clip.natural_duration(),
        slot_secs = segment.slot_duration(),
        "Synthesized clip"
    );
    let aligner = Arc::clone(&context.aligner);
    let aligned = tokio::task::spawn_blocking(move || aligner.align(clip))
        .await
        .map_err(|e| RedubError::Alignment(format!("alignment task failed: {}", e)))
        .and_then(|result| result);

    match aligned {
        Ok(clip) => {
            tracker.advance(SegmentState::Done);
            SegmentResult {
                segment,
                target_text: Some(target_text),
                outcome: SegmentOutcome::Success,
                clip: Some(clip),
            }
        }
        Err(e) => {
            warn!(segment = segment.index, "Alignment failed: {}", e);
            tracker.advance(SegmentState::Failed);
            let outcome = SegmentOutcome::AlignmentFailed { reason: e.to_string() };
            SegmentResult::failed(segment, Some(target_text), outcome)
        }
    }
}
