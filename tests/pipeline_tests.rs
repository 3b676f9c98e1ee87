use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use redub::align::{Alignment, TimeAligner};
use redub::assemble::AudioAssembler;
use redub::audio::AudioBuffer;
use redub::config::{AlignConfig, AssemblyConfig};
use redub::error::{RedubError, Result};
use redub::pipeline::{DubbingJob, ExitStatus, JobResult, Orchestrator, SegmentOutcome};
use redub::registry::JobModels;
use redub::segment::Segment;
use redub::synth::{Synthesizer, VoiceInfo};
use redub::translate::{InstalledLanguage, TranslationRoute, Translator};

const RATE: u32 = 16_000;

/// Translator answering from a fixed phrase book. Unknown phrases fail.
struct PhraseBook {
    phrases: HashMap<String, String>,
    cancel_on: Option<(String, CancellationToken)>,
}

impl PhraseBook {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            phrases: pairs
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
            cancel_on: None,
        }
    }

    fn cancelling_on(mut self, text: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((text.to_string(), token));
        self
    }
}

#[async_trait]
impl Translator for PhraseBook {
    async fn installed_languages(&self) -> Result<Vec<InstalledLanguage>> {
        Ok(vec![InstalledLanguage {
            code: "fr".into(),
            name: "French".into(),
            targets: vec!["es".into()],
        }])
    }

    async fn translate(&self, text: &str, _source_lang: &str, _target_lang: &str) -> Result<String> {
        if let Some((trigger, token)) = &self.cancel_on {
            if trigger == text {
                token.cancel();
            }
        }
        // Vary completion order across segments
        tokio::time::sleep(Duration::from_millis((text.len() % 5) as u64 * 3)).await;

        self.phrases
            .get(text)
            .cloned()
            .ok_or_else(|| RedubError::Translation(format!("no translation for '{}'", text)))
    }
}

/// Speaks each phrase for a scripted number of seconds as a sine tone.
struct ToneVoice {
    durations: HashMap<String, f64>,
}

impl ToneVoice {
    fn new(durations: &[(&str, f64)]) -> Self {
        Self {
            durations: durations.iter().map(|(t, d)| (t.to_string(), *d)).collect(),
        }
    }
}

#[async_trait]
impl Synthesizer for ToneVoice {
    async fn installed_voices(&self) -> Result<Vec<VoiceInfo>> {
        Ok(vec![VoiceInfo {
            id: "es_ES-davefx-medium".into(),
            language: Some("es_ES".into()),
        }])
    }

    async fn synthesize(&self, text: &str, _voice: &str) -> Result<AudioBuffer> {
        let secs = self
            .durations
            .get(text)
            .copied()
            .ok_or_else(|| RedubError::Synthesis(format!("cannot voice '{}'", text)))?;
        let len = (secs * RATE as f64).round() as usize;
        let samples = (0..len)
            .map(|n| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * n as f32 / RATE as f32).sin())
            .collect();
        Ok(AudioBuffer::new(samples, RATE))
    }
}

fn job(segments: Vec<Segment>) -> DubbingJob {
    DubbingJob {
        segments,
        models: JobModels {
            source_lang: "fr".into(),
            target_lang: "es".into(),
            route: TranslationRoute::direct("fr", "es"),
            voice: "es_ES-davefx-medium".into(),
        },
    }
}

fn orchestrator(
    translator: PhraseBook,
    voice: ToneVoice,
    max_compression_ratio: f64,
    workers: usize,
) -> Orchestrator {
    Orchestrator::from_parts(
        Arc::new(translator),
        Arc::new(voice),
        TimeAligner::new(
            &AlignConfig {
                max_compression_ratio,
                compress_overruns: false,
            },
            RATE,
        ),
        AudioAssembler::new(&AssemblyConfig {
            sample_rate: RATE,
            crossfade_ms: 80,
        }),
        workers,
    )
}

fn subtitle_job() -> DubbingJob {
    job(vec![
        Segment::new(0, 0.0, 1.2, "Bonjour"),
        Segment::new(1, 1.2, 2.0, "Comment ça va"),
        Segment::new(2, 2.5, 4.0, "Très bien"),
        Segment::new(3, 4.0, 4.8, "Et toi"),
        Segment::new(4, 5.0, 6.25, "À demain"),
    ])
}

fn subtitle_engines() -> (PhraseBook, ToneVoice) {
    let translator = PhraseBook::new(&[
        ("Bonjour", "Hola"),
        ("Comment ça va", "Qué tal"),
        ("Très bien", "Muy bien"),
        ("Et toi", "Y tú"),
        ("À demain", "Hasta mañana"),
    ]);
    let voice = ToneVoice::new(&[
        ("Hola", 0.7),
        ("Qué tal", 1.0),
        ("Muy bien", 2.4),
        ("Y tú", 0.5),
        ("Hasta mañana", 1.1),
    ]);
    (translator, voice)
}

async fn run(orchestrator: &Orchestrator, job: &DubbingJob) -> JobResult {
    assert_ok!(orchestrator.run(job, CancellationToken::new()).await)
}

#[tokio::test]
async fn test_track_spans_last_segment_end() {
    let (translator, voice) = subtitle_engines();
    let job = subtitle_job();
    let result = run(&orchestrator(translator, voice, 1.3, 4), &job).await;

    assert_eq!(result.track.len(), (6.25 * RATE as f64) as usize);
    assert_eq!(result.report.track_duration_secs, 6.25);
}

#[tokio::test]
async fn test_output_is_identical_across_pool_sizes() {
    let job = subtitle_job();
    let mut outputs = Vec::new();

    for workers in [1, 2, 8] {
        let (translator, voice) = subtitle_engines();
        let result = run(&orchestrator(translator, voice, 1.3, workers), &job).await;
        outputs.push(assert_ok!(result.track.to_wav_bytes()));
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
}

#[tokio::test]
async fn test_failed_translation_leaves_exact_silence() {
    let (_, voice) = subtitle_engines();
    let translator = PhraseBook::new(&[
        ("Bonjour", "Hola"),
        ("Très bien", "Muy bien"),
        ("Et toi", "Y tú"),
        ("À demain", "Hasta mañana"),
    ]);
    let job = subtitle_job();
    let result = run(&orchestrator(translator, voice, 1.3, 3), &job).await;

    assert!(matches!(
        result.report.outcome(1),
        Some(SegmentOutcome::TranslationFailed { .. })
    ));
    assert_eq!(result.report.failed, 1);
    assert_eq!(result.report.succeeded, 4);
    assert_eq!(result.exit_status(), ExitStatus::Partial);

    // Slot 1 is [1.2, 2.0): silent, while the clip before it ends inside its own slot
    let slot = &result.track.samples[19_200..32_000];
    assert!(slot.iter().all(|&s| s == 0.0));
    assert!(result.track.samples[..11_200].iter().any(|&s| s != 0.0));
}

#[tokio::test]
async fn test_cancellation_after_first_dispatch() {
    let cancel = CancellationToken::new();
    let translator = PhraseBook::new(&[("Bonjour", "Hola"), ("Au revoir", "Adiós")])
        .cancelling_on("Bonjour", cancel.clone());
    let voice = ToneVoice::new(&[("Hola", 1.5), ("Adiós", 1.0)]);

    let job = job(vec![
        Segment::new(0, 0.0, 2.0, "Bonjour"),
        Segment::new(1, 2.0, 4.0, "Au revoir"),
    ]);
    let result = assert_ok!(orchestrator(translator, voice, 1.3, 1).run(&job, cancel).await);

    assert_eq!(result.report.outcome(0), Some(&SegmentOutcome::Success));
    assert_eq!(result.report.outcome(1), Some(&SegmentOutcome::Cancelled));
    assert_eq!(result.report.cancelled, 1);
    assert_eq!(result.track.len(), 4 * RATE as usize);
    assert!(result.track.samples[32_000..].iter().all(|&s| s == 0.0));
}

#[tokio::test]
async fn test_overrun_beyond_tolerance_extends_final_track() {
    let translator = PhraseBook::new(&[("Bonjour", "Hola"), ("Au revoir", "Hasta luego")]);
    let voice = ToneVoice::new(&[("Hola", 1.5), ("Hasta luego", 3.0)]);
    let job = job(vec![
        Segment::new(0, 0.0, 2.0, "Bonjour"),
        Segment::new(1, 2.0, 4.0, "Au revoir"),
    ]);

    let result = run(&orchestrator(translator, voice, 1.3, 2), &job).await;

    let first = &result.report.segments[0];
    assert_eq!(
        first.alignment,
        Some(Alignment::Padded { speech_secs: 1.5, padding_secs: 0.5 })
    );
    assert!(result.track.samples[24_000..32_000].iter().all(|&s| s == 0.0));

    let second = &result.report.segments[1];
    assert_eq!(second.slot_overrun_secs, Some(1.0));
    assert_eq!(result.report.exit_status(), ExitStatus::Success);
    assert_eq!(result.track.len(), 5 * RATE as usize);
}

#[tokio::test]
async fn test_overrun_within_tolerance_is_compressed_to_slot() {
    let translator = PhraseBook::new(&[("Bonjour", "Hola"), ("Au revoir", "Hasta luego")]);
    let voice = ToneVoice::new(&[("Hola", 1.5), ("Hasta luego", 3.0)]);
    let job = job(vec![
        Segment::new(0, 0.0, 2.0, "Bonjour"),
        Segment::new(1, 2.0, 4.0, "Au revoir"),
    ]);

    let result = run(&orchestrator(translator, voice, 1.6, 2), &job).await;

    assert!(matches!(
        result.report.segments[1].alignment,
        Some(Alignment::Compressed { ratio }) if (ratio - 1.5).abs() < 1e-9
    ));
    assert_eq!(result.report.slot_overruns, 0);
    assert_eq!(result.track.len(), 4 * RATE as usize);
}

#[tokio::test]
async fn test_duplicate_segment_index_is_rejected() {
    let (translator, voice) = subtitle_engines();
    let job = job(vec![
        Segment::new(0, 0.0, 2.0, "Bonjour"),
        Segment::new(0, 1.0, 3.0, "Comment ça va"),
    ]);
    let result = orchestrator(translator, voice, 1.3, 2)
        .run(&job, CancellationToken::new())
        .await;
    assert!(matches!(assert_err!(result), RedubError::InvalidSegments(_)));
}
