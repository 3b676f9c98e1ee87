use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::align::Alignment;
use crate::audio::AudioBuffer;
use crate::error::Result;
use crate::segment::{Segment, TranslatedSegment};

/// Final status of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentOutcome {
    Success,
    TranslationFailed { reason: String },
    SynthesisFailed { reason: String },
    AlignmentFailed { reason: String },
    /// The worker died before reporting a stage result
    WorkerFailed { reason: String },
    Cancelled,
}

impl SegmentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::TranslationFailed { .. }
                | Self::SynthesisFailed { .. }
                | Self::AlignmentFailed { .. }
                | Self::WorkerFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub source_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_text: Option<String>,
    #[serde(flatten)]
    pub outcome: SegmentOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    /// Set when the clip runs past its slot end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_overrun_secs: Option<f64>,
}

impl SegmentReport {
    pub fn new(segment: &Segment, outcome: SegmentOutcome) -> Self {
        Self {
            index: segment.index,
            start: segment.start,
            end: segment.end,
            source_text: segment.source_text.clone(),
            target_text: None,
            outcome,
            alignment: None,
            slot_overrun_secs: None,
        }
    }
}

/// Exit classes for a job that produced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every segment was dubbed
    Success,
    /// Output produced, but some segments failed or were cancelled
    Partial,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub source_lang: String,
    pub target_lang: String,
    pub voice: String,
    pub route: String,
    pub sample_rate: u32,
    pub track_duration_secs: f64,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub slot_overruns: usize,
    pub segments: Vec<SegmentReport>,
}

impl JobReport {
    pub fn exit_status(&self) -> ExitStatus {
        if self.failed == 0 && self.cancelled == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Partial
        }
    }

    pub fn outcome(&self, index: usize) -> Option<&SegmentOutcome> {
        self.segments.iter().find(|s| s.index == index).map(|s| &s.outcome)
    }

    /// Translated segments, for writing subtitles.
    pub fn translated_segments(&self) -> Vec<TranslatedSegment> {
        self.segments
            .iter()
            .filter_map(|s| {
                s.target_text.as_ref().map(|text| TranslatedSegment {
                    segment: Segment::new(s.index, s.start, s.end, s.source_text.clone()),
                    target_text: text.clone(),
                })
            })
            .collect()
    }

    pub async fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// Assembled track plus the per-segment report.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub track: AudioBuffer,
    pub report: JobReport,
}

impl JobResult {
    pub fn exit_status(&self) -> ExitStatus {
        self.report.exit_status()
    }
}
