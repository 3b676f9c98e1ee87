use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, RedubError};
use crate::subtitle::parse_srt;

/// One timed unit of source-language text occupying the slot `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub source_text: String,
}

impl Segment {
    pub fn new<S: Into<String>>(index: usize, start: f64, end: f64, source_text: S) -> Self {
        Self {
            index,
            start,
            end,
            source_text: source_text.into(),
        }
    }

    pub fn slot_duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A segment together with its translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedSegment {
    pub segment: Segment,
    pub target_text: String,
}

/// Cue shape accepted in JSON segment files.
#[derive(Debug, Clone, Deserialize)]
struct JsonCue {
    #[serde(default)]
    index: Option<usize>,
    start: f64,
    end: f64,
    text: String,
}

/// Extensions `load_segments` accepts.
pub const SEGMENT_EXTENSIONS: [&str; 2] = ["srt", "json"];

pub fn is_segment_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SEGMENT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Load segments from an `.srt` or `.json` file, ordered and indexed.
pub async fn load_segments<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RedubError::FileNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let content = fs::read_to_string(path).await?;
    let segments = match extension.as_str() {
        "srt" => parse_srt(&content)?,
        "json" => parse_json_segments(&content)?,
        other => {
            return Err(RedubError::UnsupportedFormat(format!(
                "segment input must be .srt or .json, got '.{}'",
                other
            )));
        }
    };

    info!("Loaded {} segments from {}", segments.len(), path.display());
    Ok(segments)
}

/// Parse a JSON array of cues. Explicit indexes are only used to break ties
/// between cues sharing a start time.
pub fn parse_json_segments(content: &str) -> Result<Vec<Segment>> {
    let mut cues: Vec<JsonCue> = serde_json::from_str(content)?;
    cues.sort_by(|a, b| {
        a.start
            .total_cmp(&b.start)
            .then_with(|| a.index.cmp(&b.index))
    });

    let segments = cues
        .into_iter()
        .filter(|cue| !cue.text.trim().is_empty())
        .map(|cue| (cue.start, cue.end, cue.text.trim().to_string()))
        .collect();
    index_segments(segments)
}

/// Assign ordinal indexes to already ordered `(start, end, text)` triples
/// and check the result.
pub(crate) fn index_segments(cues: Vec<(f64, f64, String)>) -> Result<Vec<Segment>> {
    let segments: Vec<Segment> = cues
        .into_iter()
        .enumerate()
        .map(|(index, (start, end, text))| Segment::new(index, start, end, text))
        .collect();
    validate_segments(&segments)?;
    Ok(segments)
}

/// Check ordering and slot invariants for a job's segment list.
pub fn validate_segments(segments: &[Segment]) -> Result<()> {
    let mut seen = HashSet::with_capacity(segments.len());
    let mut previous: Option<&Segment> = None;

    for segment in segments {
        if !segment.start.is_finite() || !segment.end.is_finite() || segment.start < 0.0 {
            return Err(RedubError::InvalidSegments(format!(
                "segment {} has invalid timestamps {}..{}",
                segment.index, segment.start, segment.end
            )));
        }
        if segment.start >= segment.end {
            return Err(RedubError::InvalidSegments(format!(
                "segment {} starts at {} but ends at {}",
                segment.index, segment.start, segment.end
            )));
        }
        if !seen.insert(segment.index) {
            return Err(RedubError::InvalidSegments(format!(
                "duplicate segment index {}",
                segment.index
            )));
        }
        if let Some(prev) = previous {
            if segment.index < prev.index || segment.start < prev.start {
                return Err(RedubError::InvalidSegments(format!(
                    "segment {} is out of order after segment {}",
                    segment.index, prev.index
                )));
            }
        }
        previous = Some(segment);
    }

    Ok(())
}

/// End of the last slot, i.e. the nominal length of the dubbed track.
pub fn job_end(segments: &[Segment]) -> f64 {
    segments.iter().map(|s| s.end).fold(0.0, f64::max)
}
