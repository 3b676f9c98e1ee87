use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, RedubError};
use crate::segment::{index_segments, Segment, TranslatedSegment};

/// Parse SRT content into ordered segments. Cues without text are skipped.
pub fn parse_srt(content: &str) -> Result<Vec<Segment>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut cues = Vec::new();

    for (block_no, block) in content.split("\n\n").enumerate() {
        let lines: Vec<&str> = block.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            continue;
        }

        let timing_pos = lines.iter().position(|l| l.contains("-->")).ok_or_else(|| {
            RedubError::InvalidSegments(format!("cue {} has no timing line", block_no + 1))
        })?;
        let (start, end) = parse_timing_line(lines[timing_pos]).ok_or_else(|| {
            RedubError::InvalidSegments(format!(
                "cue {} has a malformed timing line: {}",
                block_no + 1,
                lines[timing_pos]
            ))
        })?;
        if start >= end {
            return Err(RedubError::InvalidSegments(format!(
                "cue {} starts at {} but ends at {}",
                block_no + 1,
                start,
                end
            )));
        }

        let text = lines[timing_pos + 1..]
            .iter()
            .map(|l| strip_markup(l))
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        cues.push((start, end, text.to_string()));
    }

    cues.sort_by(|a, b| a.0.total_cmp(&b.0));
    index_segments(cues)
}

fn parse_timing_line(line: &str) -> Option<(f64, f64)> {
    let (from, to) = line.split_once("-->")?;
    // Position hints may follow the end time
    let to = to.split_whitespace().next()?;
    Some((parse_srt_time(from.trim())?, parse_srt_time(to)?))
}

/// Parse `HH:MM:SS,mmm` (or `.mmm`) into seconds. The fraction may have one
/// to three digits and is read as a decimal fraction of a second.
fn parse_srt_time(value: &str) -> Option<f64> {
    let (clock, fraction) = value.split_once([',', '.']).unwrap_or((value, "0"));
    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (parse_digits(h)?, parse_digits(m)?, parse_digits(s)?),
        [m, s] => (0, parse_digits(m)?, parse_digits(s)?),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 || fraction.len() > 3 {
        return None;
    }

    let fraction_millis = parse_digits(fraction)? * 10u64.pow(3 - fraction.len() as u32);
    let whole_seconds = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60)?
        .checked_add(seconds)?;
    let total_millis = whole_seconds.checked_mul(1000)?.checked_add(fraction_millis)?;
    Some(total_millis as f64 / 1000.0)
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Write translated segments as an SRT file using the original timings.
pub async fn write_srt<P: AsRef<Path>>(segments: &[TranslatedSegment], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing translated subtitles: {}", output_path.display());

    let mut srt_content = String::new();

    for (position, translated) in segments.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            position + 1,
            format_srt_time(translated.segment.start),
            format_srt_time(translated.segment.end),
            translated.target_text.trim()
        ));
    }

    fs::write(output_path, srt_content).await?;
    Ok(())
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:02,000\nBonjour\n\n\
                          2\n00:00:02,000 --> 00:00:04,500\n<i>Au revoir</i>\nmes amis\n\n\
                          3\n00:00:05,000 --> 00:00:06,000\n\n";

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
    }

    #[test]
    fn test_parse_srt_time_variants() {
        assert_eq!(parse_srt_time("00:01:05,250"), Some(65.25));
        assert_eq!(parse_srt_time("01:05.500"), Some(65.5));
        assert_eq!(parse_srt_time("garbage"), None);
    }

    #[test]
    fn test_parse_srt_time_scales_short_fractions() {
        assert_eq!(parse_srt_time("00:00:01,5"), Some(1.5));
        assert_eq!(parse_srt_time("01:05.5"), Some(65.5));
        assert_eq!(parse_srt_time("00:00:01,05"), Some(1.05));
        assert_eq!(parse_srt_time("00:00:01,0500"), None);
    }

    #[test]
    fn test_parse_srt_time_rejects_out_of_range_fields() {
        assert_eq!(parse_srt_time("00:99:99,000"), None);
        assert_eq!(parse_srt_time("00:00:60,000"), None);
        assert_eq!(parse_srt_time("-1:00:00,000"), None);
        assert_eq!(parse_srt_time("99999999999999999999:00:00,000"), None);
        assert_eq!(parse_srt_time("9999999999999999:00:00,000"), None);
    }

    #[test]
    fn test_oversized_hours_are_an_invalid_cue() {
        let bad = "1\n9999999999999999:00:00,000 --> 9999999999999999:00:01,000\nHola\n";
        assert!(matches!(parse_srt(bad), Err(RedubError::InvalidSegments(_))));
    }

    #[test]
    fn test_parse_srt_joins_lines_and_strips_markup() {
        let segments = parse_srt(SAMPLE).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].source_text, "Bonjour");
        assert_eq!(segments[1].source_text, "Au revoir mes amis");
        assert_eq!(segments[1].index, 1);
        assert_eq!(segments[1].end, 4.5);
    }

    #[test]
    fn test_parse_srt_rejects_inverted_cue() {
        let bad = "1\n00:00:03,000 --> 00:00:01,000\nHola\n";
        assert!(matches!(parse_srt(bad), Err(RedubError::InvalidSegments(_))));
    }

    #[tokio::test]
    async fn test_write_srt_uses_original_timings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.srt");
        let segments = vec![TranslatedSegment {
            segment: Segment::new(0, 1.25, 2.0, "Bonjour"),
            target_text: "Hola".to_string(),
        }];
        write_srt(&segments, &path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "1\n00:00:01,250 --> 00:00:02,000\nHola\n\n");
    }
}
