//! Fitting synthesized speech into fixed subtitle slots.
//!
//! Clips shorter than their slot are padded with trailing silence, clips
//! slightly longer are time-compressed to the exact slot length, and clips
//! far beyond the slot keep their natural length and are flagged as slot
//! overruns for the assembler to resolve.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::{slot_samples, AudioBuffer};
use crate::config::AlignConfig;
use crate::error::{Result, RedubError};
use crate::segment::TranslatedSegment;

/// Synthesized audio for one translated segment, at the engine's own rate.
#[derive(Debug, Clone)]
pub struct SynthesizedClip {
    pub translated: TranslatedSegment,
    pub audio: AudioBuffer,
}

impl SynthesizedClip {
    pub fn natural_duration(&self) -> f64 {
        self.audio.duration_secs()
    }
}

/// How a clip was fitted into its slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alignment {
    /// Natural length kept, silence appended up to the slot end
    Padded { speech_secs: f64, padding_secs: f64 },
    /// Time-compressed by `ratio` to exactly the slot length
    Compressed { ratio: f64 },
    /// Longer than the slot even after any compression
    Overrun { ratio: f64, overrun_secs: f64 },
}

/// A clip ready for placement at `start`.
#[derive(Debug, Clone)]
pub struct AlignedClip {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub audio: AudioBuffer,
    pub alignment: Alignment,
}

impl AlignedClip {
    /// Seconds the clip runs past its own slot end, if it does.
    pub fn slot_overrun(&self) -> Option<f64> {
        match self.alignment {
            Alignment::Overrun { overrun_secs, .. } => Some(overrun_secs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeAligner {
    max_compression_ratio: f64,
    compress_overruns: bool,
    sample_rate: u32,
}

impl TimeAligner {
    pub fn new(config: &AlignConfig, sample_rate: u32) -> Self {
        Self {
            max_compression_ratio: config.max_compression_ratio.max(1.0),
            compress_overruns: config.compress_overruns,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn align(&self, clip: SynthesizedClip) -> Result<AlignedClip> {
        let segment = &clip.translated.segment;
        let (index, start, end) = (segment.index, segment.start, segment.end);

        let audio = clip.audio.resample(self.sample_rate)?;
        if audio.is_empty() {
            return Err(RedubError::Alignment(format!("segment {} produced no audio", index)));
        }

        let rate = self.sample_rate as f64;
        let slot = slot_samples(start, end, self.sample_rate);
        let natural = audio.len();

        let (audio, alignment) = if natural <= slot {
            let alignment = Alignment::Padded {
                speech_secs: natural as f64 / rate,
                padding_secs: (slot - natural) as f64 / rate,
            };
            (audio.pad_to(slot), alignment)
        } else {
            let ratio = if slot == 0 { f64::INFINITY } else { natural as f64 / slot as f64 };

            if ratio <= self.max_compression_ratio {
                (audio.time_compress(slot)?, Alignment::Compressed { ratio })
            } else {
                let audio = if self.compress_overruns {
                    let target = (natural as f64 / self.max_compression_ratio).ceil() as usize;
                    audio.time_compress(target.max(slot))?
                } else {
                    audio
                };
                let overrun_secs = (audio.len() - slot) as f64 / rate;
                (audio, Alignment::Overrun { ratio, overrun_secs })
            }
        };

        debug!(segment = index, ?alignment, "Aligned clip");

        Ok(AlignedClip {
            index,
            start,
            end,
            audio,
            alignment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;

    const RATE: u32 = 8000;

    fn clip(start: f64, end: f64, speech_secs: f64, rate: u32) -> SynthesizedClip {
        let len = (speech_secs * rate as f64).round() as usize;
        SynthesizedClip {
            translated: TranslatedSegment {
                segment: Segment::new(0, start, end, "Bonjour"),
                target_text: "Hola".to_string(),
            },
            audio: AudioBuffer::new(vec![0.5; len], rate),
        }
    }

    fn aligner(ratio: f64, compress_overruns: bool) -> TimeAligner {
        TimeAligner::new(
            &AlignConfig {
                max_compression_ratio: ratio,
                compress_overruns,
            },
            RATE,
        )
    }

    #[test]
    fn test_short_clip_is_padded_after_speech() {
        let aligned = aligner(1.3, false).align(clip(0.0, 2.0, 1.5, RATE)).unwrap();
        assert_eq!(aligned.audio.len(), 2 * RATE as usize);
        // Speech onset at slot start, silence only at the tail
        assert_eq!(aligned.audio.samples[0], 0.5);
        assert_eq!(aligned.audio.samples[11_999], 0.5);
        assert!(aligned.audio.samples[12_000..].iter().all(|&s| s == 0.0));
        assert_eq!(
            aligned.alignment,
            Alignment::Padded { speech_secs: 1.5, padding_secs: 0.5 }
        );
    }

    #[test]
    fn test_clip_within_tolerance_is_compressed_to_slot() {
        let aligned = aligner(1.3, false).align(clip(2.0, 4.0, 2.5, RATE)).unwrap();
        assert_eq!(aligned.audio.len(), 2 * RATE as usize);
        assert!(matches!(aligned.alignment, Alignment::Compressed { ratio } if (ratio - 1.25).abs() < 1e-9));
        assert!(aligned.slot_overrun().is_none());
    }

    #[test]
    fn test_ratio_equal_to_tolerance_is_compressed() {
        // 2.6s into a 2.0s slot is exactly 1.3x
        let aligned = aligner(1.3, false).align(clip(2.0, 4.0, 2.6, RATE)).unwrap();
        assert_eq!(aligned.audio.len(), 2 * RATE as usize);
        assert!(matches!(aligned.alignment, Alignment::Compressed { ratio } if ratio == 1.3));
        assert!(aligned.slot_overrun().is_none());
    }

    #[test]
    fn test_clip_beyond_tolerance_overruns_at_natural_length() {
        let aligned = aligner(1.3, false).align(clip(2.0, 4.0, 3.0, RATE)).unwrap();
        assert_eq!(aligned.audio.len(), 3 * RATE as usize);
        assert_eq!(aligned.slot_overrun(), Some(1.0));
    }

    #[test]
    fn test_overrun_compression_shortens_but_keeps_overrun() {
        let aligned = aligner(1.25, true).align(clip(0.0, 2.0, 3.0, RATE)).unwrap();
        assert_eq!(aligned.audio.len(), 19_200);
        assert_eq!(aligned.slot_overrun(), Some(0.4));
    }

    #[test]
    fn test_clip_is_resampled_to_output_rate() {
        let aligned = aligner(1.3, false).align(clip(0.0, 1.0, 0.5, 16_000)).unwrap();
        assert_eq!(aligned.audio.sample_rate, RATE);
        assert_eq!(aligned.audio.len(), RATE as usize);
    }

    #[test]
    fn test_empty_audio_is_an_alignment_error() {
        let result = aligner(1.3, false).align(clip(0.0, 1.0, 0.0, RATE));
        assert!(matches!(result, Err(RedubError::Alignment(_))));
    }
}
