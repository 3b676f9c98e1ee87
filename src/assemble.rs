//! Building the full-length dubbed track from per-segment contributions.

use tracing::debug;

use crate::align::AlignedClip;
use crate::audio::{seconds_to_samples, AudioBuffer};
use crate::config::AssemblyConfig;

/// What one segment adds to the track.
#[derive(Debug, Clone)]
pub enum Contribution {
    Clip(AlignedClip),
    /// Placeholder for a failed or cancelled segment
    Silence { index: usize, start: f64, end: f64 },
}

impl Contribution {
    pub fn index(&self) -> usize {
        match self {
            Self::Clip(clip) => clip.index,
            Self::Silence { index, .. } => *index,
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Self::Clip(clip) => clip.start,
            Self::Silence { start, .. } => *start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Self::Clip(clip) => clip.end,
            Self::Silence { end, .. } => *end,
        }
    }
}

/// Sample range a clip occupies after resolving overlap with its successor.
struct Placement<'a> {
    offset: usize,
    samples: &'a [f32],
    /// Start of the fade-out window and its length, if the clip runs into
    /// the next speaking segment
    fade: Option<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct AudioAssembler {
    sample_rate: u32,
    crossfade_samples: usize,
}

impl AudioAssembler {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            crossfade_samples: (config.sample_rate as u64 * config.crossfade_ms as u64 / 1000) as usize,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mix contributions, given in index order, into one track spanning
    /// `[0, max(end))`, extended only if the last speaking clip overruns.
    ///
    /// A clip reaching past the start of the next speaking segment is faded
    /// out over the crossfade window starting at that segment's start and
    /// cut after it. The later clip is never altered.
    pub fn assemble(&self, contributions: &[Contribution]) -> AudioBuffer {
        debug_assert!(contributions.windows(2).all(|w| w[0].index() < w[1].index()));

        let clips: Vec<&AlignedClip> = contributions
            .iter()
            .filter_map(|c| match c {
                Contribution::Clip(clip) => Some(clip),
                Contribution::Silence { .. } => None,
            })
            .collect();

        let placements: Vec<Placement> = clips
            .iter()
            .enumerate()
            .map(|(i, clip)| {
                let offset = seconds_to_samples(clip.start, self.sample_rate);
                let clip_end = offset + clip.audio.len();
                let next_start = clips
                    .get(i + 1)
                    .map(|next| seconds_to_samples(next.start, self.sample_rate));

                match next_start {
                    Some(next_start) if clip_end > next_start => {
                        let cut = clip_end.min(next_start + self.crossfade_samples);
                        debug!(
                            segment = clip.index,
                            overlap_samples = clip_end - next_start,
                            "Fading clip into next segment"
                        );
                        Placement {
                            offset,
                            samples: &clip.audio.samples[..cut - offset],
                            fade: Some((next_start, self.crossfade_samples)),
                        }
                    }
                    _ => Placement {
                        offset,
                        samples: &clip.audio.samples,
                        fade: None,
                    },
                }
            })
            .collect();

        let nominal_end = contributions
            .iter()
            .map(|c| seconds_to_samples(c.end(), self.sample_rate))
            .max()
            .unwrap_or(0);
        let furthest = placements
            .iter()
            .map(|p| p.offset + p.samples.len())
            .max()
            .unwrap_or(0);

        let mut track = vec![0.0f32; nominal_end.max(furthest)];

        for placement in &placements {
            for (k, &sample) in placement.samples.iter().enumerate() {
                let position = placement.offset + k;
                let gain = match placement.fade {
                    Some((fade_start, window)) if position >= fade_start => {
                        1.0 - (position - fade_start) as f32 / window.max(1) as f32
                    }
                    _ => 1.0,
                };
                track[position] += sample * gain;
            }
        }

        for sample in &mut track {
            *sample = sample.clamp(-1.0, 1.0);
        }

        AudioBuffer::new(track, self.sample_rate)
    }
}
