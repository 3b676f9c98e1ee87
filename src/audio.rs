use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::io::Cursor;
use std::path::Path;

use crate::error::{Result, RedubError};

/// Convert a timestamp to a sample offset at `sample_rate`.
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64).round().max(0.0) as usize
}

/// Number of samples in the slot `[start, end)`. Both edges are rounded
/// independently so adjacent slots tile without gaps.
pub fn slot_samples(start: f64, end: f64, sample_rate: u32) -> usize {
    seconds_to_samples(end, sample_rate).saturating_sub(seconds_to_samples(start, sample_rate))
}

/// Mono PCM audio with samples in `-1.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn silence(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Decode a WAV byte stream, down-mixing to mono.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        Ok(Self::new(samples, spec.sample_rate))
    }

    /// Encode as 16-bit PCM mono WAV.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 2));
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    pub async fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_wav_bytes()?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    /// Convert to `target_rate`. The result holds exactly the number of
    /// samples the original duration maps to at the new rate.
    pub fn resample(self, target_rate: u32) -> Result<Self> {
        if self.sample_rate == target_rate {
            return Ok(self);
        }
        if self.sample_rate == 0 || target_rate == 0 {
            return Err(RedubError::Alignment(format!(
                "cannot resample from {} Hz to {} Hz",
                self.sample_rate, target_rate
            )));
        }
        let target_len = (self.samples.len() as f64 * target_rate as f64 / self.sample_rate as f64).round() as usize;
        let samples = stretch_samples(&self.samples, target_len)?;
        Ok(Self::new(samples, target_rate))
    }

    /// Uniformly rescale the time axis so the clip is exactly `target_len`
    /// samples long at the same sample rate.
    pub fn time_compress(self, target_len: usize) -> Result<Self> {
        let samples = stretch_samples(&self.samples, target_len)?;
        Ok(Self::new(samples, self.sample_rate))
    }

    /// Append silence up to `len` samples. Longer buffers are left as is.
    pub fn pad_to(mut self, len: usize) -> Self {
        if self.samples.len() < len {
            self.samples.resize(len, 0.0);
        }
        self
    }
}

/// Polynomial-interpolated resampling of a whole clip to `target_len`
/// samples, trimmed or zero-padded to the exact length.
fn stretch_samples(input: &[f32], target_len: usize) -> Result<Vec<f32>> {
    if target_len == 0 {
        return Ok(Vec::new());
    }
    if input.is_empty() {
        return Ok(vec![0.0; target_len]);
    }
    if input.len() == target_len {
        return Ok(input.to_vec());
    }

    let ratio = target_len as f64 / input.len() as f64;
    let mut resampler = FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, input.len(), 1)
        .map_err(|e| RedubError::Alignment(format!("resampler init failed: {}", e)))?;
    let delay = resampler.output_delay();

    let mut out = resampler
        .process(&[input], None)
        .map_err(|e| RedubError::Alignment(format!("resampling failed: {}", e)))?
        .remove(0);
    // Flush the interpolator's delay line
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| RedubError::Alignment(format!("resampling failed: {}", e)))?;
    if let Some(channel) = tail.into_iter().next() {
        out.extend(channel);
    }

    let mut out: Vec<f32> = out.into_iter().skip(delay).collect();
    out.resize(target_len, 0.0);
    Ok(out)
}
