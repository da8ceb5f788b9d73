//! Sample-rate conversion using rubato
//!
//! Uploads arrive at whatever rate the user's recorder produced; the model
//! wants a single fixed rate.

use anyhow::{Context, Result};
use rubato::{
    audioadapter::Adapter, Async, FixedAsync, PolynomialDegree, Resampler as RubatoResampler,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::Waveform;

const CHUNK_SIZE: usize = 1024;

/// Resampling quality preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ResampleQuality {
    /// Cubic polynomial interpolation
    Fast,
    /// Sinc interpolation, 128 taps
    #[default]
    Normal,
    /// Sinc interpolation, 256 taps
    High,
}

/// Audio resampler
#[derive(Debug, Clone, Copy, Default)]
pub struct Resampler {
    quality: ResampleQuality,
}

impl Resampler {
    pub fn new(quality: ResampleQuality) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> ResampleQuality {
        self.quality
    }

    /// Resample a waveform to `target_rate`.
    ///
    /// The output holds exactly `ceil(len * target_rate / source_rate)` samples,
    /// with the resampler's group delay removed.
    pub fn resample(&self, audio: &Waveform, target_rate: u32) -> Result<Waveform> {
        if audio.sample_rate == target_rate {
            return Ok(audio.clone());
        }
        anyhow::ensure!(audio.sample_rate > 0, "Source sample rate must be > 0");
        anyhow::ensure!(target_rate > 0, "Target sample rate must be > 0");

        let ratio = target_rate as f64 / audio.sample_rate as f64;
        let expected = (audio.len() as f64 * ratio).ceil() as usize;
        if audio.is_empty() {
            return Ok(Waveform::new(Vec::new(), target_rate));
        }

        let samples = match self.quality {
            ResampleQuality::Fast => {
                let mut resampler = Async::<f32>::new_poly(
                    ratio,
                    1.0,
                    PolynomialDegree::Cubic,
                    CHUNK_SIZE,
                    1,
                    FixedAsync::Input,
                )
                .context("Failed to create polynomial resampler")?;
                run_chunks(&mut resampler, &audio.samples, expected)?
            }
            ResampleQuality::Normal | ResampleQuality::High => {
                let taps = if self.quality == ResampleQuality::High {
                    256
                } else {
                    128
                };
                let params = SincInterpolationParameters {
                    sinc_len: taps,
                    f_cutoff: 0.95,
                    interpolation: SincInterpolationType::Linear,
                    oversampling_factor: taps,
                    window: WindowFunction::BlackmanHarris2,
                };
                let mut resampler = Async::<f32>::new_sinc(
                    ratio,
                    1.0,
                    &params,
                    CHUNK_SIZE,
                    1,
                    FixedAsync::Input,
                )
                .context("Failed to create sinc resampler")?;
                run_chunks(&mut resampler, &audio.samples, expected)?
            }
        };

        Ok(Waveform::new(samples, target_rate))
    }
}

/// Feed `samples` through the resampler in fixed-size chunks, padding with
/// silence until the delayed tail has been flushed.
fn run_chunks<R: RubatoResampler<f32>>(
    resampler: &mut R,
    samples: &[f32],
    expected: usize,
) -> Result<Vec<f32>> {
    use audioadapter_buffers::direct::SequentialSliceOfVecs;

    let delay = resampler.output_delay();
    let wanted = expected + delay;
    let mut output = Vec::with_capacity(wanted);
    let mut pos = 0;

    while output.len() < wanted {
        let mut chunk = vec![0.0f32; CHUNK_SIZE];
        if pos < samples.len() {
            let end = (pos + CHUNK_SIZE).min(samples.len());
            chunk[..end - pos].copy_from_slice(&samples[pos..end]);
        }
        pos += CHUNK_SIZE;

        let input_vecs = vec![chunk];
        let input = SequentialSliceOfVecs::new(&input_vecs, 1, CHUNK_SIZE)
            .context("Failed to create input adapter")?;
        let result = resampler
            .process(&input, 0, None)
            .context("Resampling failed")?;

        for i in 0..result.frames() {
            output.push(result.read_sample(0, i).unwrap_or(0.0));
        }
    }

    output.truncate(wanted);
    output.drain(..delay.min(output.len()));
    Ok(output)
}

/// Resample with the default (normal quality) resampler.
pub fn resample(audio: &Waveform, target_rate: u32) -> Result<Waveform> {
    Resampler::default().resample(audio, target_rate)
}
