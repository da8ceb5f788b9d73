//! Leading/trailing silence trimming.
//!
//! Frames are scored by RMS energy relative to the loudest frame in the clip,
//! so the threshold adapts to the recording level.

use std::ops::Range;

/// Power floor used when converting to decibels.
const AMIN: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimConfig {
    /// Frames quieter than `top_db` below the loudest frame count as silence.
    pub top_db: f32,
    pub frame_length: usize,
    pub hop_length: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            top_db: 20.0,
            frame_length: 2048,
            hop_length: 512,
        }
    }
}

/// Sample range that survives trimming.
///
/// Frames are centred on multiples of `hop_length` with zero padding at the
/// edges. The range starts at the first loud frame and ends after the last
/// loud frame, clamped to the signal.
///
/// Returns an empty range when no frame's mean-square power exceeds `AMIN`
/// (1e-10, about -100 dBFS). That covers all-zero input and near-silent input
/// such as dither or a disconnected microphone, which librosa would keep whole.
pub fn trim_silence(samples: &[f32], config: &TrimConfig) -> Range<usize> {
    let hop = config.hop_length.max(1);
    let frame_length = config.frame_length.max(1);
    if samples.is_empty() {
        return 0..0;
    }

    let power = frame_power(samples, frame_length, hop);
    let peak = power.iter().copied().fold(0.0f64, f64::max);
    if peak <= AMIN {
        return 0..0;
    }

    let ref_db = 10.0 * peak.log10();
    let threshold = -(config.top_db as f64);
    let loud = |p: &f64| 10.0 * p.max(AMIN).log10() - ref_db > threshold;

    let first = power.iter().position(loud);
    let last = power.iter().rposition(loud);
    match (first, last) {
        (Some(first), Some(last)) => {
            let start = (first * hop).min(samples.len());
            let end = ((last + 1) * hop).min(samples.len());
            start..end.max(start)
        }
        _ => 0..0,
    }
}

/// Mean-square energy of each centred frame.
fn frame_power(samples: &[f32], frame_length: usize, hop: usize) -> Vec<f64> {
    let pad = frame_length / 2;
    let padded_len = samples.len() + 2 * pad;
    let n_frames = if padded_len >= frame_length {
        1 + (padded_len - frame_length) / hop
    } else {
        0
    };

    // Prefix sums of squares over the zero-padded signal.
    let mut prefix = Vec::with_capacity(padded_len + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for i in 0..padded_len {
        let sample = if i >= pad && i < pad + samples.len() {
            samples[i - pad] as f64
        } else {
            0.0
        };
        acc += sample * sample;
        prefix.push(acc);
    }

    (0..n_frames)
        .map(|t| {
            let start = t * hop;
            let end = start + frame_length;
            (prefix[end] - prefix[start]) / frame_length as f64
        })
        .collect()
}
