//! Reduction of a composite waveform to a fixed number of points for plotting.
//!
//! The kept points are chosen by index, uniformly over the whole sequence, so the first and the
//! last sample always survive. Index arithmetic is integer-only: `i * (n - 1) / (k - 1)` is
//! exact for every `n` and `k` and the result is strictly increasing whenever `k <= n`.

use crate::error::SynthError;
use crate::protocol::ProtocolTree;
use crate::synthesizer::{Synthesizer, Waveform};

/// Indices of `k` points spread uniformly over `0..n`.
///
/// - `n == 0` or `k == 0` gives no index;
/// - `k == 1` gives the first index only;
/// - `k >= n` is allowed and repeats indices, so the output length is always `k` for `n > 0`.
///
/// ```
/// # use stimcompiler_backend::preview::sample_indices;
/// assert_eq!(sample_indices(10, 4), vec![0, 3, 6, 9]);
/// assert_eq!(sample_indices(3, 5), vec![0, 0, 1, 1, 2]);
/// assert!(sample_indices(0, 5).is_empty());
/// ```
pub fn sample_indices(n: usize, k: usize) -> Vec<usize> {
    match (n, k) {
        (0, _) | (_, 0) => Vec::new(),
        (_, 1) => vec![0],
        _ => {
            let last = (n - 1) as u128;
            let denom = (k - 1) as u128;
            (0..k as u128)
                .map(|i| (i * last / denom) as usize)
                .collect()
        }
    }
}

/// Keeps `k` points of `(times, amplitudes)`, see [`sample_indices`].
///
/// # Panics
/// If `times` and `amplitudes` differ in length.
pub fn downsample(times: &[f64], amplitudes: &[f64], k: usize) -> (Vec<f64>, Vec<f64>) {
    assert_eq!(
        times.len(),
        amplitudes.len(),
        "Cannot downsample {} time points with {} amplitudes",
        times.len(),
        amplitudes.len()
    );
    sample_indices(times.len(), k)
        .into_iter()
        .map(|i| (times[i], amplitudes[i]))
        .unzip()
}

impl Waveform {
    /// Reduced copy of the waveform with `k` points.
    pub fn downsample(&self, k: usize) -> Waveform {
        let (times, amplitudes) = downsample(self.times(), self.amplitudes(), k);
        Waveform::new(times, amplitudes)
    }

    /// Start and end time of the waveform, `None` when empty.
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((*self.times().first()?, *self.times().last()?))
    }
}

impl Synthesizer {
    /// Synthesizes `tree` and reduces the result to [`preview_points`] points.
    ///
    /// [`preview_points`]: crate::SynthConfig::preview_points
    pub fn preview(&self, tree: &ProtocolTree) -> Result<Waveform, SynthError> {
        let full = self.synthesize(tree)?;
        let preview = full.downsample(self.config().preview_points);
        log::trace!(
            "preview reduced {} samples to {}",
            full.len(),
            preview.len()
        );
        Ok(preview)
    }
}
