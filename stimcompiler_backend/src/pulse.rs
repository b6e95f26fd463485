//! Pulse generators: pure functions from a sampled time axis to the amplitude sequence of one
//! elementary stimulation.
//!
//! The synthesizer only talks to the [`PulseGenerator`] trait, so tests (or another front end)
//! can plug in their own shapes. [`StandardPulseGenerator`] is the implementation used for
//! previews:
//!
//! - `random-square`: `pulses` unit pulses of `width` seconds, one per equal slot of the axis,
//!   each shifted by a uniform random offset in `[-jitter, jitter]` and kept inside the axis.
//!   With `jitter = 0` no randomness is drawn and the output is fully deterministic.
//! - `square`: a periodic 0/1 wave of `frequency` Hz, high for the first `duty` fraction of
//!   every period.
//! - `third` ([`SignalType::Reserved`]): no shape is defined, the output is all zeros.
//!
//! Amplitudes are in `[0, 1]`. Scaling (e.g. the square gain) is the synthesizer's business.

use ndarray::{s, Array1, ArrayView1};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::node::{SignalType, StimParams};

/// Uniformly spaced axis of `nsamps` points covering `[0, duration)`.
///
/// ```
/// # use stimcompiler_backend::pulse::time_axis;
/// let t = time_axis(1.0, 4);
/// assert_eq!(t.to_vec(), vec![0.0, 0.25, 0.5, 0.75]);
/// ```
pub fn time_axis(duration: f64, nsamps: usize) -> Array1<f64> {
    if nsamps == 0 {
        return Array1::zeros(0);
    }
    let step = duration / nsamps as f64;
    Array1::from_shape_fn(nsamps, |i| i as f64 * step)
}

/// Start of the axis, its sample step and the length of time it covers (one step past the
/// last point).
fn axis_span(t_arr: &ArrayView1<f64>) -> Option<(f64, f64, f64)> {
    let first = *t_arr.first()?;
    let last = *t_arr.last()?;
    let step = if t_arr.len() > 1 {
        t_arr[1] - first
    } else {
        0.
    };
    Some((first, step, last - first + step))
}

/// First sample position at or after `t` on a uniform axis, clamped to `0..=len`.
fn position_at(t: f64, t0: f64, step: f64, len: usize) -> usize {
    // Absorbs the rounding of `i * step`
    const TOL: f64 = 1e-9;
    let pos = ((t - t0) / step - TOL).ceil();
    if pos <= 0. {
        0
    } else {
        (pos as usize).min(len)
    }
}

/// Contract of a pulse-shape generator. Every method returns one amplitude per entry of
/// `t_arr`.
pub trait PulseGenerator {
    fn random_square(
        &mut self,
        t_arr: ArrayView1<f64>,
        pulses: u32,
        width: f64,
        jitter: f64,
    ) -> Array1<f64>;

    fn square(&mut self, t_arr: ArrayView1<f64>, frequency: f64, duty: f64) -> Array1<f64>;

    /// Dispatches on `stim.signal_type`. The reserved type yields zeros rather than an error.
    fn make_signal(&mut self, t_arr: ArrayView1<f64>, stim: &StimParams) -> Array1<f64> {
        match stim.signal_type {
            SignalType::RandomSquare => {
                self.random_square(t_arr, stim.pulses, stim.width, stim.jitter)
            }
            SignalType::Square => self.square(t_arr, stim.frequency, stim.duty),
            SignalType::Reserved => {
                log::warn!(
                    "signal type '{}' has no generator, previewing it as a flat zero signal",
                    stim.signal_type
                );
                Array1::zeros(t_arr.len())
            }
        }
    }
}

/// Preview generator. Jitter is drawn from a seeded [`SmallRng`], so two generators built with
/// the same seed produce the same pulse trains.
pub struct StandardPulseGenerator {
    rng: SmallRng,
}

impl StandardPulseGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl PulseGenerator for StandardPulseGenerator {
    /// Expects a uniform axis, as built by [`time_axis`]. Each pulse is written as one slice of
    /// sample positions, so the cost is linear in `pulses` plus the axis length.
    fn random_square(
        &mut self,
        t_arr: ArrayView1<f64>,
        pulses: u32,
        width: f64,
        jitter: f64,
    ) -> Array1<f64> {
        let mut signal = Array1::zeros(t_arr.len());
        let Some((t0, step, span)) = axis_span(&t_arr) else {
            return signal;
        };
        let width = width.min(span);
        if pulses == 0 || width <= 0. || step <= 0. {
            return signal;
        }
        // Any larger offset is clamped back onto the axis
        let jitter = jitter.min(span);

        let slot = span / pulses as f64;
        let latest = (t0 + span - width).max(t0);
        let len = signal.len();
        for k in 0..pulses {
            let offset = if jitter > 0. {
                self.rng.random_range(-jitter..=jitter)
            } else {
                0.
            };
            // Keep the whole pulse on the axis
            let start = (t0 + k as f64 * slot + offset).clamp(t0, latest);
            let start_pos = position_at(start, t0, step, len);
            let end_pos = position_at(start + width, t0, step, len).max(start_pos);
            signal.slice_mut(s![start_pos..end_pos]).fill(1.);
        }
        signal
    }

    fn square(&mut self, t_arr: ArrayView1<f64>, frequency: f64, duty: f64) -> Array1<f64> {
        if frequency <= 0. {
            return Array1::zeros(t_arr.len());
        }
        t_arr.mapv(|t| {
            if (t * frequency).rem_euclid(1.) < duty {
                1.
            } else {
                0.
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rising_edges(signal: &Array1<f64>) -> usize {
        let first = usize::from(signal.first().copied() == Some(1.));
        first
            + signal
                .windows(2)
                .into_iter()
                .filter(|w| w[0] == 0. && w[1] == 1.)
                .count()
    }

    fn high_count(signal: &Array1<f64>) -> usize {
        signal.iter().filter(|&&y| y == 1.).count()
    }

    mod random_square {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn places_every_pulse_without_jitter() {
            let t = time_axis(1., 300);
            let mut gen = StandardPulseGenerator::new(0);
            let signal = gen.random_square(t.view(), 3, 0.1, 0.);
            assert_eq!(signal.len(), 300);
            assert_eq!(rising_edges(&signal), 3);
            // Pulses start at 0, 1/3 and 2/3 s, each 30 samples wide
            assert_eq!(signal[0], 1.);
            assert_eq!(signal[29], 1.);
            assert_eq!(signal[30], 0.);
            assert_eq!(signal[99], 0.);
            assert_eq!(signal[100], 1.);
            assert_eq!(signal[129], 1.);
            assert_eq!(signal[130], 0.);
            assert_eq!(signal[200], 1.);
            assert_eq!(high_count(&signal), 90);
        }

        #[test]
        fn long_train_at_one_hertz() {
            // One hour at 300 samples/s, one 50 ms pulse per second
            let t = time_axis(3600., 1_080_000);
            let signal = StandardPulseGenerator::new(0).random_square(t.view(), 3600, 0.05, 0.);
            assert_eq!(signal.len(), 1_080_000);
            assert_eq!(rising_edges(&signal), 3600);
            assert_eq!(high_count(&signal), 3600 * 15);
            assert_eq!(signal[300 * 1800], 1.);
            assert_eq!(signal[300 * 1800 + 15], 0.);
        }

        #[test]
        fn zero_jitter_ignores_seed() {
            let t = time_axis(2., 600);
            let a = StandardPulseGenerator::new(1).random_square(t.view(), 5, 0.05, 0.);
            let b = StandardPulseGenerator::new(2).random_square(t.view(), 5, 0.05, 0.);
            assert_eq!(a, b);
        }

        #[test]
        fn same_seed_same_jittered_train() {
            let t = time_axis(2., 600);
            let a = StandardPulseGenerator::new(7).random_square(t.view(), 5, 0.05, 0.1);
            let b = StandardPulseGenerator::new(7).random_square(t.view(), 5, 0.05, 0.1);
            assert_eq!(a, b);
        }

        #[test]
        fn jittered_pulses_stay_on_axis() {
            let t = time_axis(1., 300);
            let mut gen = StandardPulseGenerator::new(3);
            for _ in 0..20 {
                let signal = gen.random_square(t.view(), 4, 0.1, 0.5);
                assert!(signal.iter().all(|&y| y == 0. || y == 1.));
                assert!(signal.iter().any(|&y| y == 1.));
            }
        }

        #[test]
        fn huge_jitter_and_width_are_clamped() {
            let t = time_axis(1., 300);
            let mut gen = StandardPulseGenerator::new(5);
            let signal = gen.random_square(t.view(), 3, 0.1, f64::MAX);
            assert_eq!(signal.len(), 300);
            assert!(signal.iter().any(|&y| y == 1.));
            let full = gen.random_square(t.view(), 2, f64::MAX, f64::MAX);
            assert_eq!(high_count(&full), 300);
        }

        #[test]
        fn degenerate_inputs_are_flat() {
            let t = time_axis(1., 300);
            let mut gen = StandardPulseGenerator::new(0);
            assert!(gen.random_square(t.view(), 0, 0.1, 0.).iter().all(|&y| y == 0.));
            assert!(gen.random_square(t.view(), 3, 0., 0.).iter().all(|&y| y == 0.));
            assert_eq!(gen.random_square(time_axis(1., 0).view(), 3, 0.1, 0.).len(), 0);
            assert!(gen.random_square(time_axis(1., 1).view(), 3, 0.1, 0.).iter().all(|&y| y == 0.));
        }

        proptest! {
            #[test]
            fn output_matches_axis_and_is_binary(
                nsamps in 0usize..400,
                pulses in 0u32..2000,
                width in prop_oneof![0f64..2., Just(f64::MAX)],
                jitter in prop_oneof![0f64..2., Just(1e308), Just(f64::MAX)],
                seed in any::<u64>(),
            ) {
                let t = time_axis(1., nsamps);
                let signal = StandardPulseGenerator::new(seed).random_square(t.view(), pulses, width, jitter);
                prop_assert_eq!(signal.len(), nsamps);
                prop_assert!(signal.iter().all(|&y| y == 0. || y == 1.));
            }
        }
    }

    mod square {
        use super::*;

        #[test]
        fn duty_sets_high_fraction() {
            let t = time_axis(1., 1000);
            let signal = StandardPulseGenerator::new(0).square(t.view(), 10., 0.25);
            assert_eq!(high_count(&signal), 250);
            assert_eq!(rising_edges(&signal), 10);
        }

        #[test]
        fn zero_frequency_is_flat() {
            let t = time_axis(1., 100);
            let signal = StandardPulseGenerator::new(0).square(t.view(), 0., 0.5);
            assert!(signal.iter().all(|&y| y == 0.));
        }
    }

    #[test]
    fn reserved_type_is_all_zero() {
        let t = time_axis(1., 50);
        let stim = StimParams {
            signal_type: SignalType::Reserved,
            pulses: 3,
            width: 0.1,
            ..Default::default()
        };
        let signal = StandardPulseGenerator::new(0).make_signal(t.view(), &stim);
        assert_eq!(signal, Array1::<f64>::zeros(50));
    }
}
