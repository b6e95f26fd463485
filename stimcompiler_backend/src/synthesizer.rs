//! Compiles a protocol tree into a single, time-ordered composite waveform.
//!
//! ## Algorithm
//! A synthesis pass walks the tree depth-first in playback order with one running clock for
//! the whole pass:
//! - a Block replays its children, in order, `iterations` times;
//! - a Stimulation leaf samples `[0, duration)` at [`SynthConfig::sample_rate`], asks the
//!   [`PulseGenerator`] for amplitudes, scales square leaves by [`SynthConfig::square_gain`],
//!   shifts its axis by the clock, appends it to the composite and advances the clock by
//!   `duration`.
//!
//! The clock and the composite buffers live in a per-pass accumulator threaded through the
//! recursion, so separate passes share nothing and may run on different threads.
//!
//! ## Failure
//! If any node cannot be turned into generator arguments (e.g. a leaf without a duration) the
//! whole pass is abandoned and [`SynthError::SynthesisFailed`] names the node. No partial
//! waveform is ever returned.
//!
//! Before anything is sampled, the work of the pass is computed in closed form (samples plus
//! pulses, repetitions multiplied out) and compared against [`SynthConfig::max_samples`], so
//! a huge iteration count fails without walking a single repetition.
//!
//! ## Block delay
//! With [`DelayPolicy::Metadata`] (the default) a Block's `delay` is stored but does not show in
//! the preview. [`DelayPolicy::InsertGap`] inserts `delay` seconds of zero signal between
//! consecutive iterations.

use ndarray::{Array1, ArrayView1};

use crate::error::{FailureReason, SynthError};
use crate::node::*;
use crate::protocol::ProtocolTree;
use crate::pulse::*;
use crate::utils::TickTimer;

/// Samples per second of the full-fidelity composite.
pub const SAMPLE_RATE: f64 = 300.;
/// Amplitude factor applied to `square` leaves only.
pub const SQUARE_GAIN: f64 = 5.;
/// Number of points a preview is reduced to.
pub const PREVIEW_POINTS: usize = 3000;
/// Upper bound on the work of a single pass, in samples plus pulses.
pub const MAX_SAMPLES: usize = 50_000_000;

/// How a Block's `delay` shows in the composite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DelayPolicy {
    /// Kept for hardware timing, not drawn.
    #[default]
    Metadata,
    /// Zero signal of `delay` seconds between consecutive iterations.
    InsertGap,
}

/// Settings of a synthesis pass.
///
/// ```
/// # use stimcompiler_backend::*;
/// let config = SynthConfig::new(1000.)
///     .with_delay_policy(DelayPolicy::InsertGap)
///     .with_channel(Some(Channel::Channel1));
/// assert_eq!(config.preview_points, PREVIEW_POINTS);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SynthConfig {
    pub sample_rate: f64,
    pub square_gain: f64,
    pub preview_points: usize,
    pub delay_policy: DelayPolicy,
    /// If set, leaves not routed to this channel contribute a flat zero signal.
    pub channel: Option<Channel>,
    pub max_samples: usize,
    /// Seed of the jitter source. Each pass starts from this seed.
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            square_gain: SQUARE_GAIN,
            preview_points: PREVIEW_POINTS,
            delay_policy: DelayPolicy::default(),
            channel: None,
            max_samples: MAX_SAMPLES,
            seed: 0,
        }
    }
}

impl SynthConfig {
    /// # Panics
    /// If `sample_rate` is not a finite, strictly positive number.
    pub fn new(sample_rate: f64) -> Self {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.,
            "Sample rate should be a positive number, got {}",
            sample_rate
        );
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    pub fn with_square_gain(mut self, gain: f64) -> Self {
        self.square_gain = gain;
        self
    }

    pub fn with_preview_points(mut self, points: usize) -> Self {
        self.preview_points = points;
        self
    }

    pub fn with_delay_policy(mut self, policy: DelayPolicy) -> Self {
        self.delay_policy = policy;
        self
    }

    pub fn with_channel(mut self, channel: Option<Channel>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn nsamps(&self, duration: f64) -> usize {
        (duration * self.sample_rate).round() as usize
    }
}

/// A pair of equal-length sequences: sample times (seconds, non-decreasing) and amplitudes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Waveform {
    times: Vec<f64>,
    amplitudes: Vec<f64>,
}

impl Waveform {
    /// # Panics
    /// If the two sequences differ in length.
    pub fn new(times: Vec<f64>, amplitudes: Vec<f64>) -> Self {
        assert_eq!(
            times.len(),
            amplitudes.len(),
            "Waveform needs one amplitude per time point"
        );
        Self { times, amplitudes }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.times, self.amplitudes)
    }

    fn extend_shifted(&mut self, t_local: ArrayView1<f64>, amplitudes: ArrayView1<f64>, offset: f64) {
        self.times.extend(t_local.iter().map(|t| t + offset));
        self.amplitudes.extend(amplitudes.iter());
    }
}

fn fail(node: &ProtocolNode, reason: FailureReason) -> SynthError {
    SynthError::SynthesisFailed {
        node: node.id,
        name: node.name().label().to_string(),
        reason,
    }
}

fn check_non_negative(node: &ProtocolNode, field: &'static str, value: f64) -> Result<(), SynthError> {
    if value.is_finite() && value >= 0. {
        Ok(())
    } else {
        Err(fail(node, FailureReason::InvalidParameter { field, value }))
    }
}

/// Validated duration of a leaf. Also checks the leaf's other generator arguments.
fn leaf_duration(node: &ProtocolNode) -> Result<f64, SynthError> {
    let stim = node.stim();
    let duration = stim
        .duration
        .ok_or_else(|| fail(node, FailureReason::MissingParameter("duration")))?;
    if !duration.is_finite() || duration <= 0. {
        return Err(fail(
            node,
            FailureReason::InvalidParameter {
                field: "duration",
                value: duration,
            },
        ));
    }
    check_non_negative(node, "jitter", stim.jitter)?;
    check_non_negative(node, "width", stim.width)?;
    check_non_negative(node, "frequency", stim.frequency)?;
    if !(0. ..=1.).contains(&stim.duty) {
        return Err(fail(
            node,
            FailureReason::InvalidParameter {
                field: "duty",
                value: stim.duty,
            },
        ));
    }
    Ok(duration)
}

/// Validated iteration count of a Block and the gap drawn between its iterations.
fn block_plan(config: &SynthConfig, node: &ProtocolNode) -> Result<(u32, f64), SynthError> {
    let block = node.block();
    if block.iterations < 1 {
        return Err(fail(
            node,
            FailureReason::InvalidParameter {
                field: "iterations",
                value: block.iterations as f64,
            },
        ));
    }
    check_non_negative(node, "delay", block.delay)?;
    let gap = match config.delay_policy {
        DelayPolicy::Metadata => 0.,
        DelayPolicy::InsertGap => block.delay,
    };
    Ok((block.iterations, gap))
}

/// Length in seconds of `node` once expanded. Repetitions are multiplied, not walked.
fn expanded_span(config: &SynthConfig, node: &ProtocolNode) -> Result<f64, SynthError> {
    match node.kind() {
        NodeKind::Stimulation => leaf_duration(node),
        NodeKind::Block => {
            let (iterations, gap) = block_plan(config, node)?;
            let body = node
                .children
                .iter()
                .map(|child| expanded_span(config, child))
                .sum::<Result<f64, SynthError>>()?;
            Ok(iterations as f64 * body + (iterations - 1) as f64 * gap)
        }
    }
}

/// Work needed to synthesize `node`: samples to emit plus pulses to place, where every leaf
/// or gap visit counts at least once. Fails with `TooManySamples` at the first subtree whose
/// work exceeds `config.max_samples`, before anything is allocated.
fn expanded_cost(config: &SynthConfig, node: &ProtocolNode) -> Result<u128, SynthError> {
    let cost = match node.kind() {
        NodeKind::Stimulation => {
            let stim = node.stim();
            let nsamps = config.nsamps(leaf_duration(node)?) as u128;
            let pulses = match stim.signal_type {
                SignalType::RandomSquare => stim.pulses as u128,
                _ => 0,
            };
            nsamps.max(1) + pulses
        }
        NodeKind::Block => {
            let (iterations, gap) = block_plan(config, node)?;
            let mut body = 0u128;
            for child in &node.children {
                body += expanded_cost(config, child)?;
            }
            let gap_cost = if gap > 0. {
                (config.nsamps(gap) as u128).max(1)
            } else {
                0
            };
            iterations as u128 * body + (iterations as u128 - 1) * gap_cost
        }
    };
    if cost > config.max_samples as u128 {
        return Err(fail(
            node,
            FailureReason::TooManySamples {
                limit: config.max_samples,
            },
        ));
    }
    Ok(cost)
}

/// Running state of one synthesis pass: the clock, the composite so far and a leaf counter.
struct SynthPass<'a, G: PulseGenerator> {
    config: &'a SynthConfig,
    generator: &'a mut G,
    clock: f64,
    leaves: usize,
    composite: Waveform,
}

impl<'a, G: PulseGenerator> SynthPass<'a, G> {
    fn new(config: &'a SynthConfig, generator: &'a mut G) -> Self {
        Self {
            config,
            generator,
            clock: 0.,
            leaves: 0,
            composite: Waveform::default(),
        }
    }

    fn visit(&mut self, node: &ProtocolNode) -> Result<(), SynthError> {
        match node.kind() {
            NodeKind::Block => self.visit_block(node),
            NodeKind::Stimulation => self.visit_leaf(node),
        }
    }

    fn visit_block(&mut self, node: &ProtocolNode) -> Result<(), SynthError> {
        let (iterations, gap) = block_plan(self.config, node)?;
        for iteration in 0..iterations {
            if iteration > 0 && gap > 0. {
                self.append(gap, None);
            }
            for child in &node.children {
                self.visit(child)?;
            }
        }
        Ok(())
    }

    fn visit_leaf(&mut self, node: &ProtocolNode) -> Result<(), SynthError> {
        let duration = leaf_duration(node)?;
        self.leaves += 1;
        let routed = self
            .config
            .channel
            .map_or(true, |channel| node.channels().contains(channel));
        self.append(duration, routed.then_some(node.stim()));
        Ok(())
    }

    /// Appends `duration` seconds to the composite and advances the clock. `stim` of `None`
    /// appends a flat zero signal.
    fn append(&mut self, duration: f64, stim: Option<&StimParams>) {
        let nsamps = self.config.nsamps(duration);
        let t_local = time_axis(duration, nsamps);
        let amplitudes = match stim {
            Some(stim) => {
                let mut amplitudes = self.generator.make_signal(t_local.view(), stim);
                assert_eq!(
                    amplitudes.len(),
                    t_local.len(),
                    "Pulse generator returned {} amplitudes for {} time points",
                    amplitudes.len(),
                    t_local.len()
                );
                if stim.signal_type == SignalType::Square {
                    amplitudes *= self.config.square_gain;
                }
                amplitudes
            }
            None => Array1::zeros(nsamps),
        };
        self.composite
            .extend_shifted(t_local.view(), amplitudes.view(), self.clock);
        self.clock += duration;
    }
}

/// Turns protocol trees into composite waveforms according to a [`SynthConfig`].
#[derive(Clone, Debug, Default)]
pub struct Synthesizer {
    config: SynthConfig,
}

impl Synthesizer {
    pub fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Synthesizes the whole forest with the preview generator, seeded from the config.
    ///
    /// # Example
    /// ```
    /// use stimcompiler_backend::*;
    ///
    /// let mut protocol = Protocol::new();
    /// let block = protocol.create_root_node(NodeName::Unnamed);
    /// let leaf = protocol.add_child(Some(block)).unwrap();
    /// protocol.set_attribute(Some(block), &Attribute::Iterations(2)).unwrap();
    /// protocol.set_attribute(Some(leaf), &Attribute::Duration(1.)).unwrap();
    ///
    /// let waveform = Synthesizer::default().synthesize(&protocol.snapshot()).unwrap();
    /// assert_eq!(waveform.len(), 600);
    /// assert!(*waveform.times().last().unwrap() < 2.);
    /// ```
    pub fn synthesize(&self, tree: &ProtocolTree) -> Result<Waveform, SynthError> {
        let mut generator = StandardPulseGenerator::new(self.config.seed);
        self.synthesize_with(tree, &mut generator)
    }

    /// Synthesizes a single subtree, with its own clock starting at zero.
    pub fn synthesize_node(&self, node: &ProtocolNode) -> Result<Waveform, SynthError> {
        self.synthesize(&ProtocolTree::from(node.clone()))
    }

    /// Synthesizes the forest with a caller-supplied generator.
    pub fn synthesize_with<G: PulseGenerator>(
        &self,
        tree: &ProtocolTree,
        generator: &mut G,
    ) -> Result<Waveform, SynthError> {
        let mut timer = TickTimer::new();
        // Bound the whole pass before sampling anything
        let mut cost = 0u128;
        for root in &tree.roots {
            cost += expanded_cost(&self.config, root)?;
            if cost > self.config.max_samples as u128 {
                return Err(fail(
                    root,
                    FailureReason::TooManySamples {
                        limit: self.config.max_samples,
                    },
                ));
            }
        }

        let mut pass = SynthPass::new(&self.config, generator);
        for root in &tree.roots {
            pass.visit(root)?;
        }
        log::debug!(
            "synthesized {} leaves into {} samples spanning {:.3}s in {:.1}ms",
            pass.leaves,
            pass.composite.len(),
            pass.clock,
            timer.tick()
        );
        Ok(pass.composite)
    }

    /// Length in seconds of the expanded protocol, without sampling anything. Block
    /// repetitions are multiplied out, so the cost is linear in the size of the tree.
    ///
    /// Fails under the same conditions as [`Synthesizer::synthesize`], except the sample limit.
    pub fn expanded_duration(&self, tree: &ProtocolTree) -> Result<f64, SynthError> {
        tree.roots
            .iter()
            .map(|root| expanded_span(&self.config, root))
            .sum()
    }
}

/// Synthesizes `tree` with the default configuration.
pub fn synthesize(tree: &ProtocolTree) -> Result<Waveform, SynthError> {
    Synthesizer::default().synthesize(tree)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::*;

    /// Generator whose output is a known function of time, to observe scaling and offsets.
    struct RampGenerator;

    impl PulseGenerator for RampGenerator {
        fn random_square(&mut self, t: ArrayView1<f64>, _: u32, _: f64, _: f64) -> Array1<f64> {
            t.mapv(|t| t + 1.)
        }
        fn square(&mut self, t: ArrayView1<f64>, _: f64, _: f64) -> Array1<f64> {
            t.mapv(|t| t + 1.)
        }
    }

    fn leaf(p: &mut Protocol, parent: Option<NodeId>, duration: f64) -> NodeId {
        let id = match parent {
            Some(parent) => p.add_child(Some(parent)).unwrap(),
            None => p.create_root_node(NodeName::Unnamed),
        };
        p.set_attribute(Some(id), &Attribute::Duration(duration)).unwrap();
        id
    }

    mod clock {
        use super::*;

        #[test]
        fn empty_tree_is_empty_waveform() {
            let waveform = synthesize(&ProtocolTree::default()).unwrap();
            assert!(waveform.is_empty());
        }

        #[test]
        fn leaves_are_concatenated_in_order() {
            let mut p = Protocol::new();
            leaf(&mut p, None, 1.);
            leaf(&mut p, None, 0.5);
            let waveform = Synthesizer::new(SynthConfig::new(10.))
                .synthesize(&p.snapshot())
                .unwrap();
            assert_eq!(waveform.len(), 15);
            assert_eq!(waveform.times()[10], 1.);
            assert!(waveform.times().windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn block_repeats_children_in_order() {
            let mut p = Protocol::new();
            let block = p.create_root_node(NodeName::Unnamed);
            leaf(&mut p, Some(block), 1.);
            leaf(&mut p, Some(block), 2.);
            p.set_attribute(Some(block), &Attribute::Iterations(3)).unwrap();

            let synth = Synthesizer::new(SynthConfig::new(4.));
            let waveform = synth
                .synthesize_with(&p.snapshot(), &mut RampGenerator)
                .unwrap();
            assert_eq!(waveform.len(), 3 * (4 + 8));
            assert_eq!(synth.expanded_duration(&p.snapshot()).unwrap(), 9.);
            // Each repetition starts 3 s after the previous one with the same pattern
            for rep in 1..3 {
                for i in 0..12 {
                    assert_eq!(waveform.amplitudes()[rep * 12 + i], waveform.amplitudes()[i]);
                    assert_eq!(waveform.times()[rep * 12 + i], waveform.times()[i] + 3. * rep as f64);
                }
            }
        }

        #[test]
        fn nested_blocks_multiply() {
            let mut p = Protocol::new();
            let outer = p.create_root_node(NodeName::Unnamed);
            let inner = p.add_child(Some(outer)).unwrap();
            p.set_attribute(Some(inner), &Attribute::Duration(1.)).unwrap();
            leaf(&mut p, Some(inner), 0.5);
            leaf(&mut p, Some(outer), 1.);
            p.set_attribute(Some(inner), &Attribute::Iterations(2)).unwrap();
            p.set_attribute(Some(outer), &Attribute::Iterations(3)).unwrap();
            let synth = Synthesizer::default();
            // 3 * (2 * 0.5 + 1)
            assert_eq!(synth.expanded_duration(&p.snapshot()).unwrap(), 6.);
            assert_eq!(synth.synthesize(&p.snapshot()).unwrap().len(), 1800);
        }

        #[test]
        fn delay_gap_only_with_insert_gap_policy() {
            let mut p = Protocol::new();
            let block = p.create_root_node(NodeName::Unnamed);
            leaf(&mut p, Some(block), 1.);
            p.set_attribute(Some(block), &Attribute::Iterations(3)).unwrap();
            p.set_attribute(Some(block), &Attribute::Delay(0.5)).unwrap();
            let tree = p.snapshot();

            let metadata = Synthesizer::new(SynthConfig::new(10.));
            assert_eq!(metadata.expanded_duration(&tree).unwrap(), 3.);
            assert_eq!(metadata.synthesize(&tree).unwrap().len(), 30);

            let gaps = Synthesizer::new(SynthConfig::new(10.).with_delay_policy(DelayPolicy::InsertGap));
            assert_eq!(gaps.expanded_duration(&tree).unwrap(), 4.);
            let waveform = gaps.synthesize_with(&tree, &mut RampGenerator).unwrap();
            assert_eq!(waveform.len(), 40);
            // Gap after the first iteration is flat zero, second iteration starts at 1.5 s
            assert!(waveform.amplitudes()[10..15].iter().all(|&y| y == 0.));
            assert_eq!(waveform.times()[15], 1.5);
        }
    }

    mod amplitudes {
        use super::*;

        #[test]
        fn only_square_leaves_are_scaled() {
            let mut p = Protocol::new();
            let random = leaf(&mut p, None, 1.);
            let square = leaf(&mut p, None, 1.);
            p.set_attribute(Some(square), &Attribute::SignalType(SignalType::Square)).unwrap();
            p.set_attribute(Some(random), &Attribute::SignalType(SignalType::RandomSquare)).unwrap();

            let waveform = Synthesizer::new(SynthConfig::new(10.))
                .synthesize_with(&p.snapshot(), &mut RampGenerator)
                .unwrap();
            for i in 0..10 {
                let raw = i as f64 / 10. + 1.;
                assert!((waveform.amplitudes()[i] - raw).abs() < 1e-12);
                assert!((waveform.amplitudes()[10 + i] - SQUARE_GAIN * raw).abs() < 1e-12);
            }
        }

        #[test]
        fn channel_filter_flattens_unrouted_leaves() {
            let mut p = Protocol::new();
            let on = leaf(&mut p, None, 1.);
            leaf(&mut p, None, 1.);
            p.set_attribute(Some(on), &Attribute::Channel(Channel::Channel1, true)).unwrap();

            let config = SynthConfig::new(10.).with_channel(Some(Channel::Channel1));
            let waveform = Synthesizer::new(config)
                .synthesize_with(&p.snapshot(), &mut RampGenerator)
                .unwrap();
            assert_eq!(waveform.len(), 20);
            assert!(waveform.amplitudes()[..10].iter().all(|&y| y >= 1.));
            assert!(waveform.amplitudes()[10..].iter().all(|&y| y == 0.));
        }

        #[test]
        fn synthesis_is_deterministic() {
            let mut p = Protocol::new();
            let id = leaf(&mut p, None, 2.);
            p.set_attribute(Some(id), &Attribute::Pulses(6)).unwrap();
            p.set_attribute(Some(id), &Attribute::Width(0.05)).unwrap();
            p.set_attribute(Some(id), &Attribute::Jitter(0.1)).unwrap();
            let synth = Synthesizer::new(SynthConfig::default().with_seed(42));
            assert_eq!(
                synth.synthesize(&p.snapshot()).unwrap(),
                synth.synthesize(&p.snapshot()).unwrap()
            );
        }
    }

    mod failures {
        use super::*;

        #[test]
        fn missing_duration_names_the_node() {
            let mut p = Protocol::new();
            leaf(&mut p, None, 1.);
            let bad = p.create_root_node(NodeName::new("probe"));
            let err = synthesize(&p.snapshot()).unwrap_err();
            assert_eq!(
                err,
                SynthError::SynthesisFailed {
                    node: bad,
                    name: "probe".to_string(),
                    reason: FailureReason::MissingParameter("duration"),
                }
            );
        }

        #[test]
        fn sample_limit_aborts_the_pass() {
            let mut p = Protocol::new();
            leaf(&mut p, None, 10.);
            let synth = Synthesizer::new(SynthConfig::default().with_max_samples(1000));
            let err = synth.synthesize(&p.snapshot()).unwrap_err();
            assert!(matches!(
                err,
                SynthError::SynthesisFailed {
                    reason: FailureReason::TooManySamples { limit: 1000 },
                    ..
                }
            ));
            // Duration does not need samples
            assert_eq!(synth.expanded_duration(&p.snapshot()).unwrap(), 10.);
        }

        #[test]
        fn huge_iteration_count_fails_before_walking() {
            let mut p = Protocol::new();
            let block = p.create_root_node(NodeName::new("forever"));
            // Rounds to zero samples per visit
            leaf(&mut p, Some(block), 0.001);
            p.set_attribute(Some(block), &Attribute::Iterations(u32::MAX)).unwrap();
            let tree = p.snapshot();

            let synth = Synthesizer::default();
            let err = synth.synthesize(&tree).unwrap_err();
            assert_eq!(
                err,
                SynthError::SynthesisFailed {
                    node: block,
                    name: "forever".to_string(),
                    reason: FailureReason::TooManySamples { limit: MAX_SAMPLES },
                }
            );
            let duration = synth.expanded_duration(&tree).unwrap();
            assert!((duration - u32::MAX as f64 * 0.001).abs() < 1e-3);
        }

        #[test]
        fn limit_applies_across_top_level_nodes() {
            let mut p = Protocol::new();
            leaf(&mut p, None, 2.);
            let second = leaf(&mut p, None, 2.);
            let synth = Synthesizer::new(SynthConfig::new(100.).with_max_samples(300));
            let err = synth.synthesize(&p.snapshot()).unwrap_err();
            assert!(matches!(
                err,
                SynthError::SynthesisFailed { node, reason: FailureReason::TooManySamples { .. }, .. }
                    if node == second
            ));
        }

        #[test]
        fn extreme_jitter_synthesizes() {
            let mut p = Protocol::new();
            let id = leaf(&mut p, None, 1.);
            p.set_attribute(Some(id), &Attribute::Pulses(3)).unwrap();
            p.set_attribute(Some(id), &Attribute::Width(0.1)).unwrap();
            p.set_attribute(Some(id), &Attribute::Jitter(f64::MAX)).unwrap();
            let waveform = synthesize(&p.snapshot()).unwrap();
            assert_eq!(waveform.len(), 300);
            assert!(waveform.amplitudes().iter().all(|&y| y == 0. || y == 1.));
        }

        #[test]
        fn hand_built_invalid_node_is_rejected() {
            let mut p = Protocol::new();
            let id = leaf(&mut p, None, 1.);
            let mut node = p.get_subtree(Some(id)).unwrap();
            node.attrs.stim.duty = 2.;
            assert!(Synthesizer::default().synthesize_node(&node).is_err());
        }
    }
}
