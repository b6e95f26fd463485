//! Value types describing a single protocol node.
//!
//! A node is either a **Block** (one or more children, replayed `iterations` times) or a
//! **Stimulation** (a leaf holding pulse-train parameters). The kind is never stored: it is
//! derived from the child count, see [`ProtocolNode::kind`].
//!
//! Both parameter sets are kept side by side in [`NodeAttrs`]. Stimulation parameters survive
//! while a node is a Block, so that removing its last child gives back the leaf it was before.
//!
//! Edits are expressed as [`Attribute`] values. Each variant carries its own constraint, checked
//! by [`Attribute::apply`] before anything is written.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ProtocolError, Result};
use crate::protocol::NodeId;

/// Tree label shown for nodes that were never given a name.
pub const UNNAMED_LABEL: &str = "No Name";

/// Name of a node. `Unnamed` is distinct from an explicitly empty name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NodeName {
    #[default]
    Unnamed,
    Named(String),
}

impl NodeName {
    pub fn new(name: &str) -> Self {
        NodeName::Named(name.to_string())
    }

    /// Text for the tree view: the sentinel label for unnamed nodes.
    pub fn label(&self) -> &str {
        match self {
            NodeName::Unnamed => UNNAMED_LABEL,
            NodeName::Named(name) => name,
        }
    }

    /// Text for an edit field: unnamed nodes show an empty field.
    pub fn edit_text(&self) -> &str {
        match self {
            NodeName::Unnamed => "",
            NodeName::Named(name) => name,
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Block,
    Stimulation,
}

/// Pulse shape of a Stimulation leaf.
///
/// `Reserved` is the selectable third type. It has no generator of its own and synthesizes as
/// a flat zero signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SignalType {
    #[default]
    RandomSquare,
    Square,
    Reserved,
}

impl SignalType {
    pub const ALL: [SignalType; 3] = [
        SignalType::RandomSquare,
        SignalType::Square,
        SignalType::Reserved,
    ];

    /// Position of the type in the editor's selector.
    pub fn index(&self) -> usize {
        match self {
            SignalType::RandomSquare => 0,
            SignalType::Square => 1,
            SignalType::Reserved => 2,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SignalType::RandomSquare => "random-square",
                SignalType::Square => "square",
                SignalType::Reserved => "third",
            }
        )
    }
}

impl FromStr for SignalType {
    type Err = ProtocolError;

    /// Accepts the display names as well as the selector indices `0`, `1`, `2`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        SignalType::ALL
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(s) || t.index().to_string() == s)
            .ok_or_else(|| ProtocolError::invalid("type", format!("unknown signal type '{}'", s)))
    }
}

/// Physical output a leaf can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Channel1,
    Channel2,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Channel1, Channel::Channel2];

    pub fn index(&self) -> usize {
        match self {
            Channel::Channel1 => 0,
            Channel::Channel2 => 1,
        }
    }

    pub fn number(&self) -> usize {
        self.index() + 1
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Canal {}", self.number())
    }
}

fn channel_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i)(?:canal|channel|ch)\s*(\d+)$").expect("channel name pattern is valid")
    })
}

impl FromStr for Channel {
    type Err = ProtocolError;

    /// Parses names of the form `Canal 1`, `channel2`, `ch1` (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        let unknown = || ProtocolError::invalid("channel", format!("unknown channel '{}'", s));
        let caps = channel_name_regex().captures(s.trim()).ok_or_else(unknown)?;
        let number: usize = caps[1].parse().map_err(|_| unknown())?;
        Channel::ALL
            .into_iter()
            .find(|c| c.number() == number)
            .ok_or_else(unknown)
    }
}

/// Routing flags of a node, one per [`Channel`]. All off for a new node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelSet {
    flags: [bool; 2],
}

impl ChannelSet {
    pub fn contains(&self, channel: Channel) -> bool {
        self.flags[channel.index()]
    }

    pub fn set(&mut self, channel: Channel, enabled: bool) {
        self.flags[channel.index()] = enabled;
    }

    pub fn is_empty(&self) -> bool {
        !self.flags.iter().any(|&f| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

/// Attributes that only apply while the node is a Block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockParams {
    pub iterations: u32,
    /// Gap between iterations in seconds. How it affects the preview depends on
    /// [`crate::DelayPolicy`].
    pub delay: f64,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self {
            iterations: 1,
            delay: 0.,
        }
    }
}

/// Attributes of a Stimulation leaf. Fields not used by the active `signal_type` are still kept.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StimParams {
    pub signal_type: SignalType,
    /// Seconds. `None` until the operator enters one.
    pub duration: Option<f64>,
    pub pulses: u32,
    pub jitter: f64,
    pub width: f64,
    pub frequency: f64,
    pub duty: f64,
}

impl StimParams {
    /// Pulses per second of a random-square train, rounded to 3 decimals.
    ///
    /// ```
    /// # use stimcompiler_backend::node::*;
    /// let stim = StimParams { pulses: 10, duration: Some(3.), ..Default::default() };
    /// assert_eq!(stim.pulse_rate(), Some(3.333));
    /// assert_eq!(StimParams::default().pulse_rate(), None);
    /// ```
    pub fn pulse_rate(&self) -> Option<f64> {
        let duration = self.duration?;
        let rate = self.pulses as f64 / duration;
        Some((rate * 1e3).round() / 1e3)
    }
}

/// Everything a node stores besides its position in the tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeAttrs {
    pub name: NodeName,
    /// `Some` exactly while the node has children.
    pub block: Option<BlockParams>,
    pub stim: StimParams,
    pub channels: ChannelSet,
}

/// A single-field edit. See [`Attribute::apply`] for the constraints.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    Name(NodeName),
    Iterations(u32),
    Delay(f64),
    SignalType(SignalType),
    Duration(f64),
    Pulses(u32),
    Jitter(f64),
    Width(f64),
    Frequency(f64),
    Duty(f64),
    Channel(Channel, bool),
}

fn check_non_negative(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0. {
        return Err(ProtocolError::invalid(
            field,
            format!("expected a finite number >= 0, got {}", value),
        ));
    }
    Ok(())
}

fn parse_number<T: FromStr>(field: &'static str, text: &str) -> Result<T> {
    text.trim()
        .parse::<T>()
        .map_err(|_| ProtocolError::invalid(field, format!("'{}' is not a number", text)))
}

fn parse_flag(field: &'static str, text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ProtocolError::invalid(
            field,
            format!("'{}' is not a boolean", text),
        )),
    }
}

impl Attribute {
    /// Name of the edited field, as used in error messages.
    pub fn field(&self) -> &'static str {
        match self {
            Attribute::Name(_) => "name",
            Attribute::Iterations(_) => "iterations",
            Attribute::Delay(_) => "delay",
            Attribute::SignalType(_) => "type",
            Attribute::Duration(_) => "duration",
            Attribute::Pulses(_) => "pulses",
            Attribute::Jitter(_) => "jitter",
            Attribute::Width(_) => "width",
            Attribute::Frequency(_) => "frequency",
            Attribute::Duty(_) => "duty",
            Attribute::Channel(..) => "channel",
        }
    }

    fn is_block_only(&self) -> bool {
        matches!(self, Attribute::Iterations(_) | Attribute::Delay(_))
    }

    /// Checks the value constraint without touching any node.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Attribute::Iterations(n) if n < 1 => Err(ProtocolError::invalid(
                "iterations",
                "a block runs at least once",
            )),
            Attribute::Duration(d) if !d.is_finite() || d <= 0. => Err(ProtocolError::invalid(
                "duration",
                format!("expected a finite number > 0, got {}", d),
            )),
            Attribute::Duty(d) if !(0. ..=1.).contains(&d) => Err(ProtocolError::invalid(
                "duty",
                format!("expected a fraction in [0, 1], got {}", d),
            )),
            Attribute::Delay(v)
            | Attribute::Jitter(v)
            | Attribute::Width(v)
            | Attribute::Frequency(v) => check_non_negative(self.field(), v),
            _ => Ok(()),
        }
    }

    /// Validates and writes the value into `attrs`. On error `attrs` is left unchanged.
    ///
    /// Block-only attributes (`iterations`, `delay`) are rejected on Stimulation nodes.
    pub fn apply(&self, attrs: &mut NodeAttrs) -> Result<()> {
        self.validate()?;
        if self.is_block_only() && attrs.block.is_none() {
            return Err(ProtocolError::invalid(
                self.field(),
                "only applies to block nodes",
            ));
        }
        match self {
            Attribute::Name(name) => attrs.name = name.clone(),
            Attribute::Iterations(n) => {
                if let Some(block) = attrs.block.as_mut() {
                    block.iterations = *n;
                }
            }
            Attribute::Delay(d) => {
                if let Some(block) = attrs.block.as_mut() {
                    block.delay = *d;
                }
            }
            Attribute::SignalType(t) => attrs.stim.signal_type = *t,
            Attribute::Duration(d) => attrs.stim.duration = Some(*d),
            Attribute::Pulses(p) => attrs.stim.pulses = *p,
            Attribute::Jitter(j) => attrs.stim.jitter = *j,
            Attribute::Width(w) => attrs.stim.width = *w,
            Attribute::Frequency(f) => attrs.stim.frequency = *f,
            Attribute::Duty(d) => attrs.stim.duty = *d,
            Attribute::Channel(c, enabled) => attrs.channels.set(*c, *enabled),
        }
        Ok(())
    }

    /// Builds an attribute from an editor cell: a column name and its text.
    ///
    /// Column names follow the editor headers (`Name`, `Iterations`, `Delay`, `Type`, `Pulses`,
    /// `Duration`, `Jitter`, `Width`, `Frequency`, `Duty`, `Canal 1`, `Canal 2`) and are
    /// case-insensitive. The value is only parsed here, see [`Attribute::validate`] for ranges.
    ///
    /// ```
    /// # use stimcompiler_backend::node::*;
    /// assert_eq!(Attribute::parse("Duration", "2.5").unwrap(), Attribute::Duration(2.5));
    /// assert_eq!(
    ///     Attribute::parse("Canal 2", "True").unwrap(),
    ///     Attribute::Channel(Channel::Channel2, true)
    /// );
    /// assert!(Attribute::parse("Pulses", "many").is_err());
    /// ```
    pub fn parse(field: &str, text: &str) -> Result<Self> {
        let attr = match field.trim().to_ascii_lowercase().as_str() {
            "name" => Attribute::Name(NodeName::new(text)),
            "iterations" => Attribute::Iterations(parse_number("iterations", text)?),
            "delay" => Attribute::Delay(parse_number("delay", text)?),
            "type" => Attribute::SignalType(text.parse()?),
            "duration" => Attribute::Duration(parse_number("duration", text)?),
            "pulses" => Attribute::Pulses(parse_number("pulses", text)?),
            "jitter" => Attribute::Jitter(parse_number("jitter", text)?),
            "width" => Attribute::Width(parse_number("width", text)?),
            "frequency" => Attribute::Frequency(parse_number("frequency", text)?),
            "duty" => Attribute::Duty(parse_number("duty", text)?),
            _ => {
                let channel: Channel = field.parse().map_err(|_| {
                    ProtocolError::invalid("attribute", format!("unknown attribute '{}'", field))
                })?;
                Attribute::Channel(channel, parse_flag("channel", text)?)
            }
        };
        Ok(attr)
    }
}

/// Read-only deep copy of a subtree, as handed to the synthesizer.
///
/// Obtained from [`crate::BaseProtocol::get_subtree`]. Holding a `ProtocolNode` does not borrow
/// the protocol, so the snapshot can be synthesized while the protocol is edited elsewhere.
#[derive(Clone, Debug, PartialEq)]
pub struct ProtocolNode {
    pub id: NodeId,
    pub attrs: NodeAttrs,
    pub children: Vec<ProtocolNode>,
}

impl ProtocolNode {
    pub fn kind(&self) -> NodeKind {
        if self.children.is_empty() {
            NodeKind::Stimulation
        } else {
            NodeKind::Block
        }
    }

    pub fn name(&self) -> &NodeName {
        &self.attrs.name
    }

    pub fn stim(&self) -> &StimParams {
        &self.attrs.stim
    }

    /// Block parameters, defaulted when the node has none recorded.
    pub fn block(&self) -> BlockParams {
        self.attrs.block.unwrap_or_default()
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.attrs.channels
    }

    /// Number of Stimulation leaves below (and including) this node, without repetition.
    pub fn leaf_count(&self) -> usize {
        match self.kind() {
            NodeKind::Stimulation => 1,
            NodeKind::Block => self.children.iter().map(|c| c.leaf_count()).sum(),
        }
    }
}
