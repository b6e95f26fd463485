//! Protocol model, waveform synthesizer and preview downsampler for stimulation protocols.
//!
//! A protocol is an ordered forest edited through [`BaseProtocol`]. Before synthesis it is
//! copied into a [`ProtocolTree`], which [`Synthesizer`] expands into one composite
//! [`Waveform`] and [`Synthesizer::preview`] reduces for plotting.

pub mod error;
pub mod node;
pub mod preview;
pub mod protocol;
pub mod pulse;
pub mod synthesizer;
pub mod utils;

pub use error::*;
pub use node::*;
pub use preview::*;
pub use protocol::*;
pub use pulse::*;
pub use synthesizer::*;
pub use utils::*;
