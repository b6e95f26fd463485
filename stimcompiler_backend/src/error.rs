//! Error types reported by the protocol model and the waveform synthesizer.
//!
//! Both kinds of error leave the protocol untouched: a rejected edit never partially applies,
//! and a failed synthesis pass yields no waveform at all.

use std::fmt;

use crate::protocol::NodeId;

/// Errors raised by structural and attribute edits on a [`crate::Protocol`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// The operation needs an anchor node but none (or a node that no longer exists) was given.
    #[error("no node selected")]
    NoSelection,

    /// An attribute write failed its constraint. The node keeps its previous value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ProtocolError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ProtocolError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Why a leaf could not be turned into generator arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    MissingParameter(&'static str),
    InvalidParameter { field: &'static str, value: f64 },
    TooManySamples { limit: usize },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MissingParameter(field) => write!(f, "{} is not set", field),
            FailureReason::InvalidParameter { field, value } => {
                write!(f, "{} = {} is not a valid generator argument", field, value)
            }
            FailureReason::TooManySamples { limit } => {
                write!(f, "protocol exceeds the limit of {} samples", limit)
            }
        }
    }
}

/// Errors raised by a synthesis pass.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SynthError {
    #[error("synthesis failed at node {node} ({name}): {reason}")]
    SynthesisFailed {
        node: NodeId,
        name: String,
        reason: FailureReason,
    },
}

pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;
