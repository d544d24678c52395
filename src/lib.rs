//! Real-time Morse code tone engine.
//!
//! A bounded tone queue, a sample-synthesizing generator, an adaptive
//! receiver, and straight-key/iambic-keyer state machines, all built
//! around a pluggable [`sink::Sink`] trait so the core never couples to a
//! concrete audio backend.

pub mod generator;
pub mod keyer;
pub mod limits;
pub mod receiver;
pub mod sink;
pub mod slope;
pub mod straight_key;
pub mod synth;
pub mod table;
pub mod timing;
pub mod tone;

pub use generator::{Generator, MarkKind};
pub use keyer::{IambicCore, IambicKeyer, KeyerState};
pub use receiver::{PolledRepresentation, ReceiveState, ReceiveStatistics, Receiver};
pub use sink::{Sink, SinkConfig};
pub use slope::{SlopeShape, SlopeTable};
pub use straight_key::StraightKey;
pub use timing::Timing;
pub use tone::{DequeueOutcome, EnqueueOutcome, SlopeMode, Tone};

use thiserror::Error;

/// Error kinds surfaced by the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CwError {
    #[error("invalid argument: {0}")]
    Invalid(String),
    #[error("tone queue is full")]
    Full,
    #[error("operation not permitted in current state: {0}")]
    Busy(&'static str),
    #[error("not ready: character/word boundary not yet crossed")]
    NotReady,
    #[error("audio sink error: {0}")]
    SinkError(String),
}
