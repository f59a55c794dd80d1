//! Tuning handshake between the FL round driver and the RL episode driver
//!
//! Two one-shot signal pairs keep the flows strictly alternating:
//! - **Value ready:** the RL side publishes the tuned value for the next
//!   round, the FL side consumes it before dispatching that round
//! - **Step complete:** the FL side posts a round outcome, the RL side
//!   consumes it before computing the next action
//!
//! A signal is a latched flag that is cleared by the single consumer, so a
//! second publish before consumption is reported as a desynchronization
//! instead of being queued.

mod error;
mod signal;
mod tuning;

pub use error::HandshakeError;
pub use signal::Signal;
pub use tuning::{RoundObservation, TuningHandshake};
