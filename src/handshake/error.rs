//! Handshake error types

use thiserror::Error;

/// Protocol violations detected by the handshake
///
/// Every variant means the two flows have lost lockstep. Callers treat them
/// as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("Protocol desynchronized: tuned value published for round {requested}, expected round {expected}")]
    Desynchronized { requested: u32, expected: u32 },

    #[error("Protocol desynchronized: tuned value for round {round} published before the previous value was consumed")]
    UnconsumedValue { round: u32 },

    #[error(
        "Protocol desynchronized: tuned value for round {requested} published before the outcome of round {outstanding} was consumed"
    )]
    OutcomeOutstanding { requested: u32, outstanding: u32 },

    #[error("Protocol desynchronized: outcome of round {round} posted before the previous outcome was consumed")]
    UnconsumedOutcome { round: u32 },

    #[error("Value ready was signaled without a stored tuned value")]
    MissingValue,

    #[error("Step complete was signaled without a posted outcome")]
    MissingOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desync_message_names_both_rounds() {
        let msg = HandshakeError::Desynchronized {
            requested: 5,
            expected: 3,
        }
        .to_string();
        assert!(msg.contains("round 5"));
        assert!(msg.contains("expected round 3"));
    }

    #[test]
    fn test_outstanding_message_names_both_rounds() {
        let msg = HandshakeError::OutcomeOutstanding {
            requested: 2,
            outstanding: 1,
        }
        .to_string();
        assert!(msg.contains("round 2"));
        assert!(msg.contains("outcome of round 1"));
    }
}
