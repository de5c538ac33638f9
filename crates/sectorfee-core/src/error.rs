//! Error types for sectorfee computations

use thiserror::Error;

use crate::epoch::ChainEpoch;

/// Result type alias for sectorfee operations
pub type Result<T> = std::result::Result<T, EconError>;

/// Errors that can occur while computing sector economics
#[derive(Error, Debug, Clone)]
pub enum EconError {
    // === Validation ===
    /// Malformed or missing miner identifier
    #[error("invalid miner id: {0}")]
    InvalidMiner(String),

    /// Offset sign not allowed for this query
    #[error("offset can only be zero or negative, got {0}")]
    PositiveOffset(i64),

    /// Day offset too large to map onto an epoch
    #[error("offset of {0} days is out of range")]
    OffsetOutOfRange(i64),

    /// Deadline index outside the proving period
    #[error("deadline index {0} out of range")]
    DeadlineOutOfRange(u64),

    // === Upstream state fetches ===
    /// State adapter call failed (network, timeout, decode)
    #[error("upstream state query failed: {0}")]
    Upstream(String),

    /// State the computation requires was absent from the response
    #[error("missing chain state: {0}")]
    MissingState(String),

    // === Arithmetic ===
    /// A formula produced a division with a zero denominator
    #[error("division by zero while computing {0}")]
    DivisionByZero(&'static str),

    /// Vested funds decreased between consecutive days
    #[error("vesting anomaly at epoch {epoch}: vested total fell from {previous} to {current}")]
    VestingAnomaly {
        epoch: ChainEpoch,
        previous: String,
        current: String,
    },

    /// Vesting schedule did not drain to zero past its last entry
    #[error("vesting schedule stalled with {0} base units still locked")]
    VestingStalled(String),

    // === General ===
    /// Internal invariant failure (worker join, report build)
    #[error("internal error: {0}")]
    Internal(String),
}

impl EconError {
    /// HTTP status code this error maps to at the API surface
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidMiner(_)
            | Self::PositiveOffset(_)
            | Self::OffsetOutOfRange(_)
            | Self::DeadlineOutOfRange(_) => 400,
            _ => 500,
        }
    }

    /// True for errors caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        self.status_code() == 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EconError::InvalidMiner("x".into()).status_code(), 400);
        assert_eq!(EconError::PositiveOffset(3).status_code(), 400);
        assert_eq!(EconError::OffsetOutOfRange(i64::MIN).status_code(), 400);
        assert_eq!(EconError::Upstream("boom".into()).status_code(), 500);
        assert_eq!(EconError::DivisionByZero("fee").status_code(), 500);
    }

    #[test]
    fn test_client_error_classification() {
        assert!(EconError::PositiveOffset(1).is_client_error());
        assert!(!EconError::VestingStalled("10".into()).is_client_error());
    }

    #[test]
    fn test_display_mentions_epoch() {
        let err = EconError::VestingAnomaly {
            epoch: 100,
            previous: "5".into(),
            current: "4".into(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("epoch 100"));
    }
}
