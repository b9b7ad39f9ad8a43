use thiserror::Error;

use crate::types::{EntrantId, MatchId};

pub type BracketResult<T> = Result<T, BracketError>;

/// Every variant is a rejection: the bracket is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketError {
    #[error("A bracket needs at least two entrants, got {count}")]
    InsufficientEntrants { count: usize },

    #[error("Entrant id {0} appears more than once")]
    DuplicateEntrant(EntrantId),

    #[error("Invalid bracket shape: {0}")]
    InvalidBracketShape(String),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Invalid result: {0}")]
    InvalidResult(String),

    #[error("Snapshot does not replay to the same bracket: {0}")]
    SnapshotMismatch(String),
}

impl BracketError {
    /// Errors the caller can fix by re-submitting different input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BracketError::MatchNotFound(_) | BracketError::InvalidResult(_)
        )
    }
}
