use core::time::Duration;

use thiserror::Error;
use types::primitives::{Slot, UnixSeconds, H256};

use crate::summarizer::Stage;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("checkpoint field {field} would move backwards from {stored} to {new}")]
    CheckpointRegression {
        field: &'static str,
        stored: u64,
        new: u64,
    },
    #[error(
        "validator day checkpoint moved backwards while pruning \
         (summarized up to: {summarized:?}, stored: {stored:?})"
    )]
    DayCheckpointRegression {
        summarized: Option<UnixSeconds>,
        stored: Option<UnixSeconds>,
    },
    #[error("parent {parent_root:?} of block at slot {slot} is missing")]
    MissingParentBlock { slot: Slot, parent_root: H256 },
    #[error("parent of block at slot {slot} is at slot {parent_slot}, which is not earlier")]
    ParentNotEarlier { slot: Slot, parent_slot: Slot },
    #[error("{stage} stage did not finish within {timeout:?}")]
    StageTimedOut { stage: Stage, timeout: Duration },
}

impl Error {
    /// Whether the error means that persisted data contradicts itself.
    ///
    /// Such errors need operator attention. Other errors are expected to clear up on their own.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        match self {
            Self::CheckpointRegression { .. }
            | Self::DayCheckpointRegression { .. }
            | Self::MissingParentBlock { .. }
            | Self::ParentNotEarlier { .. } => true,
            Self::StageTimedOut { .. } => false,
        }
    }
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ConfigError {
    #[error("periodic validator rollups require validator summaries to be enabled")]
    PeriodicRollupsWithoutValidatorSummaries,
    #[error("validator epoch retention requires periodic validator rollups to be enabled")]
    RetentionWithoutPeriodicRollups,
    #[error("summarizer stage timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid retention period {input:?}; expected an ISO 8601 period such as P1Y2M3W4D")]
    InvalidRetentionPeriod { input: String },
}
