use serde::{Deserialize, Serialize};

use crate::primitives::{Epoch, UnixSeconds};

/// Progress of every summary level.
///
/// All progress fields only ever move forward.
/// `last_validator_day` is `None` until the first day summary has been written.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub last_epoch: Epoch,
    pub last_block_epoch: Epoch,
    pub last_validator_epoch: Epoch,
    pub last_validator_day: Option<UnixSeconds>,
    pub periodic_validator_rollups: bool,
}

/// Epoch a stage resumes from given the last epoch it completed.
///
/// A zero checkpoint is indistinguishable from "nothing done yet",
/// so epoch 0 is summarized again until progress moves past it.
#[must_use]
pub const fn resume_epoch(last_completed: Epoch) -> Epoch {
    if last_completed == 0 {
        0
    } else {
        last_completed + 1
    }
}
