//! Raw chain data as written by the ingester.
//!
//! `canonical`, `target_correct` and `head_correct` are filled in once the containing block is
//! finalized. `None` means the ingester has not made a decision yet.

use serde::{Deserialize, Serialize};

use crate::primitives::{AttestationIndex, CommitteeIndex, Epoch, Gwei, Slot, ValidatorIndex, H256};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub slot: Slot,
    pub root: H256,
    pub parent_root: H256,
    pub proposer_index: ValidatorIndex,
    pub canonical: Option<bool>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Attestation {
    pub inclusion_slot: Slot,
    pub inclusion_block_root: H256,
    pub inclusion_index: AttestationIndex,
    pub slot: Slot,
    pub committee_index: CommitteeIndex,
    pub attesting_indices: Vec<ValidatorIndex>,
    pub beacon_block_root: H256,
    pub source_epoch: Epoch,
    pub target_epoch: Epoch,
    pub target_root: H256,
    pub canonical: Option<bool>,
    pub target_correct: Option<bool>,
    pub head_correct: Option<bool>,
}

impl Attestation {
    #[must_use]
    pub const fn inclusion_delay(&self) -> u64 {
        self.inclusion_slot.saturating_sub(self.slot)
    }

    #[must_use]
    pub fn is_target_correct(&self) -> bool {
        self.target_correct == Some(true)
    }

    #[must_use]
    pub fn is_head_correct(&self) -> bool {
        self.head_correct == Some(true)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Validator {
    pub index: ValidatorIndex,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub slashed: bool,
}

impl Validator {
    #[must_use]
    pub const fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorBalance {
    pub index: ValidatorIndex,
    pub epoch: Epoch,
    pub balance: Gwei,
    pub effective_balance: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProposerDuty {
    pub slot: Slot,
    pub validator_index: ValidatorIndex,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProposerSlashing {
    pub inclusion_slot: Slot,
    pub inclusion_block_root: H256,
    pub inclusion_index: u64,
    pub proposer_index: ValidatorIndex,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttesterSlashing {
    pub inclusion_slot: Slot,
    pub inclusion_block_root: H256,
    pub inclusion_index: u64,
    pub slashed_indices: Vec<ValidatorIndex>,
}
