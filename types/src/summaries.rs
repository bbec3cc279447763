use serde::{Deserialize, Serialize};

use crate::primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex};

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EpochSummary {
    pub epoch: Epoch,
    pub activating_validators: u64,
    pub active_validators: u64,
    pub active_real_balance: Gwei,
    pub active_balance: Gwei,
    pub attesting_validators: u64,
    pub attesting_balance: Gwei,
    pub target_correct_validators: u64,
    pub target_correct_balance: Gwei,
    pub head_correct_validators: u64,
    pub head_correct_balance: Gwei,
    pub attestations_for_epoch: u64,
    pub attestations_in_epoch: u64,
    pub duplicate_attestations_for_epoch: u64,
    pub proposer_slashings: u64,
    pub attester_slashings: u64,
    pub exiting_validators: u64,
    pub canonical_blocks: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlockSummary {
    pub slot: Slot,
    pub attestations_for_block: u64,
    pub duplicate_attestations_for_block: u64,
    pub votes_for_block: u64,
    pub parent_distance: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorEpochSummary {
    pub validator_index: ValidatorIndex,
    pub epoch: Epoch,
    pub proposer_duties: u64,
    pub proposals_included: u64,
    pub attestation_included: bool,
    pub attestation_target_correct: Option<bool>,
    pub attestation_head_correct: Option<bool>,
    pub attestation_inclusion_delay: Option<u64>,
    pub attestation_source_timely: Option<bool>,
    pub attestation_target_timely: Option<bool>,
    pub attestation_head_timely: Option<bool>,
}

/// Validator performance over one UTC day.
///
/// `start_timestamp` is the UTC midnight the day starts at.
/// Balances are taken at the first epoch starting in the day and the first epoch starting in the
/// following day.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorDaySummary {
    pub validator_index: ValidatorIndex,
    pub start_timestamp: UnixSeconds,
    pub start_balance: Gwei,
    pub start_effective_balance: Gwei,
    pub end_balance: Gwei,
    pub end_effective_balance: Gwei,
    pub proposer_duties: u64,
    pub proposals_included: u64,
    pub attestations: u64,
    pub attestations_included: u64,
    pub attestations_target_correct: u64,
    pub attestations_head_correct: u64,
    pub attestations_source_timely: u64,
    pub attestations_target_timely: u64,
    pub attestations_head_timely: u64,
    pub attestations_inclusion_delay_total: u64,
}

impl ValidatorDaySummary {
    #[must_use]
    pub const fn new(validator_index: ValidatorIndex, start_timestamp: UnixSeconds) -> Self {
        Self {
            validator_index,
            start_timestamp,
            start_balance: 0,
            start_effective_balance: 0,
            end_balance: 0,
            end_effective_balance: 0,
            proposer_duties: 0,
            proposals_included: 0,
            attestations: 0,
            attestations_included: 0,
            attestations_target_correct: 0,
            attestations_head_correct: 0,
            attestations_source_timely: 0,
            attestations_target_timely: 0,
            attestations_head_timely: 0,
            attestations_inclusion_delay_total: 0,
        }
    }

    pub fn fold(&mut self, summary: &ValidatorEpochSummary) {
        let count = |flag: Option<bool>| u64::from(flag == Some(true));

        self.proposer_duties += summary.proposer_duties;
        self.proposals_included += summary.proposals_included;
        self.attestations += 1;
        self.attestations_included += u64::from(summary.attestation_included);
        self.attestations_target_correct += count(summary.attestation_target_correct);
        self.attestations_head_correct += count(summary.attestation_head_correct);
        self.attestations_source_timely += count(summary.attestation_source_timely);
        self.attestations_target_timely += count(summary.attestation_target_timely);
        self.attestations_head_timely += count(summary.attestation_head_timely);
        self.attestations_inclusion_delay_total +=
            summary.attestation_inclusion_delay.unwrap_or_default();
    }
}
