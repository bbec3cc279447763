//! An in-memory chain database with hooks for driving the summarizer into failure paths.

use core::{num::NonZeroU64, ops::Range, time::Duration};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chain_db::{
    AttestationsProvider, BlockSummariesSetter, BlocksProvider, CheckpointStore,
    EpochSummariesSetter, ProposerDutiesProvider, SlashingsProvider, ValidatorDaySummariesSetter,
    ValidatorEpochSummariesStore, ValidatorsProvider,
};
use clock::ChainClock;
use tokio::sync::{Notify, Semaphore};
use types::{
    checkpoint::Checkpoint,
    consts::FAR_FUTURE_EPOCH,
    containers::{
        Attestation, AttesterSlashing, Block, ProposerDuty, ProposerSlashing, Validator,
        ValidatorBalance,
    },
    primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
    summaries::{BlockSummary, EpochSummary, ValidatorDaySummary, ValidatorEpochSummary},
};

use crate::{checkpoint::CheckpointAccessor, config::SummarizerConfig, context::Context};

// 2020-12-01T12:00:00Z
pub const GENESIS_TIME: UnixSeconds = 1_606_824_000;
pub const VALIDATOR_COUNT: u64 = 4;
pub const EFFECTIVE_BALANCE: Gwei = 32_000_000_000;

pub fn context(
    chain_db: &Arc<FakeChainDb>,
    config: SummarizerConfig,
) -> Context<FakeChainDb, FakeChainDb> {
    Context {
        chain_data: Arc::clone(chain_db),
        store: Arc::clone(chain_db),
        checkpoints: CheckpointAccessor::new(Arc::clone(chain_db), None),
        clock: test_clock(),
        config,
        metrics: None,
    }
}

/// A clock with 4 slots per epoch and 4 epochs per day.
pub fn test_clock() -> ChainClock {
    ChainClock::new(
        GENESIS_TIME,
        Duration::from_secs(5400),
        NonZeroU64::new(4).expect("4 is nonzero"),
    )
    .expect("test clock parameters are valid")
}

pub fn block_root(slot: Slot) -> H256 {
    H256::from_low_u64_be(slot + 1)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operation {
    SetEpochSummary(Epoch),
    SetBlockSummaries,
    SetValidatorEpochSummaries,
    SetValidatorDaySummaries(UnixSeconds),
    PruneValidatorEpochSummaries(Epoch),
}

#[derive(Default)]
struct State {
    blocks: BTreeMap<H256, Block>,
    attestations: Vec<Attestation>,
    validators: BTreeMap<ValidatorIndex, Validator>,
    balances: BTreeMap<Epoch, Vec<ValidatorBalance>>,
    proposer_duties: BTreeMap<Slot, ProposerDuty>,
    proposer_slashings: Vec<ProposerSlashing>,
    attester_slashings: Vec<AttesterSlashing>,
    checkpoint: Checkpoint,
    epoch_summaries: BTreeMap<Epoch, EpochSummary>,
    block_summaries: BTreeMap<Slot, BlockSummary>,
    validator_epoch_summaries: BTreeMap<(Epoch, ValidatorIndex), ValidatorEpochSummary>,
    validator_day_summaries: BTreeMap<(UnixSeconds, ValidatorIndex), ValidatorDaySummary>,
    operations: Vec<Operation>,
    fail_epoch_summaries_from: Option<Epoch>,
    pause: Option<(Arc<Notify>, Arc<Semaphore>)>,
}

#[derive(Default)]
pub struct FakeChainDb {
    state: Mutex<State>,
}

impl FakeChainDb {
    /// A chain where every slot in `epochs` has a canonical block and every validator makes one
    /// correct attestation per epoch that is included in the following slot.
    pub fn with_chain(clock: &ChainClock, epochs: Range<Epoch>) -> Self {
        let chain_db = Self::default();

        chain_db.add_validators((0..VALIDATOR_COUNT).map(|index| Validator {
            index,
            activation_eligibility_epoch: 0,
            activation_epoch: 0,
            exit_epoch: FAR_FUTURE_EPOCH,
            slashed: false,
        }));

        for epoch in epochs {
            chain_db.add_balances(epoch, (0..VALIDATOR_COUNT).map(|index| (index, epoch)));

            for slot in clock.slots_in_epoch(epoch) {
                let proposer_index = slot % VALIDATOR_COUNT;

                chain_db.add_block(Block {
                    slot,
                    root: block_root(slot),
                    parent_root: slot.checked_sub(1).map(block_root).unwrap_or_default(),
                    proposer_index,
                    canonical: Some(true),
                });

                chain_db.add_proposer_duty(ProposerDuty {
                    slot,
                    validator_index: proposer_index,
                });
            }

            for validator_index in 0..VALIDATOR_COUNT {
                let slot = clock.start_slot_of_epoch(epoch) + validator_index;
                chain_db.add_attestation(attestation(slot, slot + 1, vec![validator_index]));
            }
        }

        chain_db
    }

    pub fn add_validators(&self, validators: impl IntoIterator<Item = Validator>) {
        let mut state = self.state();

        for validator in validators {
            state.validators.insert(validator.index, validator);
        }
    }

    /// Stores balances for `epoch` given as `(validator_index, balance above effective)` pairs.
    pub fn add_balances(
        &self,
        epoch: Epoch,
        balances: impl IntoIterator<Item = (ValidatorIndex, Gwei)>,
    ) {
        let balances = balances
            .into_iter()
            .map(|(index, excess)| ValidatorBalance {
                index,
                epoch,
                balance: EFFECTIVE_BALANCE + excess,
                effective_balance: EFFECTIVE_BALANCE,
            })
            .collect();

        self.state().balances.insert(epoch, balances);
    }

    pub fn remove_balances_from(&self, epoch: Epoch) {
        self.state().balances.retain(|stored, _| *stored < epoch);
    }

    pub fn add_block(&self, block: Block) {
        self.state().blocks.insert(block.root, block);
    }

    pub fn remove_block(&self, slot: Slot) {
        self.state().blocks.retain(|_, block| block.slot != slot);
    }

    pub fn add_attestation(&self, attestation: Attestation) {
        self.state().attestations.push(attestation);
    }

    pub fn add_proposer_duty(&self, duty: ProposerDuty) {
        self.state().proposer_duties.insert(duty.slot, duty);
    }

    pub fn add_proposer_slashing(&self, slashing: ProposerSlashing) {
        self.state().proposer_slashings.push(slashing);
    }

    pub fn add_attester_slashing(&self, slashing: AttesterSlashing) {
        self.state().attester_slashings.push(slashing);
    }

    pub fn put_checkpoint(&self, checkpoint: Checkpoint) {
        self.state().checkpoint = checkpoint;
    }

    pub fn stored_checkpoint(&self) -> Checkpoint {
        self.state().checkpoint
    }

    pub fn fail_epoch_summaries_from(&self, epoch: Epoch) {
        self.state().fail_epoch_summaries_from = Some(epoch);
    }

    /// Makes the next reads of validator balances wait until permits are added to the returned
    /// semaphore. The returned [`Notify`] is notified every time a read starts waiting.
    pub fn pause_balance_reads(&self) -> (Arc<Notify>, Arc<Semaphore>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Semaphore::new(0));

        self.state().pause = Some((Arc::clone(&entered), Arc::clone(&release)));

        (entered, release)
    }

    pub fn epoch_summaries(&self) -> BTreeMap<Epoch, EpochSummary> {
        self.state().epoch_summaries.clone()
    }

    pub fn block_summaries(&self) -> BTreeMap<Slot, BlockSummary> {
        self.state().block_summaries.clone()
    }

    pub fn stored_validator_epoch_summaries(
        &self,
    ) -> BTreeMap<(Epoch, ValidatorIndex), ValidatorEpochSummary> {
        self.state().validator_epoch_summaries.clone()
    }

    pub fn validator_day_summaries(
        &self,
    ) -> BTreeMap<(UnixSeconds, ValidatorIndex), ValidatorDaySummary> {
        self.state().validator_day_summaries.clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.state().operations.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake chain database mutex is poisoned")
    }
}

pub fn attestation(
    slot: Slot,
    inclusion_slot: Slot,
    attesting_indices: Vec<ValidatorIndex>,
) -> Attestation {
    Attestation {
        inclusion_slot,
        inclusion_block_root: block_root(inclusion_slot),
        inclusion_index: 0,
        slot,
        committee_index: 0,
        attesting_indices,
        beacon_block_root: block_root(slot),
        source_epoch: 0,
        target_epoch: 0,
        target_root: H256::zero(),
        canonical: Some(true),
        target_correct: Some(true),
        head_correct: Some(true),
    }
}

fn in_range(slots: &Range<Slot>, slot: Slot) -> bool {
    slots.contains(&slot)
}

#[async_trait]
impl BlocksProvider for FakeChainDb {
    async fn canonical_blocks(&self, slots: Range<Slot>) -> Result<Vec<Block>> {
        let mut blocks = self
            .state()
            .blocks
            .values()
            .filter(|block| block.canonical == Some(true) && in_range(&slots, block.slot))
            .copied()
            .collect::<Vec<_>>();

        blocks.sort_by_key(|block| block.slot);

        Ok(blocks)
    }

    async fn block_by_root(&self, root: H256) -> Result<Option<Block>> {
        Ok(self.state().blocks.get(&root).copied())
    }
}

#[async_trait]
impl AttestationsProvider for FakeChainDb {
    async fn attestations_for_slots(&self, slots: Range<Slot>) -> Result<Vec<Attestation>> {
        let mut attestations = self
            .state()
            .attestations
            .iter()
            .filter(|attestation| {
                attestation.canonical == Some(true) && in_range(&slots, attestation.slot)
            })
            .cloned()
            .collect::<Vec<_>>();

        attestations.sort_by_key(|attestation| {
            (attestation.inclusion_slot, attestation.inclusion_index)
        });

        Ok(attestations)
    }

    async fn attestations_included_in_slots(
        &self,
        slots: Range<Slot>,
    ) -> Result<Vec<Attestation>> {
        let mut attestations = self
            .state()
            .attestations
            .iter()
            .filter(|attestation| {
                attestation.canonical == Some(true)
                    && in_range(&slots, attestation.inclusion_slot)
            })
            .cloned()
            .collect::<Vec<_>>();

        attestations.sort_by_key(|attestation| {
            (attestation.inclusion_slot, attestation.inclusion_index)
        });

        Ok(attestations)
    }
}

#[async_trait]
impl ValidatorsProvider for FakeChainDb {
    async fn validators(&self) -> Result<Vec<Validator>> {
        Ok(self.state().validators.values().copied().collect())
    }

    async fn validator_balances_at_epoch(
        &self,
        epoch: Epoch,
    ) -> Result<Option<Vec<ValidatorBalance>>> {
        let pause = self.state().pause.clone();

        if let Some((entered, release)) = pause {
            entered.notify_one();
            release.acquire().await?.forget();
        }

        Ok(self.state().balances.get(&epoch).cloned())
    }
}

#[async_trait]
impl ProposerDutiesProvider for FakeChainDb {
    async fn proposer_duties(&self, slots: Range<Slot>) -> Result<Vec<ProposerDuty>> {
        Ok(self
            .state()
            .proposer_duties
            .range(slots)
            .map(|(_, duty)| *duty)
            .collect())
    }
}

#[async_trait]
impl SlashingsProvider for FakeChainDb {
    async fn proposer_slashings(&self, slots: Range<Slot>) -> Result<Vec<ProposerSlashing>> {
        Ok(self
            .state()
            .proposer_slashings
            .iter()
            .filter(|slashing| in_range(&slots, slashing.inclusion_slot))
            .copied()
            .collect())
    }

    async fn attester_slashings(&self, slots: Range<Slot>) -> Result<Vec<AttesterSlashing>> {
        Ok(self
            .state()
            .attester_slashings
            .iter()
            .filter(|slashing| in_range(&slots, slashing.inclusion_slot))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CheckpointStore for FakeChainDb {
    async fn checkpoint(&self) -> Result<Checkpoint> {
        Ok(self.stored_checkpoint())
    }

    async fn set_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.put_checkpoint(*checkpoint);
        Ok(())
    }
}

#[async_trait]
impl EpochSummariesSetter for FakeChainDb {
    async fn set_epoch_summary(&self, summary: EpochSummary) -> Result<()> {
        let mut state = self.state();

        if state
            .fail_epoch_summaries_from
            .is_some_and(|epoch| summary.epoch >= epoch)
        {
            bail!("injected failure writing epoch summary for epoch {}", summary.epoch);
        }

        state.operations.push(Operation::SetEpochSummary(summary.epoch));
        state.epoch_summaries.insert(summary.epoch, summary);

        Ok(())
    }
}

#[async_trait]
impl BlockSummariesSetter for FakeChainDb {
    async fn set_block_summaries(&self, summaries: Vec<BlockSummary>) -> Result<()> {
        let mut state = self.state();

        state.operations.push(Operation::SetBlockSummaries);

        for summary in summaries {
            state.block_summaries.insert(summary.slot, summary);
        }

        Ok(())
    }
}

#[async_trait]
impl ValidatorEpochSummariesStore for FakeChainDb {
    async fn set_validator_epoch_summaries(
        &self,
        summaries: Vec<ValidatorEpochSummary>,
    ) -> Result<()> {
        let mut state = self.state();

        state.operations.push(Operation::SetValidatorEpochSummaries);

        for summary in summaries {
            state
                .validator_epoch_summaries
                .insert((summary.epoch, summary.validator_index), summary);
        }

        Ok(())
    }

    async fn validator_epoch_summaries(
        &self,
        epochs: Range<Epoch>,
    ) -> Result<Vec<ValidatorEpochSummary>> {
        Ok(self
            .state()
            .validator_epoch_summaries
            .range((epochs.start, 0)..(epochs.end, 0))
            .map(|(_, summary)| *summary)
            .collect())
    }

    async fn prune_validator_epoch_summaries(&self, epoch: Epoch) -> Result<u64> {
        let mut state = self.state();
        let before = state.validator_epoch_summaries.len();

        state
            .validator_epoch_summaries
            .retain(|(stored_epoch, _), _| *stored_epoch >= epoch);

        state
            .operations
            .push(Operation::PruneValidatorEpochSummaries(epoch));

        Ok(u64::try_from(before - state.validator_epoch_summaries.len())?)
    }
}

#[async_trait]
impl ValidatorDaySummariesSetter for FakeChainDb {
    async fn set_validator_day_summaries(
        &self,
        summaries: Vec<ValidatorDaySummary>,
    ) -> Result<()> {
        let mut state = self.state();

        for summary in summaries {
            state.operations.push(Operation::SetValidatorDaySummaries(
                summary.start_timestamp,
            ));

            state
                .validator_day_summaries
                .insert((summary.start_timestamp, summary.validator_index), summary);
        }

        Ok(())
    }
}
