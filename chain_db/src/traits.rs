//! Capabilities the summarizer needs from the chain database.
//!
//! Each trait covers one kind of data so that consumers can state exactly what they read and
//! write. [`ChainDataProvider`] and [`SummaryStore`] bundle them for the common case.

use core::ops::Range;

use anyhow::Result;
use async_trait::async_trait;
use types::{
    checkpoint::Checkpoint,
    containers::{
        Attestation, AttesterSlashing, Block, ProposerDuty, ProposerSlashing, Validator,
        ValidatorBalance,
    },
    primitives::{Epoch, Slot, H256},
    summaries::{BlockSummary, EpochSummary, ValidatorDaySummary, ValidatorEpochSummary},
};

#[async_trait]
pub trait BlocksProvider: Send + Sync {
    /// Canonical blocks in `slots`, ordered by slot.
    async fn canonical_blocks(&self, slots: Range<Slot>) -> Result<Vec<Block>>;

    async fn block_by_root(&self, root: H256) -> Result<Option<Block>>;
}

#[async_trait]
pub trait AttestationsProvider: Send + Sync {
    /// Canonical attestations for slots in `slots`, ordered by inclusion.
    async fn attestations_for_slots(&self, slots: Range<Slot>) -> Result<Vec<Attestation>>;

    /// Canonical attestations included in blocks in `slots`, ordered by inclusion.
    async fn attestations_included_in_slots(&self, slots: Range<Slot>)
        -> Result<Vec<Attestation>>;
}

#[async_trait]
pub trait ValidatorsProvider: Send + Sync {
    /// All known validators, ordered by index.
    async fn validators(&self) -> Result<Vec<Validator>>;

    /// Balances of all validators at the start of `epoch`, ordered by validator index.
    ///
    /// Returns `None` if balances for `epoch` have not been stored yet.
    async fn validator_balances_at_epoch(
        &self,
        epoch: Epoch,
    ) -> Result<Option<Vec<ValidatorBalance>>>;
}

#[async_trait]
pub trait ProposerDutiesProvider: Send + Sync {
    async fn proposer_duties(&self, slots: Range<Slot>) -> Result<Vec<ProposerDuty>>;
}

#[async_trait]
pub trait SlashingsProvider: Send + Sync {
    /// Proposer slashings included in canonical blocks in `slots`.
    async fn proposer_slashings(&self, slots: Range<Slot>) -> Result<Vec<ProposerSlashing>>;

    /// Attester slashings included in canonical blocks in `slots`.
    async fn attester_slashings(&self, slots: Range<Slot>) -> Result<Vec<AttesterSlashing>>;
}

#[async_trait]
pub trait FinalityProvider: Send + Sync {
    /// Latest finalized epoch as reported by the ingester, or 0 if nothing is finalized.
    async fn finalized_epoch(&self) -> Result<Epoch>;
}

pub trait ChainDataProvider:
    BlocksProvider
    + AttestationsProvider
    + ValidatorsProvider
    + ProposerDutiesProvider
    + SlashingsProvider
{
}

impl<T> ChainDataProvider for T where
    T: BlocksProvider
        + AttestationsProvider
        + ValidatorsProvider
        + ProposerDutiesProvider
        + SlashingsProvider
{
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns [`Checkpoint::default`] if no checkpoint has been stored yet.
    async fn checkpoint(&self) -> Result<Checkpoint>;

    async fn set_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;
}

#[async_trait]
pub trait EpochSummariesSetter: Send + Sync {
    async fn set_epoch_summary(&self, summary: EpochSummary) -> Result<()>;
}

#[async_trait]
pub trait BlockSummariesSetter: Send + Sync {
    async fn set_block_summaries(&self, summaries: Vec<BlockSummary>) -> Result<()>;
}

#[async_trait]
pub trait ValidatorEpochSummariesStore: Send + Sync {
    async fn set_validator_epoch_summaries(
        &self,
        summaries: Vec<ValidatorEpochSummary>,
    ) -> Result<()>;

    /// Summaries for epochs in `epochs`, ordered by epoch and then validator index.
    async fn validator_epoch_summaries(
        &self,
        epochs: Range<Epoch>,
    ) -> Result<Vec<ValidatorEpochSummary>>;

    /// Deletes summaries for epochs before `epoch` and returns the number of deleted rows.
    async fn prune_validator_epoch_summaries(&self, epoch: Epoch) -> Result<u64>;
}

#[async_trait]
pub trait ValidatorDaySummariesSetter: Send + Sync {
    async fn set_validator_day_summaries(&self, summaries: Vec<ValidatorDaySummary>)
        -> Result<()>;
}

pub trait SummaryStore:
    CheckpointStore
    + EpochSummariesSetter
    + BlockSummariesSetter
    + ValidatorEpochSummariesStore
    + ValidatorDaySummariesSetter
{
}

impl<T> SummaryStore for T where
    T: CheckpointStore
        + EpochSummariesSetter
        + BlockSummariesSetter
        + ValidatorEpochSummariesStore
        + ValidatorDaySummariesSetter
{
}
