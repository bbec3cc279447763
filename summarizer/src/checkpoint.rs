use std::sync::Arc;

use anyhow::Result;
use chain_db::CheckpointStore;
use log::{error, info};
use prometheus_metrics::Metrics;
use strum::IntoStaticStr;
use types::{
    checkpoint::Checkpoint,
    primitives::{Epoch, UnixSeconds},
};

use crate::error::Error;

/// Completion of one unit of work, recorded in the checkpoint.
#[derive(Clone, Copy, Debug, IntoStaticStr)]
pub enum Progress {
    #[strum(serialize = "last_epoch")]
    Epoch(Epoch),
    #[strum(serialize = "last_block_epoch")]
    BlockEpoch(Epoch),
    #[strum(serialize = "last_validator_epoch")]
    ValidatorEpoch(Epoch),
    #[strum(serialize = "last_validator_day")]
    ValidatorDay(UnixSeconds),
}

/// Reads and writes the persisted [`Checkpoint`].
///
/// Nothing is cached. Every read goes to the store so that each stage sees the progress made by
/// the stages before it.
pub struct CheckpointAccessor<S> {
    store: Arc<S>,
    metrics: Option<Arc<Metrics>>,
}

impl<S: CheckpointStore> CheckpointAccessor<S> {
    #[must_use]
    pub const fn new(store: Arc<S>, metrics: Option<Arc<Metrics>>) -> Self {
        Self { store, metrics }
    }

    pub async fn read(&self) -> Result<Checkpoint> {
        self.store.checkpoint().await
    }

    /// Records `progress` and persists the checkpoint.
    ///
    /// Recording the same progress again is allowed. Moving a field backwards is not.
    pub async fn advance(&self, progress: Progress) -> Result<Checkpoint> {
        let mut checkpoint = self.read().await?;

        let (stored, new) = match progress {
            Progress::Epoch(epoch) => (
                Some(core::mem::replace(&mut checkpoint.last_epoch, epoch)),
                epoch,
            ),
            Progress::BlockEpoch(epoch) => (
                Some(core::mem::replace(&mut checkpoint.last_block_epoch, epoch)),
                epoch,
            ),
            Progress::ValidatorEpoch(epoch) => (
                Some(core::mem::replace(
                    &mut checkpoint.last_validator_epoch,
                    epoch,
                )),
                epoch,
            ),
            Progress::ValidatorDay(day) => (checkpoint.last_validator_day.replace(day), day),
        };

        if let Some(stored) = stored.filter(|stored| new < *stored) {
            let error = Error::CheckpointRegression {
                field: progress.into(),
                stored,
                new,
            };

            error!("refusing to update summarizer checkpoint: {error}");

            return Err(error.into());
        }

        self.store.set_checkpoint(&checkpoint).await?;

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_summarizer_checkpoint(&checkpoint);
        }

        Ok(checkpoint)
    }

    /// Turns on periodic validator rollups in the persisted checkpoint.
    ///
    /// There is no way to turn them off again. Once epoch-level rows may have been pruned,
    /// day summaries are the only record of them.
    pub async fn enable_periodic_validator_rollups(&self) -> Result<()> {
        let mut checkpoint = self.read().await?;

        if checkpoint.periodic_validator_rollups {
            return Ok(());
        }

        checkpoint.periodic_validator_rollups = true;

        self.store.set_checkpoint(&checkpoint).await?;

        info!("enabled periodic validator rollups");

        Ok(())
    }
}
