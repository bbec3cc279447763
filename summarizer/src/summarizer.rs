use core::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chain_db::{ChainDataProvider, SummaryStore};
use clock::ChainClock;
use log::{debug, error, warn};
use prometheus_metrics::Metrics;
use strum::{AsRefStr, Display};
use tokio::sync::Semaphore;
use types::primitives::Epoch;

use crate::{
    blocks::summarize_blocks,
    checkpoint::CheckpointAccessor,
    config::SummarizerConfig,
    context::Context,
    days::summarize_days,
    epochs::summarize_epochs,
    error::Error,
    pruner::prune_validator_epoch_summaries,
    validators::summarize_validators,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Epochs,
    Blocks,
    Validators,
    ValidatorDays,
    Pruning,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PassOutcome {
    NothingFinalized,
    /// Another pass was running. The update was dropped.
    Busy,
    Completed,
    Aborted { stage: Stage },
}

pub struct Summarizer<D, S> {
    context: Context<D, S>,
    gate: Semaphore,
}

impl<D: ChainDataProvider, S: SummaryStore> Summarizer<D, S> {
    pub async fn new(
        chain_data: Arc<D>,
        store: Arc<S>,
        clock: ChainClock,
        config: SummarizerConfig,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        config.validate()?;

        let checkpoints = CheckpointAccessor::new(Arc::clone(&store), metrics.clone());

        if config.enable_periodic_validator_rollups {
            checkpoints.enable_periodic_validator_rollups().await?;
        }

        if let Some(metrics) = metrics.as_ref() {
            metrics.set_summarizer_checkpoint(&checkpoints.read().await?);
        }

        Ok(Self {
            context: Context {
                chain_data,
                store,
                checkpoints,
                clock,
                config,
                metrics,
            },
            gate: Semaphore::new(1),
        })
    }

    /// Brings every summary level up to the epoch before `finalized_epoch`.
    ///
    /// Returns immediately if another pass is in progress.
    pub async fn on_finality_updated(&self, finalized_epoch: Epoch) -> PassOutcome {
        let Some(summary_epoch) = finalized_epoch.checked_sub(1) else {
            return PassOutcome::NothingFinalized;
        };

        let Ok(_permit) = self.gate.try_acquire() else {
            debug!("summarizer is busy; skipping pass for finalized epoch {finalized_epoch}");

            if let Some(metrics) = self.context.metrics.as_ref() {
                metrics.register_summarizer_skipped_pass();
            }

            return PassOutcome::Busy;
        };

        if let Err(stage) = self.run_pass(summary_epoch).await {
            return PassOutcome::Aborted { stage };
        }

        if let Some(metrics) = self.context.metrics.as_ref() {
            metrics.set_summarizer_latest_epoch(finalized_epoch);
        }

        PassOutcome::Completed
    }

    async fn run_pass(&self, summary_epoch: Epoch) -> Result<(), Stage> {
        let context = &self.context;

        self.run_stage(Stage::Epochs, summarize_epochs(context, summary_epoch))
            .await?;

        self.run_stage(Stage::Blocks, summarize_blocks(context, summary_epoch))
            .await?;

        self.run_stage(Stage::Validators, summarize_validators(context, summary_epoch))
            .await?;

        let receipt = self
            .run_stage(Stage::ValidatorDays, summarize_days(context))
            .await?;

        if let Some(receipt) = receipt {
            self.run_stage(
                Stage::Pruning,
                prune_validator_epoch_summaries(context, summary_epoch, receipt),
            )
            .await?;
        }

        Ok(())
    }

    async fn run_stage<T>(
        &self,
        stage: Stage,
        future: impl Future<Output = Result<T>> + Send,
    ) -> Result<T, Stage> {
        let metrics = self.context.metrics.as_ref();
        let timeout = self.context.config.timeout;

        let timer =
            metrics.and_then(|metrics| metrics.start_summarizer_stage_timer(stage.as_ref()));

        let result = tokio::time::timeout(timeout, future)
            .await
            .unwrap_or_else(|_| Err(Error::StageTimedOut { stage, timeout }.into()));

        match result {
            Ok(value) => {
                drop(timer);
                Ok(value)
            }
            Err(error) => {
                if let Some(timer) = timer {
                    timer.stop_and_discard();
                }

                let invariant_violation = error
                    .downcast_ref::<Error>()
                    .is_some_and(Error::is_invariant_violation);

                if invariant_violation {
                    error!("summarizer {stage} stage found inconsistent data: {error:?}");
                } else {
                    warn!("summarizer {stage} stage failed: {error:?}");
                }

                if let Some(metrics) = metrics {
                    metrics.register_summarizer_stage_failure(stage.as_ref());
                }

                Err(stage)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use types::{
        checkpoint::Checkpoint,
        consts::SECONDS_PER_DAY,
        containers::Block,
        primitives::{UnixSeconds, H256},
    };

    use crate::{
        config::RetentionPeriod,
        error::ConfigError,
        fake_chain_db::{block_root, test_clock, FakeChainDb, Operation},
    };

    use super::*;

    // 2020-12-01T00:00:00Z
    const DECEMBER_1: UnixSeconds = 1_606_780_800;
    const DECEMBER_2: UnixSeconds = DECEMBER_1 + SECONDS_PER_DAY;

    fn chain_db(epochs: core::ops::Range<Epoch>) -> Arc<FakeChainDb> {
        Arc::new(FakeChainDb::with_chain(&test_clock(), epochs))
    }

    async fn summarizer(
        chain_db: &Arc<FakeChainDb>,
        config: SummarizerConfig,
    ) -> Result<Summarizer<FakeChainDb, FakeChainDb>> {
        Summarizer::new(
            Arc::clone(chain_db),
            Arc::clone(chain_db),
            test_clock(),
            config,
            Some(Arc::new(Metrics::new()?)),
        )
        .await
    }

    fn rollups(retention: Option<RetentionPeriod>, max_days_per_run: u64) -> SummarizerConfig {
        SummarizerConfig {
            enable_periodic_validator_rollups: true,
            validator_epoch_retention: retention,
            max_days_per_run,
            ..SummarizerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_nothing_finalized() -> Result<()> {
        let chain_db = chain_db(0..4);
        let summarizer = summarizer(&chain_db, SummarizerConfig::default()).await?;

        assert_eq!(
            summarizer.on_finality_updated(0).await,
            PassOutcome::NothingFinalized,
        );
        assert!(chain_db.operations().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_pass_summarizes_every_level() -> Result<()> {
        let chain_db = chain_db(0..11);
        let summarizer = summarizer(&chain_db, rollups(None, 0)).await?;

        assert_eq!(summarizer.on_finality_updated(11).await, PassOutcome::Completed);

        assert_eq!(
            chain_db.stored_checkpoint(),
            Checkpoint {
                last_epoch: 10,
                last_block_epoch: 10,
                last_validator_epoch: 10,
                last_validator_day: Some(DECEMBER_2),
                periodic_validator_rollups: true,
            },
        );

        assert_eq!(chain_db.epoch_summaries().len(), 11);
        assert_eq!(chain_db.block_summaries().len(), 44);
        assert_eq!(chain_db.stored_validator_epoch_summaries().len(), 44);
        assert_eq!(chain_db.validator_day_summaries().len(), 8);

        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_pass_rewrites_identical_summaries() -> Result<()> {
        let chain_db = chain_db(0..11);
        let summarizer = summarizer(&chain_db, rollups(None, 0)).await?;

        summarizer.on_finality_updated(11).await;

        let epoch_summaries = chain_db.epoch_summaries();
        let block_summaries = chain_db.block_summaries();
        let validator_epoch_summaries = chain_db.stored_validator_epoch_summaries();
        let validator_day_summaries = chain_db.validator_day_summaries();

        chain_db.put_checkpoint(Checkpoint {
            periodic_validator_rollups: true,
            ..Checkpoint::default()
        });

        assert_eq!(summarizer.on_finality_updated(11).await, PassOutcome::Completed);

        assert_eq!(chain_db.epoch_summaries(), epoch_summaries);
        assert_eq!(chain_db.block_summaries(), block_summaries);
        assert_eq!(
            chain_db.stored_validator_epoch_summaries(),
            validator_epoch_summaries,
        );
        assert_eq!(chain_db.validator_day_summaries(), validator_day_summaries);

        Ok(())
    }

    #[tokio::test]
    async fn test_dependent_stages_wait_for_epoch_summaries() -> Result<()> {
        let chain_db = chain_db(0..6);
        chain_db.remove_balances_from(3);

        let summarizer = summarizer(
            &chain_db,
            SummarizerConfig {
                enable_validator_summaries: false,
                ..SummarizerConfig::default()
            },
        )
        .await?;

        assert_eq!(summarizer.on_finality_updated(6).await, PassOutcome::Completed);

        let checkpoint = chain_db.stored_checkpoint();

        assert_eq!(checkpoint.last_epoch, 2);
        assert_eq!(checkpoint.last_block_epoch, 2);
        assert_eq!(chain_db.block_summaries().len(), 12);

        Ok(())
    }

    #[tokio::test]
    async fn test_pass_is_bounded_by_max_days_per_run() -> Result<()> {
        let chain_db = chain_db(0..101);

        let summarizer = summarizer(
            &chain_db,
            rollups(Some(RetentionPeriod::default()), 2),
        )
        .await?;

        assert_eq!(summarizer.on_finality_updated(101).await, PassOutcome::Completed);

        let checkpoint = chain_db.stored_checkpoint();

        assert_eq!(checkpoint.last_epoch, 8);
        assert_eq!(checkpoint.last_block_epoch, 8);
        assert_eq!(checkpoint.last_validator_epoch, 8);

        assert_eq!(summarizer.on_finality_updated(101).await, PassOutcome::Completed);
        assert_eq!(chain_db.stored_checkpoint().last_epoch, 17);

        Ok(())
    }

    #[tokio::test]
    async fn test_pruning_follows_day_rollup() -> Result<()> {
        let chain_db = chain_db(0..11);

        let summarizer = summarizer(
            &chain_db,
            rollups(Some(RetentionPeriod::default()), 0),
        )
        .await?;

        assert_eq!(summarizer.on_finality_updated(11).await, PassOutcome::Completed);

        let operations = chain_db.operations();

        let last_day_rollup = operations
            .iter()
            .rposition(|operation| *operation == Operation::SetValidatorDaySummaries(DECEMBER_2))
            .expect("day summaries should be written");

        let prune = operations
            .iter()
            .position(|operation| matches!(operation, Operation::PruneValidatorEpochSummaries(_)))
            .expect("validator epoch summaries should be pruned");

        assert!(last_day_rollup < prune);
        assert_eq!(
            operations[prune],
            Operation::PruneValidatorEpochSummaries(6),
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_overlapping_update_is_dropped() -> Result<()> {
        let chain_db = chain_db(0..11);
        let summarizer = Arc::new(summarizer(&chain_db, SummarizerConfig::default()).await?);

        let (entered, release) = chain_db.pause_balance_reads();

        let first_pass = tokio::spawn({
            let summarizer = Arc::clone(&summarizer);
            async move { summarizer.on_finality_updated(11).await }
        });

        entered.notified().await;

        let operations = chain_db.operations();
        let checkpoint = chain_db.stored_checkpoint();

        assert_eq!(summarizer.on_finality_updated(11).await, PassOutcome::Busy);

        // The dropped update does not run any stage.
        assert_eq!(chain_db.operations(), operations);
        assert_eq!(chain_db.stored_checkpoint(), checkpoint);

        release.add_permits(1000);

        assert_eq!(first_pass.await?, PassOutcome::Completed);
        assert_eq!(summarizer.on_finality_updated(11).await, PassOutcome::Completed);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_stage_aborts_the_pass() -> Result<()> {
        let chain_db = chain_db(0..6);
        chain_db.fail_epoch_summaries_from(3);

        let summarizer = summarizer(&chain_db, SummarizerConfig::default()).await?;

        assert_eq!(
            summarizer.on_finality_updated(6).await,
            PassOutcome::Aborted {
                stage: Stage::Epochs,
            },
        );

        assert_eq!(chain_db.stored_checkpoint().last_epoch, 2);
        assert!(chain_db.block_summaries().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_parent_aborts_the_pass() -> Result<()> {
        let chain_db = chain_db(0..4);

        chain_db.add_block(Block {
            slot: 9,
            root: block_root(9),
            parent_root: H256::repeat_byte(0xff),
            proposer_index: 1,
            canonical: Some(true),
        });

        let summarizer = summarizer(&chain_db, SummarizerConfig::default()).await?;

        assert_eq!(
            summarizer.on_finality_updated(4).await,
            PassOutcome::Aborted {
                stage: Stage::Blocks,
            },
        );

        let checkpoint = chain_db.stored_checkpoint();

        assert_eq!(checkpoint.last_epoch, 3);
        assert_eq!(checkpoint.last_block_epoch, 1);
        assert_eq!(checkpoint.last_validator_epoch, 0);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_times_out() -> Result<()> {
        let chain_db = chain_db(0..4);
        let (_entered, _release) = chain_db.pause_balance_reads();

        let summarizer = summarizer(
            &chain_db,
            SummarizerConfig {
                timeout: Duration::from_secs(1),
                ..SummarizerConfig::default()
            },
        )
        .await?;

        assert_eq!(
            summarizer.on_finality_updated(4).await,
            PassOutcome::Aborted {
                stage: Stage::Epochs,
            },
        );

        // The gate is released even though the stage future was dropped.
        assert_eq!(
            summarizer.on_finality_updated(4).await,
            PassOutcome::Aborted {
                stage: Stage::Epochs,
            },
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let chain_db = chain_db(0..1);

        let result = summarizer(
            &chain_db,
            SummarizerConfig {
                validator_epoch_retention: Some(RetentionPeriod::default()),
                ..SummarizerConfig::default()
            },
        )
        .await;

        let error = result
            .err()
            .expect("retention without periodic rollups should be rejected");

        assert_eq!(
            error.downcast_ref::<ConfigError>(),
            Some(&ConfigError::RetentionWithoutPeriodicRollups),
        );
    }

    #[tokio::test]
    async fn test_periodic_rollups_cannot_be_turned_off() -> Result<()> {
        let chain_db = chain_db(0..11);

        summarizer(&chain_db, rollups(None, 0)).await?;

        let summarizer = summarizer(&chain_db, SummarizerConfig::default()).await?;

        assert_eq!(summarizer.on_finality_updated(11).await, PassOutcome::Completed);
        assert!(chain_db.stored_checkpoint().periodic_validator_rollups);
        assert_eq!(
            chain_db.stored_checkpoint().last_validator_day,
            Some(DECEMBER_2),
        );

        Ok(())
    }
}
