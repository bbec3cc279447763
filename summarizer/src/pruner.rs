use anyhow::Result;
use chain_db::{ChainDataProvider, SummaryStore};
use log::{error, info, trace};
use types::{consts::SECONDS_PER_DAY, primitives::Epoch};

use crate::{context::Context, days::DaysSummarized, error::Error};

/// Deletes validator epoch summaries that are outside the retention window and already rolled
/// up into day summaries.
pub async fn prune_validator_epoch_summaries<D: ChainDataProvider, S: SummaryStore>(
    context: &Context<D, S>,
    summary_epoch: Epoch,
    receipt: DaysSummarized,
) -> Result<()> {
    let Some(retention) = context.config.validator_epoch_retention else {
        return Ok(());
    };

    let checkpoint = context.checkpoints.read().await?;

    if receipt.last_validator_day() > checkpoint.last_validator_day {
        let error = Error::DayCheckpointRegression {
            summarized: receipt.last_validator_day(),
            stored: checkpoint.last_validator_day,
        };

        error!("refusing to prune validator epoch summaries: {error}");

        return Err(error.into());
    }

    let Some(last_validator_day) = checkpoint.last_validator_day else {
        trace!("not pruning validator epoch summaries: no days have been summarized");
        return Ok(());
    };

    let clock = &context.clock;
    let cutoff = retention.cutoff(clock.start_of_epoch(summary_epoch)?);
    let retention_boundary = clock.first_epoch_at_or_after(cutoff);
    let coverage_boundary = clock.first_epoch_at_or_after(last_validator_day + SECONDS_PER_DAY);
    let boundary = retention_boundary.min(coverage_boundary);

    if boundary == 0 {
        return Ok(());
    }

    let pruned = context
        .store
        .prune_validator_epoch_summaries(boundary)
        .await?;

    if let Some(metrics) = context.metrics.as_ref() {
        metrics.register_summarizer_pruned_summaries(pruned);
    }

    info!(
        "pruned {pruned} validator epoch summaries before epoch {boundary} \
         (retention: {retention})",
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use types::{
        checkpoint::Checkpoint,
        primitives::{UnixSeconds, ValidatorIndex},
    };

    use crate::{
        config::{RetentionPeriod, SummarizerConfig},
        days::summarize_days,
        fake_chain_db::{self, test_clock, FakeChainDb, Operation},
        validators::summarize_validators,
    };

    use super::*;

    // 2020-12-01T00:00:00Z
    const DECEMBER_1: UnixSeconds = 1_606_780_800;
    const DECEMBER_2: UnixSeconds = DECEMBER_1 + SECONDS_PER_DAY;

    async fn rolled_up_chain(
        last_validator_epoch: Epoch,
        retention: Option<&str>,
    ) -> Result<(Arc<FakeChainDb>, Context<FakeChainDb, FakeChainDb>, DaysSummarized)> {
        let chain_db = Arc::new(FakeChainDb::with_chain(
            &test_clock(),
            0..last_validator_epoch + 1,
        ));

        let validator_epoch_retention = retention
            .map(str::parse::<RetentionPeriod>)
            .transpose()?;

        let context = fake_chain_db::context(
            &chain_db,
            SummarizerConfig {
                enable_periodic_validator_rollups: true,
                validator_epoch_retention,
                ..SummarizerConfig::default()
            },
        );

        context.checkpoints.enable_periodic_validator_rollups().await?;
        summarize_validators(&context, last_validator_epoch).await?;

        let receipt = summarize_days(&context)
            .await?
            .expect("periodic validator rollups are enabled");

        Ok((chain_db, context, receipt))
    }

    fn oldest_epoch_summary(chain_db: &FakeChainDb) -> Option<(Epoch, ValidatorIndex)> {
        chain_db
            .stored_validator_epoch_summaries()
            .into_keys()
            .next()
    }

    #[tokio::test]
    async fn test_pruning_never_passes_day_coverage() -> Result<()> {
        let (chain_db, context, receipt) = rolled_up_chain(10, Some("P0D")).await?;

        prune_validator_epoch_summaries(&context, 10, receipt).await?;

        // Days up to 2020-12-02 cover epochs before 6.
        assert_eq!(oldest_epoch_summary(&chain_db), Some((6, 0)));
        assert_eq!(chain_db.stored_validator_epoch_summaries().len(), 20);

        Ok(())
    }

    #[tokio::test]
    async fn test_pruning_keeps_retention_window() -> Result<()> {
        let (chain_db, context, receipt) = rolled_up_chain(10, Some("P2D")).await?;

        // Epoch 10 starts at 2020-12-04T00:00:00Z. Two days earlier is the start of epoch 2.
        prune_validator_epoch_summaries(&context, 10, receipt).await?;

        assert_eq!(oldest_epoch_summary(&chain_db), Some((2, 0)));

        Ok(())
    }

    #[tokio::test]
    async fn test_nothing_is_pruned_without_day_summaries() -> Result<()> {
        let (chain_db, context, receipt) = rolled_up_chain(3, Some("P0D")).await?;

        assert_eq!(receipt.last_validator_day(), None);

        prune_validator_epoch_summaries(&context, 3, receipt).await?;

        assert_eq!(oldest_epoch_summary(&chain_db), Some((0, 0)));
        assert!(!chain_db
            .operations()
            .iter()
            .any(|operation| matches!(operation, Operation::PruneValidatorEpochSummaries(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_nothing_is_pruned_without_retention() -> Result<()> {
        let (chain_db, context, receipt) = rolled_up_chain(10, None).await?;

        prune_validator_epoch_summaries(&context, 10, receipt).await?;

        assert_eq!(chain_db.stored_validator_epoch_summaries().len(), 44);

        Ok(())
    }

    #[tokio::test]
    async fn test_regressed_day_checkpoint_is_an_invariant_violation() -> Result<()> {
        let (chain_db, context, receipt) = rolled_up_chain(10, Some("P0D")).await?;

        chain_db.put_checkpoint(Checkpoint {
            last_validator_day: Some(DECEMBER_1),
            ..chain_db.stored_checkpoint()
        });

        let error = prune_validator_epoch_summaries(&context, 10, receipt)
            .await
            .expect_err("pruning should refuse a regressed checkpoint");

        assert_eq!(
            error.downcast_ref::<Error>(),
            Some(&Error::DayCheckpointRegression {
                summarized: Some(DECEMBER_2),
                stored: Some(DECEMBER_1),
            }),
        );

        assert_eq!(chain_db.stored_validator_epoch_summaries().len(), 44);

        Ok(())
    }
}
