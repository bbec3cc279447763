use std::collections::{BTreeMap, HashMap};

use anyhow::{Context as _, Result};
use chain_db::{ChainDataProvider, SummaryStore};
use clock::{display_day, start_of_day};
use log::{debug, info, trace};
use types::{
    consts::SECONDS_PER_DAY,
    containers::ValidatorBalance,
    primitives::{Epoch, UnixSeconds, ValidatorIndex},
    summaries::ValidatorDaySummary,
};

use crate::{checkpoint::Progress, context::Context};

/// Receipt for a successful run of the day aggregator.
///
/// Only [`summarize_days`] can construct one.
#[derive(Clone, Copy, Debug)]
pub struct DaysSummarized {
    last_validator_day: Option<UnixSeconds>,
}

impl DaysSummarized {
    /// The newest day with summaries when the day aggregator finished.
    #[must_use]
    pub const fn last_validator_day(self) -> Option<UnixSeconds> {
        self.last_validator_day
    }
}

/// Rolls validator epoch summaries up into UTC days.
///
/// Returns `None` if periodic validator rollups are not enabled in the checkpoint.
/// A day is only summarized once the first epoch of the following day has been summarized too.
pub async fn summarize_days<D: ChainDataProvider, S: SummaryStore>(
    context: &Context<D, S>,
) -> Result<Option<DaysSummarized>> {
    let checkpoint = context.checkpoints.read().await?;

    if !checkpoint.periodic_validator_rollups {
        return Ok(None);
    }

    let mut receipt = DaysSummarized {
        last_validator_day: checkpoint.last_validator_day,
    };

    let epoch_time = context
        .clock
        .start_of_epoch(checkpoint.last_validator_epoch)?;

    if let Some(day) = checkpoint.last_validator_day {
        if epoch_time <= day + SECONDS_PER_DAY {
            return Ok(Some(receipt));
        }
    }

    let start_time = checkpoint.last_validator_day.map_or_else(
        || start_of_day(context.clock.genesis_time()),
        |day| day + SECONDS_PER_DAY,
    );

    let end_time = start_of_day(epoch_time).saturating_sub(SECONDS_PER_DAY);

    trace!(
        "summarizing validator days from {} until {}",
        display_day(start_time),
        display_day(end_time),
    );

    let mut day = start_time;

    while day < end_time {
        let summaries = validator_day_summaries(context, checkpoint.last_validator_epoch, day)
            .await
            .with_context(|| format!("failed to summarize validators for {}", display_day(day)))?;

        let Some(summaries) = summaries else {
            debug!(
                "stopping validator day summaries at {}: data is not available yet",
                display_day(day),
            );

            break;
        };

        let validator_count = summaries.len();

        context.store.set_validator_day_summaries(summaries).await?;
        context.checkpoints.advance(Progress::ValidatorDay(day)).await?;

        receipt.last_validator_day = Some(day);

        info!(
            "summarized {validator_count} validators for {}",
            display_day(day),
        );

        day += SECONDS_PER_DAY;
    }

    Ok(Some(receipt))
}

async fn validator_day_summaries<D: ChainDataProvider, S: SummaryStore>(
    context: &Context<D, S>,
    last_validator_epoch: Epoch,
    day: UnixSeconds,
) -> Result<Option<Vec<ValidatorDaySummary>>> {
    let first_epoch = context.clock.first_epoch_at_or_after(day);
    let end_epoch = context
        .clock
        .first_epoch_at_or_after(day + SECONDS_PER_DAY);

    if end_epoch > last_validator_epoch + 1 {
        return Ok(None);
    }

    let chain_data = &context.chain_data;

    let Some(start_balances) = chain_data.validator_balances_at_epoch(first_epoch).await? else {
        return Ok(None);
    };

    let Some(end_balances) = chain_data.validator_balances_at_epoch(end_epoch).await? else {
        return Ok(None);
    };

    let mut summaries = BTreeMap::new();

    for epoch_summary in context
        .store
        .validator_epoch_summaries(first_epoch..end_epoch)
        .await?
    {
        let validator_index = epoch_summary.validator_index;

        summaries
            .entry(validator_index)
            .or_insert_with(|| ValidatorDaySummary::new(validator_index, day))
            .fold(&epoch_summary);
    }

    let start_balances = by_index(start_balances);
    let end_balances = by_index(end_balances);

    for (validator_index, summary) in &mut summaries {
        if let Some(balance) = start_balances.get(validator_index) {
            summary.start_balance = balance.balance;
            summary.start_effective_balance = balance.effective_balance;
        }

        if let Some(balance) = end_balances.get(validator_index) {
            summary.end_balance = balance.balance;
            summary.end_effective_balance = balance.effective_balance;
        }
    }

    Ok(Some(summaries.into_values().collect()))
}

fn by_index(balances: Vec<ValidatorBalance>) -> HashMap<ValidatorIndex, ValidatorBalance> {
    balances
        .into_iter()
        .map(|balance| (balance.index, balance))
        .collect()
}
