use std::collections::{BTreeSet, HashMap};

use anyhow::{Context as _, Result};
use chain_db::{ChainDataProvider, SummaryStore};
use log::{debug, trace};
use types::{
    checkpoint::resume_epoch,
    primitives::{Epoch, Gwei, ValidatorIndex},
    summaries::EpochSummary,
};

use crate::{checkpoint::Progress, context::Context};

/// Summarizes every epoch after the checkpoint up to and including `summary_epoch`.
///
/// Stops early without an error at the first epoch with no balances recorded yet.
pub async fn summarize_epochs<D: ChainDataProvider, S: SummaryStore>(
    context: &Context<D, S>,
    summary_epoch: Epoch,
) -> Result<()> {
    if !context.config.enable_epoch_summaries {
        return Ok(());
    }

    let checkpoint = context.checkpoints.read().await?;
    let start = resume_epoch(checkpoint.last_epoch);
    let target = context.clamp_target(start, summary_epoch);

    trace!("summarizing epochs {start}..={target}");

    for epoch in start..=target {
        let Some(summary) = epoch_summary(context, epoch)
            .await
            .with_context(|| format!("failed to summarize epoch {epoch}"))?
        else {
            debug!("stopping epoch summaries at epoch {epoch}: balances are not available yet");
            return Ok(());
        };

        context.store.set_epoch_summary(summary).await?;
        context.checkpoints.advance(Progress::Epoch(epoch)).await?;
    }

    Ok(())
}

async fn epoch_summary<D: ChainDataProvider, S>(
    context: &Context<D, S>,
    epoch: Epoch,
) -> Result<Option<EpochSummary>> {
    let chain_data = &context.chain_data;

    let Some(balances) = chain_data.validator_balances_at_epoch(epoch).await? else {
        return Ok(None);
    };

    let slots = context.clock.slots_in_epoch(epoch);
    let validators = chain_data.validators().await?;

    let balances = balances
        .into_iter()
        .map(|balance| (balance.index, balance))
        .collect::<HashMap<_, _>>();

    let mut summary = EpochSummary {
        epoch,
        ..EpochSummary::default()
    };

    for validator in &validators {
        if validator.activation_epoch == epoch {
            summary.activating_validators += 1;
        }

        if validator.exit_epoch == epoch {
            summary.exiting_validators += 1;
        }

        if validator.is_active_at(epoch) {
            summary.active_validators += 1;

            if let Some(balance) = balances.get(&validator.index) {
                summary.active_real_balance += balance.balance;
                summary.active_balance += balance.effective_balance;
            }
        }
    }

    let attestations = chain_data.attestations_for_slots(slots.clone()).await?;

    let mut attesting = BTreeSet::new();
    let mut target_correct = BTreeSet::new();
    let mut head_correct = BTreeSet::new();

    for attestation in &attestations {
        let mut adds_validators = false;

        for index in attestation.attesting_indices.iter().copied() {
            adds_validators |= attesting.insert(index);

            if attestation.is_target_correct() {
                target_correct.insert(index);
            }

            if attestation.is_head_correct() {
                head_correct.insert(index);
            }
        }

        if !adds_validators {
            summary.duplicate_attestations_for_epoch += 1;
        }
    }

    let effective_balance_of = |indices: &BTreeSet<ValidatorIndex>| -> Gwei {
        indices
            .iter()
            .filter_map(|index| balances.get(index))
            .map(|balance| balance.effective_balance)
            .sum()
    };

    summary.attestations_for_epoch = u64::try_from(attestations.len())?;
    summary.attesting_validators = u64::try_from(attesting.len())?;
    summary.attesting_balance = effective_balance_of(&attesting);
    summary.target_correct_validators = u64::try_from(target_correct.len())?;
    summary.target_correct_balance = effective_balance_of(&target_correct);
    summary.head_correct_validators = u64::try_from(head_correct.len())?;
    summary.head_correct_balance = effective_balance_of(&head_correct);

    summary.attestations_in_epoch = u64::try_from(
        chain_data
            .attestations_included_in_slots(slots.clone())
            .await?
            .len(),
    )?;

    summary.proposer_slashings =
        u64::try_from(chain_data.proposer_slashings(slots.clone()).await?.len())?;

    summary.attester_slashings =
        u64::try_from(chain_data.attester_slashings(slots.clone()).await?.len())?;

    summary.canonical_blocks = u64::try_from(chain_data.canonical_blocks(slots).await?.len())?;

    Ok(Some(summary))
}
