use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use chain_db::{ChainDataProvider, SummaryStore};
use integer_sqrt::IntegerSquareRoot as _;
use log::{debug, trace};
use types::{
    checkpoint::resume_epoch,
    consts::MIN_ATTESTATION_INCLUSION_DELAY,
    containers::Attestation,
    primitives::{Epoch, ValidatorIndex},
    summaries::ValidatorEpochSummary,
};

use crate::{
    checkpoint::Progress,
    context::{dependency_target, Context},
};

pub async fn summarize_validators<D: ChainDataProvider, S: SummaryStore>(
    context: &Context<D, S>,
    summary_epoch: Epoch,
) -> Result<()> {
    if !context.config.enable_validator_summaries {
        return Ok(());
    }

    let checkpoint = context.checkpoints.read().await?;
    let start = resume_epoch(checkpoint.last_validator_epoch);
    let target = context.clamp_target(
        start,
        dependency_target(summary_epoch, checkpoint.last_epoch),
    );

    trace!("summarizing validators in epochs {start}..={target}");

    for epoch in start..=target {
        let Some(summaries) = validator_epoch_summaries(context, epoch)
            .await
            .with_context(|| format!("failed to summarize validators in epoch {epoch}"))?
        else {
            debug!("stopping validator summaries at epoch {epoch}: balances are not available yet");
            return Ok(());
        };

        context.store.set_validator_epoch_summaries(summaries).await?;
        context
            .checkpoints
            .advance(Progress::ValidatorEpoch(epoch))
            .await?;
    }

    Ok(())
}

/// Summaries for every validator active in `epoch`, ordered by validator index.
async fn validator_epoch_summaries<D: ChainDataProvider, S>(
    context: &Context<D, S>,
    epoch: Epoch,
) -> Result<Option<Vec<ValidatorEpochSummary>>> {
    let chain_data = &context.chain_data;

    if chain_data.validator_balances_at_epoch(epoch).await?.is_none() {
        return Ok(None);
    }

    let slots = context.clock.slots_in_epoch(epoch);
    let slots_per_epoch = context.clock.slots_per_epoch().get();
    let max_source_delay = slots_per_epoch.integer_sqrt();

    let mut summaries = chain_data
        .validators()
        .await?
        .into_iter()
        .filter(|validator| validator.is_active_at(epoch))
        .map(|validator| {
            let summary = ValidatorEpochSummary {
                validator_index: validator.index,
                epoch,
                ..ValidatorEpochSummary::default()
            };

            (validator.index, summary)
        })
        .collect::<BTreeMap<_, _>>();

    for duty in chain_data.proposer_duties(slots.clone()).await? {
        if let Some(summary) = summaries.get_mut(&duty.validator_index) {
            summary.proposer_duties += 1;
        }
    }

    for block in chain_data.canonical_blocks(slots.clone()).await? {
        if let Some(summary) = summaries.get_mut(&block.proposer_index) {
            summary.proposals_included += 1;
        }
    }

    let attestations = chain_data.attestations_for_slots(slots).await?;

    // Earliest inclusion of each validator's vote. Ties go to the attestation included first.
    let mut earliest = BTreeMap::<ValidatorIndex, &Attestation>::new();

    for attestation in &attestations {
        for index in attestation.attesting_indices.iter().copied() {
            earliest
                .entry(index)
                .and_modify(|current| {
                    if attestation.inclusion_delay() < current.inclusion_delay() {
                        *current = attestation;
                    }
                })
                .or_insert(attestation);
        }
    }

    for (index, attestation) in earliest {
        let Some(summary) = summaries.get_mut(&index) else {
            continue;
        };

        let delay = attestation.inclusion_delay();
        let target_correct = attestation.is_target_correct();
        let head_correct = attestation.is_head_correct();

        summary.attestation_included = true;
        summary.attestation_target_correct = Some(target_correct);
        summary.attestation_head_correct = Some(head_correct);
        summary.attestation_inclusion_delay = Some(delay);
        summary.attestation_source_timely = Some(delay <= max_source_delay);
        summary.attestation_target_timely = Some(target_correct && delay <= slots_per_epoch);
        summary.attestation_head_timely =
            Some(head_correct && delay == MIN_ATTESTATION_INCLUSION_DELAY);
    }

    Ok(Some(summaries.into_values().collect()))
}
