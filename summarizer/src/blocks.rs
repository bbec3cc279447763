use std::collections::{BTreeMap, HashSet};

use anyhow::{Context as _, Result};
use chain_db::{BlocksProvider, ChainDataProvider, SummaryStore};
use log::trace;
use types::{
    checkpoint::resume_epoch,
    consts::{GENESIS_EPOCH, GENESIS_SLOT},
    containers::{Attestation, Block},
    primitives::{Epoch, Slot, ValidatorIndex},
    summaries::BlockSummary,
};

use crate::{
    checkpoint::Progress,
    context::{dependency_target, Context},
    error::Error,
};

pub async fn summarize_blocks<D: ChainDataProvider, S: SummaryStore>(
    context: &Context<D, S>,
    summary_epoch: Epoch,
) -> Result<()> {
    if !context.config.enable_block_summaries {
        return Ok(());
    }

    let checkpoint = context.checkpoints.read().await?;
    let start = resume_epoch(checkpoint.last_block_epoch);
    let target = dependency_target(summary_epoch, checkpoint.last_epoch);

    trace!("summarizing blocks in epochs {start}..={target}");

    for epoch in start..=target {
        let summaries = block_summaries(context, epoch)
            .await
            .with_context(|| format!("failed to summarize blocks in epoch {epoch}"))?;

        context.store.set_block_summaries(summaries).await?;
        context.checkpoints.advance(Progress::BlockEpoch(epoch)).await?;
    }

    Ok(())
}

async fn block_summaries<D: ChainDataProvider, S>(
    context: &Context<D, S>,
    epoch: Epoch,
) -> Result<Vec<BlockSummary>> {
    let chain_data = &context.chain_data;
    let slots = context.clock.slots_in_epoch(epoch);

    // Votes first included in the previous epoch have already been counted.
    let mut seen_votes = HashSet::<(Slot, ValidatorIndex)>::new();

    if epoch > GENESIS_EPOCH {
        let previous_slots = context.clock.slots_in_epoch(epoch - 1);

        for attestation in chain_data
            .attestations_included_in_slots(previous_slots)
            .await?
        {
            seen_votes.extend(votes(&attestation));
        }
    }

    let mut attestations_by_slot = BTreeMap::<Slot, Vec<Attestation>>::new();

    for attestation in chain_data
        .attestations_included_in_slots(slots.clone())
        .await?
    {
        attestations_by_slot
            .entry(attestation.inclusion_slot)
            .or_default()
            .push(attestation);
    }

    let blocks = chain_data.canonical_blocks(slots).await?;
    let mut summaries = Vec::with_capacity(blocks.len());

    for block in blocks {
        let mut summary = BlockSummary {
            slot: block.slot,
            parent_distance: parent_distance(chain_data.as_ref(), &block).await?,
            ..BlockSummary::default()
        };

        for attestation in attestations_by_slot.get(&block.slot).into_iter().flatten() {
            let new_votes = votes(attestation)
                .filter(|vote| seen_votes.insert(*vote))
                .count();

            summary.attestations_for_block += 1;
            summary.votes_for_block += u64::try_from(new_votes)?;

            if new_votes == 0 {
                summary.duplicate_attestations_for_block += 1;
            }
        }

        summaries.push(summary);
    }

    Ok(summaries)
}

async fn parent_distance(chain_data: &impl BlocksProvider, block: &Block) -> Result<u64> {
    if block.slot == GENESIS_SLOT {
        return Ok(0);
    }

    let parent = chain_data
        .block_by_root(block.parent_root)
        .await?
        .ok_or(Error::MissingParentBlock {
            slot: block.slot,
            parent_root: block.parent_root,
        })?;

    let distance = block
        .slot
        .checked_sub(parent.slot)
        .filter(|distance| *distance > 0)
        .ok_or(Error::ParentNotEarlier {
            slot: block.slot,
            parent_slot: parent.slot,
        })?;

    Ok(distance)
}

fn votes(attestation: &Attestation) -> impl Iterator<Item = (Slot, ValidatorIndex)> + '_ {
    attestation
        .attesting_indices
        .iter()
        .map(|index| (attestation.slot, *index))
}
