use core::pin::pin;
use std::sync::Arc;

use anyhow::Result;
use chain_db::FinalityProvider;
use clock::ChainClock;
use futures::{channel::mpsc::UnboundedSender, StreamExt as _};
use log::{debug, warn};
use summarizer::FinalityToSummarizer;
use types::primitives::Epoch;

/// Checks the finalized epoch recorded in the chain database at the start of every slot.
///
/// The summarizer is notified only when the finalized epoch advances.
pub struct FinalityPoller<F> {
    finality: Arc<F>,
    clock: ChainClock,
    finality_to_summarizer_tx: UnboundedSender<FinalityToSummarizer>,
}

impl<F: FinalityProvider> FinalityPoller<F> {
    pub const fn new(
        finality: Arc<F>,
        clock: ChainClock,
        finality_to_summarizer_tx: UnboundedSender<FinalityToSummarizer>,
    ) -> Self {
        Self {
            finality,
            clock,
            finality_to_summarizer_tx,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut last_finalized_epoch = None;

        self.notify_if_advanced(&mut last_finalized_epoch).await;

        let mut ticks = pin!(self.clock.ticks()?);

        while let Some(slot) = ticks.next().await {
            debug!("checking finalized epoch at slot {slot}");
            self.notify_if_advanced(&mut last_finalized_epoch).await;
        }

        Ok(())
    }

    async fn notify_if_advanced(&self, last_finalized_epoch: &mut Option<Epoch>) {
        let finalized_epoch = match self.finality.finalized_epoch().await {
            Ok(epoch) => epoch,
            Err(error) => {
                warn!("failed to read finalized epoch: {error:?}");
                return;
            }
        };

        if last_finalized_epoch.is_some_and(|last| finalized_epoch <= last) {
            return;
        }

        *last_finalized_epoch = Some(finalized_epoch);

        FinalityToSummarizer::FinalityUpdated(finalized_epoch)
            .send(&self.finality_to_summarizer_tx);
    }
}
