use std::sync::Arc;

use anyhow::Result;
use chain_db::{ChainDataProvider, SummaryStore};
use futures::{channel::mpsc::UnboundedReceiver, StreamExt as _};
use log::{debug, warn};
use tokio::task::{JoinError, JoinSet};
use types::primitives::Epoch;

use crate::{
    messages::FinalityToSummarizer,
    summarizer::{PassOutcome, Summarizer},
};

/// Runs a summarizer pass for every finality update it receives.
///
/// Passes run in their own tasks so that updates arriving during a pass reach the summarizer
/// and are dropped by it.
pub struct SummarizerService<D, S> {
    summarizer: Arc<Summarizer<D, S>>,
    finality_to_summarizer_rx: UnboundedReceiver<FinalityToSummarizer>,
}

impl<D, S> SummarizerService<D, S>
where
    D: ChainDataProvider + 'static,
    S: SummaryStore + 'static,
{
    #[must_use]
    pub const fn new(
        summarizer: Arc<Summarizer<D, S>>,
        finality_to_summarizer_rx: UnboundedReceiver<FinalityToSummarizer>,
    ) -> Self {
        Self {
            summarizer,
            finality_to_summarizer_rx,
        }
    }

    /// Returns after [`FinalityToSummarizer::Stop`] once running passes have finished.
    pub async fn run(mut self) -> Result<()> {
        let mut passes = JoinSet::new();

        while let Some(message) = self.finality_to_summarizer_rx.next().await {
            while let Some(result) = passes.try_join_next() {
                log_pass_result(result);
            }

            match message {
                FinalityToSummarizer::FinalityUpdated(finalized_epoch) => {
                    let summarizer = Arc::clone(&self.summarizer);

                    passes.spawn(async move {
                        let outcome = summarizer.on_finality_updated(finalized_epoch).await;
                        (finalized_epoch, outcome)
                    });
                }
                FinalityToSummarizer::Stop => break,
            }
        }

        while let Some(result) = passes.join_next().await {
            log_pass_result(result);
        }

        Ok(())
    }
}

fn log_pass_result(result: Result<(Epoch, PassOutcome), JoinError>) {
    match result {
        Ok((finalized_epoch, outcome)) => {
            debug!("summarizer pass for finalized epoch {finalized_epoch} ended: {outcome:?}");
        }
        Err(error) => warn!("summarizer pass panicked or was cancelled: {error}"),
    }
}
