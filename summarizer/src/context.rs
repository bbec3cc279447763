use std::sync::Arc;

use clock::ChainClock;
use prometheus_metrics::Metrics;
use types::primitives::Epoch;

use crate::{checkpoint::CheckpointAccessor, config::SummarizerConfig};

/// Everything a stage needs. Shared by all passes.
pub struct Context<D, S> {
    pub chain_data: Arc<D>,
    pub store: Arc<S>,
    pub checkpoints: CheckpointAccessor<S>,
    pub clock: ChainClock,
    pub config: SummarizerConfig,
    pub metrics: Option<Arc<Metrics>>,
}

impl<D, S> Context<D, S> {
    /// The most epochs a single pass may summarize at one level.
    ///
    /// `None` unless a retention period is configured and `max_days_per_run` is nonzero.
    pub fn max_epochs_per_run(&self) -> Option<u64> {
        let SummarizerConfig {
            validator_epoch_retention,
            max_days_per_run,
            ..
        } = self.config;

        (validator_epoch_retention.is_some() && max_days_per_run > 0)
            .then(|| max_days_per_run.saturating_mul(self.clock.epochs_per_day()))
    }

    /// Lowers `target` so that at most [`Self::max_epochs_per_run`] epochs after `start` are
    /// summarized.
    pub fn clamp_target(&self, start: Epoch, target: Epoch) -> Epoch {
        match self.max_epochs_per_run() {
            Some(max_epochs) if target.saturating_sub(start) > max_epochs => {
                start.saturating_add(max_epochs)
            }
            _ => target,
        }
    }
}

/// Last epoch a stage that depends on epoch summaries may summarize.
///
/// A `last_epoch` of 0 does not bound anything, which lets the stage run with epoch summaries
/// disabled.
#[must_use]
pub const fn dependency_target(summary_epoch: Epoch, last_epoch: Epoch) -> Epoch {
    if last_epoch == 0 || summary_epoch < last_epoch {
        summary_epoch
    } else {
        last_epoch
    }
}
