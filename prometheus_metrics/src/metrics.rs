use anyhow::Result;
use log::warn;
use prometheus::{
    histogram_opts, opts, HistogramTimer, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec,
};
use types::{checkpoint::Checkpoint, primitives::Epoch};

#[derive(Debug)]
pub struct Metrics {
    // Overview
    live: IntGauge,

    // Summarizer
    summarizer_latest_epoch: IntGauge,
    summarizer_checkpoint: IntGaugeVec,
    summarizer_stage_times: HistogramVec,
    summarizer_stage_failures: IntCounterVec,
    summarizer_skipped_passes: IntCounter,
    summarizer_pruned_summaries: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Overview
            live: IntGauge::new("IS_LIVE", "Summarizer status")?,

            // Summarizer
            summarizer_latest_epoch: IntGauge::new(
                "SUMMARIZER_LATEST_EPOCH",
                "Latest finalized epoch for which a summarizer pass completed",
            )?,

            summarizer_checkpoint: IntGaugeVec::new(
                opts!(
                    "SUMMARIZER_CHECKPOINT",
                    "Progress of each summary level as stored in the checkpoint",
                ),
                &["field"],
            )?,

            summarizer_stage_times: HistogramVec::new(
                histogram_opts!(
                    "SUMMARIZER_STAGE_TIMES",
                    "Time taken by successful summarizer stages",
                ),
                &["stage"],
            )?,

            summarizer_stage_failures: IntCounterVec::new(
                opts!(
                    "SUMMARIZER_STAGE_FAILURES",
                    "Number of summarizer stages that failed and aborted their pass",
                ),
                &["stage"],
            )?,

            summarizer_skipped_passes: IntCounter::new(
                "SUMMARIZER_SKIPPED_PASSES",
                "Number of finality updates dropped because a pass was already running",
            )?,

            summarizer_pruned_summaries: IntCounter::new(
                "SUMMARIZER_PRUNED_SUMMARIES",
                "Number of validator epoch summaries deleted by the retention pruner",
            )?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        let default_registry = prometheus::default_registry();

        default_registry.register(Box::new(self.live.clone()))?;
        default_registry.register(Box::new(self.summarizer_latest_epoch.clone()))?;
        default_registry.register(Box::new(self.summarizer_checkpoint.clone()))?;
        default_registry.register(Box::new(self.summarizer_stage_times.clone()))?;
        default_registry.register(Box::new(self.summarizer_stage_failures.clone()))?;
        default_registry.register(Box::new(self.summarizer_skipped_passes.clone()))?;
        default_registry.register(Box::new(self.summarizer_pruned_summaries.clone()))?;

        Ok(())
    }

    // Overview
    pub fn set_live(&self) {
        self.live.set(1)
    }

    // Summarizer
    pub fn set_summarizer_latest_epoch(&self, epoch: Epoch) {
        self.summarizer_latest_epoch.set(to_gauge_value(epoch));
    }

    pub fn set_summarizer_checkpoint(&self, checkpoint: &Checkpoint) {
        let Checkpoint {
            last_epoch,
            last_block_epoch,
            last_validator_epoch,
            last_validator_day,
            periodic_validator_rollups: _,
        } = *checkpoint;

        let fields = [
            ("last_epoch", last_epoch),
            ("last_block_epoch", last_block_epoch),
            ("last_validator_epoch", last_validator_epoch),
            ("last_validator_day", last_validator_day.unwrap_or_default()),
        ];

        for (field, value) in fields {
            match self
                .summarizer_checkpoint
                .get_metric_with_label_values(&[field])
            {
                Ok(gauge) => gauge.set(to_gauge_value(value)),
                Err(error) => warn!("unable to track summarizer checkpoint {field}: {error:?}"),
            }
        }
    }

    /// The timer records the stage time when dropped. Failed stages should discard it.
    pub fn start_summarizer_stage_timer(&self, stage: &str) -> Option<HistogramTimer> {
        match self
            .summarizer_stage_times
            .get_metric_with_label_values(&[stage])
        {
            Ok(histogram) => Some(histogram.start_timer()),
            Err(error) => {
                warn!("unable to time summarizer {stage} stage: {error:?}");
                None
            }
        }
    }

    pub fn register_summarizer_stage_failure(&self, stage: &str) {
        match self
            .summarizer_stage_failures
            .get_metric_with_label_values(&[stage])
        {
            Ok(counter) => counter.inc(),
            Err(error) => {
                warn!("unable to register summarizer stage failure for {stage}: {error:?}")
            }
        }
    }

    pub fn register_summarizer_skipped_pass(&self) {
        self.summarizer_skipped_passes.inc()
    }

    pub fn register_summarizer_pruned_summaries(&self, count: u64) {
        self.summarizer_pruned_summaries.inc_by(count)
    }
}

fn to_gauge_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
