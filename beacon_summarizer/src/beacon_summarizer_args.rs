use core::{
    fmt::Display,
    net::{IpAddr, Ipv4Addr},
    num::NonZeroU64,
    time::Duration,
};
use std::path::PathBuf;

use anyhow::Result;
use clap::{error::ErrorKind, Args, CommandFactory as _, Error as ClapError, Parser};
use clock::ChainClock;
use summarizer::{RetentionPeriod, SummarizerConfig, DEFAULT_STAGE_TIMEOUT};
use types::primitives::UnixSeconds;

use crate::{
    beacon_summarizer_config::BeaconSummarizerConfig, metrics_server::MetricsServerConfig,
    predefined_network::PredefinedNetwork,
};

const DEFAULT_METRICS_PORT: u16 = 5054;

/// Summarizes finalized beacon chain data stored in a chain database.
///
/// A summarizer pass runs whenever the finalized epoch recorded in the database advances.
#[derive(Parser)]
#[clap(version, verbatim_doc_comment)]
pub struct BeaconSummarizerArgs {
    /// Directory containing the chain database
    #[clap(long, value_name = "DIRECTORY")]
    data_dir: PathBuf,

    #[clap(flatten)]
    chain_options: ChainOptions,

    #[clap(flatten)]
    summarizer_options: SummarizerOptions,

    #[clap(flatten)]
    metrics_options: MetricsOptions,
}

#[derive(Args)]
struct ChainOptions {
    /// Name of the network the chain database belongs to
    #[clap(long, value_enum, default_value_t = PredefinedNetwork::default())]
    network: PredefinedNetwork,

    /// Genesis time of a custom network, overriding the one of --network
    #[clap(long, value_name = "UNIX_SECONDS")]
    genesis_time: Option<UnixSeconds>,

    /// Slot duration of a custom network in milliseconds, overriding the one of --network
    #[clap(long, value_name = "MILLISECONDS")]
    slot_duration_ms: Option<u64>,

    /// Number of slots per epoch of a custom network, overriding the one of --network
    #[clap(long)]
    slots_per_epoch: Option<NonZeroU64>,
}

impl ChainOptions {
    fn chain_clock(&self) -> Result<ChainClock> {
        let Self {
            network,
            genesis_time,
            slot_duration_ms,
            slots_per_epoch,
        } = *self;

        ChainClock::new(
            genesis_time.unwrap_or_else(|| network.genesis_time()),
            slot_duration_ms.map_or_else(|| network.slot_duration(), Duration::from_millis),
            slots_per_epoch.unwrap_or_else(|| network.slots_per_epoch()),
        )
    }

    const fn is_custom(&self) -> bool {
        self.genesis_time.is_some()
            || self.slot_duration_ms.is_some()
            || self.slots_per_epoch.is_some()
    }
}

// False positive. The `bool`s are independent.
#[allow(clippy::struct_excessive_bools)]
#[derive(Args)]
struct SummarizerOptions {
    /// Do not write epoch summaries
    #[clap(long)]
    disable_epoch_summaries: bool,

    /// Do not write block summaries
    #[clap(long)]
    disable_block_summaries: bool,

    /// Do not write validator epoch summaries
    #[clap(long)]
    disable_validator_summaries: bool,

    /// Roll validator epoch summaries up into daily summaries.
    /// Cannot be turned off once enabled for a database.
    #[clap(long)]
    enable_periodic_validator_rollups: bool,

    /// Delete validator epoch summaries older than this ISO 8601 period (for example, P1Y or P6M2W)
    /// once they have been rolled up into daily summaries
    #[clap(long, value_name = "PERIOD", requires = "enable_periodic_validator_rollups")]
    validator_epoch_retention: Option<RetentionPeriod>,

    /// Maximum number of days worth of epochs to summarize in one pass.
    /// Only used together with --validator-epoch-retention. 0 means unlimited.
    #[clap(long, default_value_t = 0)]
    max_days_per_run: u64,

    /// Time limit for each summarizer stage in seconds
    #[clap(long, default_value_t = SummarizerOptions::default_stage_timeout())]
    stage_timeout: u64,
}

impl From<SummarizerOptions> for SummarizerConfig {
    fn from(summarizer_options: SummarizerOptions) -> Self {
        let SummarizerOptions {
            disable_epoch_summaries,
            disable_block_summaries,
            disable_validator_summaries,
            enable_periodic_validator_rollups,
            validator_epoch_retention,
            max_days_per_run,
            stage_timeout,
        } = summarizer_options;

        Self {
            enable_epoch_summaries: !disable_epoch_summaries,
            enable_block_summaries: !disable_block_summaries,
            enable_validator_summaries: !disable_validator_summaries,
            enable_periodic_validator_rollups,
            validator_epoch_retention,
            max_days_per_run,
            timeout: Duration::from_secs(stage_timeout),
        }
    }
}

impl SummarizerOptions {
    // `#[clap(value_parser = …)]` cannot be used because `Duration` does not implement `Display`.
    const fn default_stage_timeout() -> u64 {
        DEFAULT_STAGE_TIMEOUT.as_secs()
    }
}

#[derive(Args)]
struct MetricsOptions {
    /// Serve Prometheus metrics
    #[clap(long)]
    metrics: bool,

    /// Metrics server IP address
    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    metrics_address: IpAddr,

    /// Metrics server port
    #[clap(long, default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,
}

impl From<MetricsOptions> for Option<MetricsServerConfig> {
    fn from(metrics_options: MetricsOptions) -> Self {
        let MetricsOptions {
            metrics,
            metrics_address,
            metrics_port,
        } = metrics_options;

        metrics.then_some(MetricsServerConfig {
            metrics_address,
            metrics_port,
        })
    }
}

impl BeaconSummarizerArgs {
    pub fn try_into_config(self) -> Result<BeaconSummarizerConfig> {
        let Self {
            data_dir,
            chain_options,
            summarizer_options,
            metrics_options,
        } = self;

        let chain_clock = chain_options.chain_clock()?;
        let summarizer_config = SummarizerConfig::from(summarizer_options);

        summarizer_config.validate()?;

        Ok(BeaconSummarizerConfig {
            predefined_network: (!chain_options.is_custom()).then_some(chain_options.network),
            data_dir,
            chain_clock,
            summarizer_config,
            metrics_server_config: metrics_options.into(),
        })
    }

    pub fn clap_error(message: impl Display) -> ClapError {
        Self::command().error(ErrorKind::ValueValidation, message)
    }
}
