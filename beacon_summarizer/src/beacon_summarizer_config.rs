use std::path::PathBuf;

use clock::ChainClock;
use log::info;
use summarizer::SummarizerConfig;

use crate::{metrics_server::MetricsServerConfig, predefined_network::PredefinedNetwork};

#[cfg_attr(test, derive(Debug))]
pub struct BeaconSummarizerConfig {
    pub predefined_network: Option<PredefinedNetwork>,
    pub data_dir: PathBuf,
    pub chain_clock: ChainClock,
    pub summarizer_config: SummarizerConfig,
    pub metrics_server_config: Option<MetricsServerConfig>,
}

impl BeaconSummarizerConfig {
    pub fn report(&self) {
        let Self {
            predefined_network,
            data_dir,
            chain_clock,
            summarizer_config,
            metrics_server_config,
        } = self;

        let SummarizerConfig {
            enable_epoch_summaries,
            enable_block_summaries,
            enable_validator_summaries,
            enable_periodic_validator_rollups,
            validator_epoch_retention,
            max_days_per_run,
            timeout,
        } = summarizer_config;

        match predefined_network {
            Some(network) => info!("network: {network}"),
            None => info!(
                "network: custom with genesis time {}, slot duration {:?} and {} slots per epoch",
                chain_clock.genesis_time(),
                chain_clock.slot_duration(),
                chain_clock.slots_per_epoch(),
            ),
        }

        info!("data directory: {data_dir:?}");
        info!("epoch summaries enabled: {enable_epoch_summaries}");
        info!("block summaries enabled: {enable_block_summaries}");
        info!("validator summaries enabled: {enable_validator_summaries}");
        info!("periodic validator rollups enabled: {enable_periodic_validator_rollups}");

        if let Some(retention) = validator_epoch_retention {
            info!("validator epoch retention: {retention}");

            if *max_days_per_run > 0 {
                info!("maximum days summarized per pass: {max_days_per_run}");
            }
        }

        info!("summarizer stage timeout: {timeout:?}");

        if let Some(config) = metrics_server_config {
            info!(
                "metrics server: {}:{}",
                config.metrics_address, config.metrics_port,
            );
        }
    }
}
