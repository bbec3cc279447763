use core::future::Future;
use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use chain_db::SqliteChainDb;
use clap::{Error as ClapError, Parser as _};
use env_logger::{Builder as LoggerBuilder, Env};
use futures::{channel::mpsc, future};
use log::{error, info};
use prometheus_metrics::Metrics;
use summarizer::{FinalityToSummarizer, Summarizer, SummarizerService};
use tokio::{runtime::Builder, select};

use crate::{
    beacon_summarizer_args::BeaconSummarizerArgs,
    beacon_summarizer_config::BeaconSummarizerConfig, finality_poller::FinalityPoller,
    metrics_server::run_metrics_server,
};

mod beacon_summarizer_args;
mod beacon_summarizer_config;
mod finality_poller;
mod metrics_server;
mod predefined_network;

fn main() -> ExitCode {
    if let Err(error) = try_main() {
        error.downcast_ref().map(ClapError::exit);
        error!("{error:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    LoggerBuilder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init()?;

    let config = BeaconSummarizerArgs::try_parse()?
        .try_into_config()
        .map_err(BeaconSummarizerArgs::clap_error)?;

    info!("starting beacon chain summarizer");
    config.report();

    block_on(run(config))
}

async fn run(config: BeaconSummarizerConfig) -> Result<()> {
    let BeaconSummarizerConfig {
        data_dir,
        chain_clock,
        summarizer_config,
        metrics_server_config,
        ..
    } = config;

    let chain_db = Arc::new(SqliteChainDb::persistent(&data_dir)?);

    let metrics = match metrics_server_config {
        Some(_) => {
            let metrics = Arc::new(Metrics::new()?);
            metrics.register_with_default_metrics()?;
            Some(metrics)
        }
        None => None,
    };

    let summarizer = Summarizer::new(
        Arc::clone(&chain_db),
        Arc::clone(&chain_db),
        chain_clock,
        summarizer_config,
        metrics.clone(),
    )
    .await?;

    let (finality_to_summarizer_tx, finality_to_summarizer_rx) = mpsc::unbounded();

    let service = tokio::spawn(
        SummarizerService::new(Arc::new(summarizer), finality_to_summarizer_rx).run(),
    );

    let finality_poller = FinalityPoller::new(
        Arc::clone(&chain_db),
        chain_clock,
        finality_to_summarizer_tx.clone(),
    );

    let metrics_server = async move {
        match metrics_server_config.zip(metrics) {
            Some((config, metrics)) => run_metrics_server(config, metrics).await,
            None => future::pending().await,
        }
    };

    let result = select! {
        result = finality_poller.run() => result,
        result = metrics_server => result,
        result = wait_for_signal() => {
            info!("received shutdown signal, waiting for the running summarizer pass");
            result
        }
    };

    FinalityToSummarizer::Stop.send(&finality_to_summarizer_tx);

    service.await??;

    result
}

async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::SignalKind;

        let mut interrupt = tokio::signal::unix::signal(SignalKind::interrupt())?;
        let mut terminate = tokio::signal::unix::signal(SignalKind::terminate())?;

        select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

fn block_on(future: impl Future<Output = Result<()>>) -> Result<()> {
    // This is roughly what `#[tokio::main]` expands to.
    Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(future)
}
