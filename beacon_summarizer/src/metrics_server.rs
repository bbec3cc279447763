use core::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Error as AnyhowError, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::info;
use prometheus::TextEncoder;
use prometheus_metrics::Metrics;
use thiserror::Error;

#[derive(Clone, Copy, Debug)]
pub struct MetricsServerConfig {
    pub metrics_address: IpAddr,
    pub metrics_port: u16,
}

impl From<MetricsServerConfig> for SocketAddr {
    fn from(config: MetricsServerConfig) -> Self {
        Self::from((config.metrics_address, config.metrics_port))
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("internal error")]
    Internal(#[from] AnyhowError),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

#[allow(clippy::module_name_repetitions)]
pub async fn run_metrics_server(config: MetricsServerConfig, metrics: Arc<Metrics>) -> Result<()> {
    let addr = SocketAddr::from(config);

    info!("Metrics server is listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(
        listener,
        router(metrics).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(AnyhowError::new)
}

fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(metrics)
}

/// `GET /metrics`
#[allow(clippy::unused_async)]
async fn prometheus_metrics(State(metrics): State<Arc<Metrics>>) -> Result<String, Error> {
    let mut buffer = String::new();

    metrics.set_live();

    TextEncoder::new()
        .encode_utf8(prometheus::gather().as_slice(), &mut buffer)
        .map_err(AnyhowError::new)?;

    Ok(buffer)
}
