pub use crate::metrics::Metrics;

mod metrics;
