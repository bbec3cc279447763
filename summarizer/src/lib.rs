//! Rolls finalized beacon chain data up into epoch, block, validator and validator-day
//! summaries.
//!
//! A pass is triggered by a finality update and runs the stages in a fixed order. Every stage
//! resumes from the persisted [`Checkpoint`](types::checkpoint::Checkpoint), so a pass that fails
//! or is dropped halfway loses at most one unit of work.

pub use crate::{
    config::{RetentionPeriod, SummarizerConfig, DEFAULT_STAGE_TIMEOUT},
    error::{ConfigError, Error},
    messages::FinalityToSummarizer,
    service::SummarizerService,
    summarizer::{PassOutcome, Stage, Summarizer},
};

mod blocks;
mod checkpoint;
mod config;
mod context;
mod days;
mod epochs;
mod error;
mod messages;
mod pruner;
mod service;
mod summarizer;
mod validators;

#[cfg(test)]
mod fake_chain_db;
