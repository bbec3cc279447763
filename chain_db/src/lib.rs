pub use crate::{
    sqlite_chain_db::SqliteChainDb,
    traits::{
        AttestationsProvider, BlockSummariesSetter, BlocksProvider, ChainDataProvider,
        CheckpointStore, EpochSummariesSetter, FinalityProvider, ProposerDutiesProvider,
        SlashingsProvider, SummaryStore, ValidatorDaySummariesSetter, ValidatorEpochSummariesStore,
        ValidatorsProvider,
    },
};

mod sqlite_chain_db;
mod traits;
