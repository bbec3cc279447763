use core::ops::Range;
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{
    params, types::Type, Connection, OptionalExtension as _, Params, Row, Transaction,
    TransactionBehavior,
};
use serde::{de::DeserializeOwned, Serialize};
use types::{
    checkpoint::Checkpoint,
    consts::FAR_FUTURE_EPOCH,
    containers::{
        Attestation, AttesterSlashing, Block, ProposerDuty, ProposerSlashing, Validator,
        ValidatorBalance,
    },
    primitives::{Epoch, Slot, ValidatorIndex, H256},
    summaries::{BlockSummary, EpochSummary, ValidatorDaySummary, ValidatorEpochSummary},
};

use crate::traits::{
    AttestationsProvider, BlockSummariesSetter, BlocksProvider, CheckpointStore,
    EpochSummariesSetter, FinalityProvider, ProposerDutiesProvider, SlashingsProvider,
    ValidatorDaySummariesSetter, ValidatorEpochSummariesStore, ValidatorsProvider,
};

#[allow(clippy::str_to_string)]
mod schema {
    use refinery::embed_migrations;
    embed_migrations!();
}

const DB_PATH: &str = "chain.sqlite";
const CHECKPOINT_KEY: &str = "summarizer";
const FINALITY_KEY: &str = "finality";

const ATTESTATION_COLUMNS: &str = "f_inclusion_slot, f_inclusion_block_root, f_inclusion_index, \
     f_slot, f_committee_index, f_attesting_indices, f_beacon_block_root, f_source_epoch, \
     f_target_epoch, f_target_root, f_canonical, f_target_correct, f_head_correct";

/// Chain data and summaries stored in a single SQLite database.
///
/// The connection is shared between clones. Every operation runs in its own transaction on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqliteChainDb {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteChainDb {
    pub fn persistent(store_directory: impl AsRef<Path>) -> Result<Self> {
        let store_directory = store_directory.as_ref();
        let path = store_directory.join(DB_PATH);

        if !path.try_exists()? {
            fs_err::create_dir_all(store_directory)?;
        }

        let mut connection = Connection::open(&path)?;
        schema::migrations::runner().run(&mut connection)?;
        Self::set_shared_pragma(&connection)?;

        connection.pragma_update(None, "journal_mode", "WAL")?;

        info!("opened chain database at {}", path.display());

        Ok(Self::new(connection))
    }

    pub fn in_memory() -> Result<Self> {
        let mut connection = Connection::open_in_memory()?;
        schema::migrations::runner().run(&mut connection)?;
        Self::set_shared_pragma(&connection)?;

        // See the last paragraph of <https://www.sqlite.org/pragma.html#pragma_journal_mode>.
        connection.pragma_update(None, "journal_mode", "MEMORY")?;

        Ok(Self::new(connection))
    }

    fn new(connection: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn set_shared_pragma(connection: &Connection) -> Result<()> {
        // Foreign key constraints are not enforced by default as of SQLite 3.41.2.
        // See <https://sqlite.org/pragma.html#pragma_foreign_keys>.
        connection.pragma_update(None, "foreign_keys", true)?;

        // Day rollups read a full day of validator epoch summaries at once.
        // The default is -2000, which means a little over 2 MB.
        // See <https://sqlite.org/pragma.html#pragma_cache_size>.
        connection.pragma_update(None, "cache_size", -20000)?;

        Ok(())
    }

    pub async fn add_blocks(&self, blocks: Vec<Block>) -> Result<()> {
        self.run(move |transaction| {
            for block in blocks {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_blocks (
                        f_root, f_slot, f_parent_root, f_proposer_index, f_canonical
                    ) VALUES (?1, ?2, ?3, ?4, ?5)",
                    (
                        block.root.as_bytes(),
                        block.slot,
                        block.parent_root.as_bytes(),
                        block.proposer_index,
                        block.canonical,
                    ),
                )?;
            }

            Ok(())
        })
        .await
    }

    pub async fn add_attestations(&self, attestations: Vec<Attestation>) -> Result<()> {
        self.run(move |transaction| {
            for attestation in attestations {
                transaction.execute(
                    &format!(
                        "INSERT OR REPLACE INTO t_attestations ({ATTESTATION_COLUMNS}) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    ),
                    params![
                        attestation.inclusion_slot,
                        attestation.inclusion_block_root.as_bytes(),
                        attestation.inclusion_index,
                        attestation.slot,
                        attestation.committee_index,
                        serde_json::to_string(&attestation.attesting_indices)?,
                        attestation.beacon_block_root.as_bytes(),
                        attestation.source_epoch,
                        attestation.target_epoch,
                        attestation.target_root.as_bytes(),
                        attestation.canonical,
                        attestation.target_correct,
                        attestation.head_correct,
                    ],
                )?;
            }

            Ok(())
        })
        .await
    }

    pub async fn add_validators(&self, validators: Vec<Validator>) -> Result<()> {
        self.run(move |transaction| {
            for validator in validators {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_validators (
                        f_index, f_activation_eligibility_epoch, f_activation_epoch,
                        f_exit_epoch, f_slashed
                    ) VALUES (?1, ?2, ?3, ?4, ?5)",
                    (
                        validator.index,
                        epoch_to_sql(validator.activation_eligibility_epoch),
                        epoch_to_sql(validator.activation_epoch),
                        epoch_to_sql(validator.exit_epoch),
                        validator.slashed,
                    ),
                )?;
            }

            Ok(())
        })
        .await
    }

    pub async fn add_validator_balances(&self, balances: Vec<ValidatorBalance>) -> Result<()> {
        self.run(move |transaction| {
            for balance in balances {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_validator_balances (
                        f_validator_index, f_epoch, f_balance, f_effective_balance
                    ) VALUES (?1, ?2, ?3, ?4)",
                    (
                        balance.index,
                        balance.epoch,
                        balance.balance,
                        balance.effective_balance,
                    ),
                )?;
            }

            Ok(())
        })
        .await
    }

    pub async fn add_proposer_duties(&self, duties: Vec<ProposerDuty>) -> Result<()> {
        self.run(move |transaction| {
            for duty in duties {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_proposer_duties (f_slot, f_validator_index)
                    VALUES (?1, ?2)",
                    (duty.slot, duty.validator_index),
                )?;
            }

            Ok(())
        })
        .await
    }

    pub async fn add_proposer_slashings(&self, slashings: Vec<ProposerSlashing>) -> Result<()> {
        self.run(move |transaction| {
            for slashing in slashings {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_proposer_slashings (
                        f_inclusion_block_root, f_inclusion_index, f_inclusion_slot,
                        f_proposer_index
                    ) VALUES (?1, ?2, ?3, ?4)",
                    (
                        slashing.inclusion_block_root.as_bytes(),
                        slashing.inclusion_index,
                        slashing.inclusion_slot,
                        slashing.proposer_index,
                    ),
                )?;
            }

            Ok(())
        })
        .await
    }

    pub async fn add_attester_slashings(&self, slashings: Vec<AttesterSlashing>) -> Result<()> {
        self.run(move |transaction| {
            for slashing in slashings {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_attester_slashings (
                        f_inclusion_block_root, f_inclusion_index, f_inclusion_slot,
                        f_slashed_indices
                    ) VALUES (?1, ?2, ?3, ?4)",
                    (
                        slashing.inclusion_block_root.as_bytes(),
                        slashing.inclusion_index,
                        slashing.inclusion_slot,
                        serde_json::to_string(&slashing.slashed_indices)?,
                    ),
                )?;
            }

            Ok(())
        })
        .await
    }

    pub async fn set_finalized_epoch(&self, epoch: Epoch) -> Result<()> {
        self.run(move |transaction| set_metadata(transaction, FINALITY_KEY, &epoch))
            .await
    }

    async fn run<T, F>(&self, function: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);

        tokio::task::spawn_blocking(move || {
            let mut connection = connection
                .lock()
                .expect("chain database mutex is poisoned");

            let transaction =
                connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let output = function(&transaction)?;

            transaction.commit()?;

            Ok(output)
        })
        .await?
    }
}

#[async_trait]
impl BlocksProvider for SqliteChainDb {
    async fn canonical_blocks(&self, slots: Range<Slot>) -> Result<Vec<Block>> {
        self.run(move |transaction| {
            query_all(
                transaction,
                "SELECT f_slot, f_root, f_parent_root, f_proposer_index, f_canonical
                FROM t_blocks
                WHERE f_slot >= ?1 AND f_slot < ?2 AND f_canonical = 1
                ORDER BY f_slot",
                (slots.start, slots.end),
                block_from_row,
            )
        })
        .await
    }

    async fn block_by_root(&self, root: H256) -> Result<Option<Block>> {
        self.run(move |transaction| {
            transaction
                .query_row(
                    "SELECT f_slot, f_root, f_parent_root, f_proposer_index, f_canonical
                    FROM t_blocks
                    WHERE f_root = ?1",
                    [root.as_bytes()],
                    block_from_row,
                )
                .optional()
                .map_err(Into::into)
        })
        .await
    }
}

#[async_trait]
impl AttestationsProvider for SqliteChainDb {
    async fn attestations_for_slots(&self, slots: Range<Slot>) -> Result<Vec<Attestation>> {
        self.run(move |transaction| {
            query_all(
                transaction,
                &format!(
                    "SELECT {ATTESTATION_COLUMNS}
                    FROM t_attestations
                    WHERE f_slot >= ?1 AND f_slot < ?2 AND f_canonical = 1
                    ORDER BY f_inclusion_slot, f_inclusion_index",
                ),
                (slots.start, slots.end),
                attestation_from_row,
            )
        })
        .await
    }

    async fn attestations_included_in_slots(
        &self,
        slots: Range<Slot>,
    ) -> Result<Vec<Attestation>> {
        self.run(move |transaction| {
            query_all(
                transaction,
                &format!(
                    "SELECT {ATTESTATION_COLUMNS}
                    FROM t_attestations
                    WHERE f_inclusion_slot >= ?1 AND f_inclusion_slot < ?2 AND f_canonical = 1
                    ORDER BY f_inclusion_slot, f_inclusion_index",
                ),
                (slots.start, slots.end),
                attestation_from_row,
            )
        })
        .await
    }
}

#[async_trait]
impl ValidatorsProvider for SqliteChainDb {
    async fn validators(&self) -> Result<Vec<Validator>> {
        self.run(|transaction| {
            query_all(
                transaction,
                "SELECT f_index, f_activation_eligibility_epoch, f_activation_epoch,
                    f_exit_epoch, f_slashed
                FROM t_validators
                ORDER BY f_index",
                (),
                |row| {
                    Ok(Validator {
                        index: row.get(0)?,
                        activation_eligibility_epoch: epoch_from_sql(row.get(1)?),
                        activation_epoch: epoch_from_sql(row.get(2)?),
                        exit_epoch: epoch_from_sql(row.get(3)?),
                        slashed: row.get(4)?,
                    })
                },
            )
        })
        .await
    }

    async fn validator_balances_at_epoch(
        &self,
        epoch: Epoch,
    ) -> Result<Option<Vec<ValidatorBalance>>> {
        let balances = self
            .run(move |transaction| {
                query_all(
                    transaction,
                    "SELECT f_validator_index, f_epoch, f_balance, f_effective_balance
                    FROM t_validator_balances
                    WHERE f_epoch = ?1
                    ORDER BY f_validator_index",
                    [epoch],
                    |row| {
                        let (index, epoch, balance, effective_balance) = row.try_into()?;

                        Ok(ValidatorBalance {
                            index,
                            epoch,
                            balance,
                            effective_balance,
                        })
                    },
                )
            })
            .await?;

        if balances.is_empty() {
            debug!("no validator balances stored for epoch {epoch}");
            return Ok(None);
        }

        Ok(Some(balances))
    }
}

#[async_trait]
impl ProposerDutiesProvider for SqliteChainDb {
    async fn proposer_duties(&self, slots: Range<Slot>) -> Result<Vec<ProposerDuty>> {
        self.run(move |transaction| {
            query_all(
                transaction,
                "SELECT f_slot, f_validator_index
                FROM t_proposer_duties
                WHERE f_slot >= ?1 AND f_slot < ?2
                ORDER BY f_slot",
                (slots.start, slots.end),
                |row| {
                    let (slot, validator_index) = row.try_into()?;
                    Ok(ProposerDuty {
                        slot,
                        validator_index,
                    })
                },
            )
        })
        .await
    }
}

#[async_trait]
impl SlashingsProvider for SqliteChainDb {
    async fn proposer_slashings(&self, slots: Range<Slot>) -> Result<Vec<ProposerSlashing>> {
        self.run(move |transaction| {
            query_all(
                transaction,
                "SELECT s.f_inclusion_slot, s.f_inclusion_block_root, s.f_inclusion_index,
                    s.f_proposer_index
                FROM t_proposer_slashings s
                JOIN t_blocks b ON b.f_root = s.f_inclusion_block_root
                WHERE s.f_inclusion_slot >= ?1 AND s.f_inclusion_slot < ?2 AND b.f_canonical = 1
                ORDER BY s.f_inclusion_slot, s.f_inclusion_index",
                (slots.start, slots.end),
                |row| {
                    Ok(ProposerSlashing {
                        inclusion_slot: row.get(0)?,
                        inclusion_block_root: row.get(1).map(H256)?,
                        inclusion_index: row.get(2)?,
                        proposer_index: row.get(3)?,
                    })
                },
            )
        })
        .await
    }

    async fn attester_slashings(&self, slots: Range<Slot>) -> Result<Vec<AttesterSlashing>> {
        self.run(move |transaction| {
            query_all(
                transaction,
                "SELECT s.f_inclusion_slot, s.f_inclusion_block_root, s.f_inclusion_index,
                    s.f_slashed_indices
                FROM t_attester_slashings s
                JOIN t_blocks b ON b.f_root = s.f_inclusion_block_root
                WHERE s.f_inclusion_slot >= ?1 AND s.f_inclusion_slot < ?2 AND b.f_canonical = 1
                ORDER BY s.f_inclusion_slot, s.f_inclusion_index",
                (slots.start, slots.end),
                |row| {
                    Ok(AttesterSlashing {
                        inclusion_slot: row.get(0)?,
                        inclusion_block_root: row.get(1).map(H256)?,
                        inclusion_index: row.get(2)?,
                        slashed_indices: indices_from_row(row, 3)?,
                    })
                },
            )
        })
        .await
    }
}

#[async_trait]
impl FinalityProvider for SqliteChainDb {
    async fn finalized_epoch(&self) -> Result<Epoch> {
        self.run(|transaction| Ok(metadata(transaction, FINALITY_KEY)?.unwrap_or_default()))
            .await
    }
}

#[async_trait]
impl CheckpointStore for SqliteChainDb {
    async fn checkpoint(&self) -> Result<Checkpoint> {
        self.run(|transaction| Ok(metadata(transaction, CHECKPOINT_KEY)?.unwrap_or_default()))
            .await
    }

    async fn set_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let checkpoint = *checkpoint;

        self.run(move |transaction| set_metadata(transaction, CHECKPOINT_KEY, &checkpoint))
            .await
    }
}

#[async_trait]
impl EpochSummariesSetter for SqliteChainDb {
    async fn set_epoch_summary(&self, summary: EpochSummary) -> Result<()> {
        self.run(move |transaction| {
            transaction.execute(
                "INSERT OR REPLACE INTO t_epoch_summaries (
                    f_epoch, f_activating_validators, f_active_validators, f_active_real_balance,
                    f_active_balance, f_attesting_validators, f_attesting_balance,
                    f_target_correct_validators, f_target_correct_balance,
                    f_head_correct_validators, f_head_correct_balance, f_attestations_for_epoch,
                    f_attestations_in_epoch, f_duplicate_attestations_for_epoch,
                    f_proposer_slashings, f_attester_slashings, f_exiting_validators,
                    f_canonical_blocks
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
                )",
                params![
                    summary.epoch,
                    summary.activating_validators,
                    summary.active_validators,
                    summary.active_real_balance,
                    summary.active_balance,
                    summary.attesting_validators,
                    summary.attesting_balance,
                    summary.target_correct_validators,
                    summary.target_correct_balance,
                    summary.head_correct_validators,
                    summary.head_correct_balance,
                    summary.attestations_for_epoch,
                    summary.attestations_in_epoch,
                    summary.duplicate_attestations_for_epoch,
                    summary.proposer_slashings,
                    summary.attester_slashings,
                    summary.exiting_validators,
                    summary.canonical_blocks,
                ],
            )?;

            Ok(())
        })
        .await
    }
}

#[async_trait]
impl BlockSummariesSetter for SqliteChainDb {
    async fn set_block_summaries(&self, summaries: Vec<BlockSummary>) -> Result<()> {
        self.run(move |transaction| {
            for summary in summaries {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_block_summaries (
                        f_slot, f_attestations_for_block, f_duplicate_attestations_for_block,
                        f_votes_for_block, f_parent_distance
                    ) VALUES (?1, ?2, ?3, ?4, ?5)",
                    (
                        summary.slot,
                        summary.attestations_for_block,
                        summary.duplicate_attestations_for_block,
                        summary.votes_for_block,
                        summary.parent_distance,
                    ),
                )?;
            }

            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ValidatorEpochSummariesStore for SqliteChainDb {
    async fn set_validator_epoch_summaries(
        &self,
        summaries: Vec<ValidatorEpochSummary>,
    ) -> Result<()> {
        self.run(move |transaction| {
            for summary in summaries {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_validator_epoch_summaries (
                        f_validator_index, f_epoch, f_proposer_duties, f_proposals_included,
                        f_attestation_included, f_attestation_target_correct,
                        f_attestation_head_correct, f_attestation_inclusion_delay,
                        f_attestation_source_timely, f_attestation_target_timely,
                        f_attestation_head_timely
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    (
                        summary.validator_index,
                        summary.epoch,
                        summary.proposer_duties,
                        summary.proposals_included,
                        summary.attestation_included,
                        summary.attestation_target_correct,
                        summary.attestation_head_correct,
                        summary.attestation_inclusion_delay,
                        summary.attestation_source_timely,
                        summary.attestation_target_timely,
                        summary.attestation_head_timely,
                    ),
                )?;
            }

            Ok(())
        })
        .await
    }

    async fn validator_epoch_summaries(
        &self,
        epochs: Range<Epoch>,
    ) -> Result<Vec<ValidatorEpochSummary>> {
        self.run(move |transaction| {
            query_all(
                transaction,
                "SELECT f_validator_index, f_epoch, f_proposer_duties, f_proposals_included,
                    f_attestation_included, f_attestation_target_correct,
                    f_attestation_head_correct, f_attestation_inclusion_delay,
                    f_attestation_source_timely, f_attestation_target_timely,
                    f_attestation_head_timely
                FROM t_validator_epoch_summaries
                WHERE f_epoch >= ?1 AND f_epoch < ?2
                ORDER BY f_epoch, f_validator_index",
                (epochs.start, epochs.end),
                |row| {
                    Ok(ValidatorEpochSummary {
                        validator_index: row.get(0)?,
                        epoch: row.get(1)?,
                        proposer_duties: row.get(2)?,
                        proposals_included: row.get(3)?,
                        attestation_included: row.get(4)?,
                        attestation_target_correct: row.get(5)?,
                        attestation_head_correct: row.get(6)?,
                        attestation_inclusion_delay: row.get(7)?,
                        attestation_source_timely: row.get(8)?,
                        attestation_target_timely: row.get(9)?,
                        attestation_head_timely: row.get(10)?,
                    })
                },
            )
        })
        .await
    }

    async fn prune_validator_epoch_summaries(&self, epoch: Epoch) -> Result<u64> {
        self.run(move |transaction| {
            let deleted = transaction.execute(
                "DELETE FROM t_validator_epoch_summaries WHERE f_epoch < ?1",
                [epoch],
            )?;

            Ok(u64::try_from(deleted)?)
        })
        .await
    }
}

#[async_trait]
impl ValidatorDaySummariesSetter for SqliteChainDb {
    async fn set_validator_day_summaries(
        &self,
        summaries: Vec<ValidatorDaySummary>,
    ) -> Result<()> {
        self.run(move |transaction| {
            for summary in summaries {
                transaction.execute(
                    "INSERT OR REPLACE INTO t_validator_day_summaries (
                        f_validator_index, f_start_timestamp, f_start_balance,
                        f_start_effective_balance, f_end_balance, f_end_effective_balance,
                        f_proposer_duties, f_proposals_included, f_attestations,
                        f_attestations_included, f_attestations_target_correct,
                        f_attestations_head_correct, f_attestations_source_timely,
                        f_attestations_target_timely, f_attestations_head_timely,
                        f_attestations_inclusion_delay_total
                    ) VALUES (
                        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
                    )",
                    params![
                        summary.validator_index,
                        summary.start_timestamp,
                        summary.start_balance,
                        summary.start_effective_balance,
                        summary.end_balance,
                        summary.end_effective_balance,
                        summary.proposer_duties,
                        summary.proposals_included,
                        summary.attestations,
                        summary.attestations_included,
                        summary.attestations_target_correct,
                        summary.attestations_head_correct,
                        summary.attestations_source_timely,
                        summary.attestations_target_timely,
                        summary.attestations_head_timely,
                        summary.attestations_inclusion_delay_total,
                    ],
                )?;
            }

            Ok(())
        })
        .await
    }
}

fn query_all<T>(
    transaction: &Transaction,
    sql: &str,
    params: impl Params,
    map: impl FnMut(&Row) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut statement = transaction.prepare(sql)?;
    let rows = statement.query_map(params, map)?;

    rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
}

fn metadata<T: DeserializeOwned>(transaction: &Transaction, key: &str) -> Result<Option<T>> {
    let json: Option<String> = transaction
        .query_row(
            "SELECT f_value FROM t_metadata WHERE f_key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;

    json.as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(Into::into)
}

fn set_metadata(transaction: &Transaction, key: &str, value: &impl Serialize) -> Result<()> {
    transaction.execute(
        "INSERT OR REPLACE INTO t_metadata (f_key, f_value) VALUES (?1, ?2)",
        (key, serde_json::to_string(value)?),
    )?;

    Ok(())
}

fn block_from_row(row: &Row) -> rusqlite::Result<Block> {
    Ok(Block {
        slot: row.get(0)?,
        root: row.get(1).map(H256)?,
        parent_root: row.get(2).map(H256)?,
        proposer_index: row.get(3)?,
        canonical: row.get(4)?,
    })
}

fn attestation_from_row(row: &Row) -> rusqlite::Result<Attestation> {
    Ok(Attestation {
        inclusion_slot: row.get(0)?,
        inclusion_block_root: row.get(1).map(H256)?,
        inclusion_index: row.get(2)?,
        slot: row.get(3)?,
        committee_index: row.get(4)?,
        attesting_indices: indices_from_row(row, 5)?,
        beacon_block_root: row.get(6).map(H256)?,
        source_epoch: row.get(7)?,
        target_epoch: row.get(8)?,
        target_root: row.get(9).map(H256)?,
        canonical: row.get(10)?,
        target_correct: row.get(11)?,
        head_correct: row.get(12)?,
    })
}

fn indices_from_row(row: &Row, column: usize) -> rusqlite::Result<Vec<ValidatorIndex>> {
    let json: String = row.get(column)?;

    serde_json::from_str(&json).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
    })
}

// SQLite integers are signed. `FAR_FUTURE_EPOCH` does not fit in them.
fn epoch_to_sql(epoch: Epoch) -> Option<Epoch> {
    (epoch != FAR_FUTURE_EPOCH).then_some(epoch)
}

fn epoch_from_sql(epoch: Option<Epoch>) -> Epoch {
    epoch.unwrap_or(FAR_FUTURE_EPOCH)
}
