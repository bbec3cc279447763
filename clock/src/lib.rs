//! Conversions between slots, epochs and wall-clock time for a beacon chain, and a
//! [`Stream`]-based slot timer.
//!
//! # Implementation
//!
//! All arithmetic is done on Unix milliseconds rather than [`Duration`]s or
//! [`chrono::DateTime`]s. `Duration` does not implement `Div<Duration>` or `Rem<Duration>`, and UTC
//! days are exactly [`SECONDS_PER_DAY`] long as far as Unix time is concerned, so calendar
//! alignment reduces to integer remainders.
//!
//! The slot timer is built on [`Interval`] the same way a consensus client drives its fork choice.
//! An [`Interval`] may produce items late, but the delays do not accumulate.
//! Consumers that only poll persisted state on every tick are not affected by a late tick.
//!
//! [`Interval`]: tokio::time::Interval

use core::{fmt::Display, num::NonZeroU64, ops::Range, time::Duration};
use std::time::{Instant, SystemTime};

use anyhow::Result;
use chrono::DateTime;
use futures::stream::{Stream, StreamExt as _};
use serde::Deserialize;
use thiserror::Error;
use tokio_stream::wrappers::IntervalStream;
use types::{
    consts::{GENESIS_SLOT, SECONDS_PER_DAY},
    primitives::{Epoch, Slot, UnixSeconds},
};

const MILLIS_PER_SECOND: u64 = 1000;
const MILLIS_PER_DAY: u64 = SECONDS_PER_DAY * MILLIS_PER_SECOND;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("slot duration must be at least one millisecond")]
    ZeroSlotDuration,
    #[error("slot duration of {slot_duration:?} does not fit in 64 bits of milliseconds")]
    SlotDurationTooLong { slot_duration: Duration },
    #[error("start of slot {slot} is too far in the future to represent")]
    TimeOverflow { slot: Slot },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(try_from = "ChainClockConfig")]
pub struct ChainClock {
    genesis_time: UnixSeconds,
    slot_duration_ms: NonZeroU64,
    slots_per_epoch: NonZeroU64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ChainClockConfig {
    genesis_time: UnixSeconds,
    slot_duration_ms: u64,
    slots_per_epoch: NonZeroU64,
}

impl TryFrom<ChainClockConfig> for ChainClock {
    type Error = anyhow::Error;

    fn try_from(config: ChainClockConfig) -> Result<Self> {
        let ChainClockConfig {
            genesis_time,
            slot_duration_ms,
            slots_per_epoch,
        } = config;

        Self::new(
            genesis_time,
            Duration::from_millis(slot_duration_ms),
            slots_per_epoch,
        )
    }
}

impl ChainClock {
    pub fn new(
        genesis_time: UnixSeconds,
        slot_duration: Duration,
        slots_per_epoch: NonZeroU64,
    ) -> Result<Self> {
        let slot_duration_ms = u64::try_from(slot_duration.as_millis())
            .map_err(|_| Error::SlotDurationTooLong { slot_duration })?;

        let slot_duration_ms = NonZeroU64::new(slot_duration_ms).ok_or(Error::ZeroSlotDuration)?;

        Ok(Self {
            genesis_time,
            slot_duration_ms,
            slots_per_epoch,
        })
    }

    #[must_use]
    pub const fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    #[must_use]
    pub const fn slot_duration(&self) -> Duration {
        Duration::from_millis(self.slot_duration_ms.get())
    }

    #[must_use]
    pub const fn slots_per_epoch(&self) -> NonZeroU64 {
        self.slots_per_epoch
    }

    #[must_use]
    pub const fn epoch_at_slot(&self, slot: Slot) -> Epoch {
        slot / self.slots_per_epoch.get()
    }

    #[must_use]
    pub const fn start_slot_of_epoch(&self, epoch: Epoch) -> Slot {
        epoch.saturating_mul(self.slots_per_epoch.get())
    }

    #[must_use]
    pub const fn slots_in_epoch(&self, epoch: Epoch) -> Range<Slot> {
        self.start_slot_of_epoch(epoch)..self.start_slot_of_epoch(epoch.saturating_add(1))
    }

    /// Number of whole epochs in a UTC day.
    ///
    /// This is constant for a network and used only to size catch-up batches.
    /// It is at least 1 even on networks with epochs longer than a day.
    #[must_use]
    pub const fn epochs_per_day(&self) -> u64 {
        let epoch_duration_ms = self.epoch_duration_ms();

        if epoch_duration_ms >= MILLIS_PER_DAY {
            1
        } else {
            MILLIS_PER_DAY / epoch_duration_ms
        }
    }

    pub fn start_of_slot(&self, slot: Slot) -> Result<UnixSeconds> {
        Ok(self.start_of_slot_ms(slot)? / MILLIS_PER_SECOND)
    }

    pub fn start_of_epoch(&self, epoch: Epoch) -> Result<UnixSeconds> {
        self.start_of_slot(self.start_slot_of_epoch(epoch))
    }

    /// First epoch that starts at or after `timestamp`.
    ///
    /// Every epoch before it starts strictly before `timestamp`.
    #[must_use]
    pub const fn first_epoch_at_or_after(&self, timestamp: UnixSeconds) -> Epoch {
        let genesis_ms = self.genesis_time.saturating_mul(MILLIS_PER_SECOND);
        let timestamp_ms = timestamp.saturating_mul(MILLIS_PER_SECOND);

        if timestamp_ms <= genesis_ms {
            return 0;
        }

        (timestamp_ms - genesis_ms).div_ceil(self.epoch_duration_ms())
    }

    /// Produces the number of every slot as it starts.
    ///
    /// The first item is the first slot starting after the call.
    pub fn ticks(&self) -> Result<impl Stream<Item = Slot>> {
        // We assume the `Instant` and `SystemTime` obtained here correspond to the same point in
        // time. The error is negligible compared to clock differences between nodes.
        let now_instant = Instant::now();
        let now_ms = u64::try_from(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)?
                .as_millis(),
        )?;

        let (first_slot, now_to_first_slot) = self.next_slot_at(now_ms)?;
        let start = tokio::time::Instant::from_std(now_instant) + now_to_first_slot;
        let interval = tokio::time::interval_at(start, self.slot_duration());

        Ok(IntervalStream::new(interval)
            .enumerate()
            .map(move |(ticks_since_start, _)| {
                first_slot.saturating_add(ticks_since_start as u64)
            }))
    }

    fn next_slot_at(&self, now_ms: u64) -> Result<(Slot, Duration)> {
        let genesis_ms = self.genesis_time.saturating_mul(MILLIS_PER_SECOND);

        if now_ms <= genesis_ms {
            return Ok((GENESIS_SLOT, Duration::from_millis(genesis_ms - now_ms)));
        }

        let slots_since_genesis = (now_ms - genesis_ms) / self.slot_duration_ms;
        let next_slot = GENESIS_SLOT + slots_since_genesis + 1;
        let next_slot_ms = self.start_of_slot_ms(next_slot)?;

        Ok((next_slot, Duration::from_millis(next_slot_ms - now_ms)))
    }

    fn start_of_slot_ms(&self, slot: Slot) -> Result<u64> {
        let slots_since_genesis = slot - GENESIS_SLOT;

        self.genesis_time
            .checked_mul(MILLIS_PER_SECOND)
            .zip(slots_since_genesis.checked_mul(self.slot_duration_ms.get()))
            .and_then(|(genesis_ms, genesis_to_slot_ms)| genesis_ms.checked_add(genesis_to_slot_ms))
            .ok_or_else(|| Error::TimeOverflow { slot }.into())
    }

    const fn epoch_duration_ms(&self) -> u64 {
        self.slot_duration_ms
            .get()
            .saturating_mul(self.slots_per_epoch.get())
    }
}

/// UTC midnight at or before `timestamp`.
#[must_use]
pub const fn start_of_day(timestamp: UnixSeconds) -> UnixSeconds {
    timestamp - timestamp % SECONDS_PER_DAY
}

/// Formats a timestamp as a UTC calendar date, as used in log messages.
#[must_use]
pub fn display_day(timestamp: UnixSeconds) -> impl Display {
    i64::try_from(timestamp)
        .ok()
        .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0))
        .map(|time| time.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
