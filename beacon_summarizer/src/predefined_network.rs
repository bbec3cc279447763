use core::{num::NonZeroU64, time::Duration};

use anyhow::Result;
use clap::ValueEnum;
use clock::ChainClock;
use nonzero_ext::nonzero;
use strum::Display;
use types::primitives::UnixSeconds;

const SLOT_DURATION: Duration = Duration::from_secs(12);
const SLOTS_PER_EPOCH: NonZeroU64 = nonzero!(32_u64);

#[derive(Clone, Copy, Default, Display, ValueEnum)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(test, derive(PartialEq, Eq, Debug))]
pub enum PredefinedNetwork {
    #[default]
    Mainnet,
    Sepolia,
    Holesky,
    Hoodi,
}

impl PredefinedNetwork {
    #[must_use]
    pub const fn genesis_time(self) -> UnixSeconds {
        match self {
            Self::Mainnet => 1_606_824_023,
            Self::Sepolia => 1_655_733_600,
            Self::Holesky => 1_695_902_400,
            Self::Hoodi => 1_742_213_400,
        }
    }

    #[must_use]
    pub const fn slot_duration(self) -> Duration {
        SLOT_DURATION
    }

    #[must_use]
    pub const fn slots_per_epoch(self) -> NonZeroU64 {
        SLOTS_PER_EPOCH
    }

    pub fn chain_clock(self) -> Result<ChainClock> {
        ChainClock::new(
            self.genesis_time(),
            self.slot_duration(),
            self.slots_per_epoch(),
        )
    }
}
