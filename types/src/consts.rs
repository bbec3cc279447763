use crate::primitives::{Epoch, Slot, UnixSeconds};

pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;
pub const MIN_ATTESTATION_INCLUSION_DELAY: u64 = 1;
pub const SECONDS_PER_DAY: UnixSeconds = 86_400;
