//! # sectorfee Core
//!
//! Foundation types for the sector economics aggregation engine:
//! - `TokenAmount` - exact base-unit token arithmetic (10^18 per FIL)
//! - `ChainEpoch` / `DateMapper` - epoch to calendar-date mapping with
//!   deadline quantization
//! - `FilterEstimate` - smoothed network reward/power estimates and the
//!   expected-reward projection used by fault fees
//! - `VersionSchedule` - epoch-ordered protocol version thresholds that
//!   select which historical formula generation applies
//!
//! Everything in this crate is pure and synchronous; chain state enters
//! through `sectorfee-state` and is consumed by `sectorfee-economics`.

pub mod amount;
pub mod epoch;
pub mod error;
pub mod smoothing;
pub mod types;
pub mod version;

pub use amount::{format_scaled, TokenAmount, TOKEN_PRECISION};
pub use epoch::{ChainEpoch, DateMapper, ExpirationRule, QuantSpec};
pub use error::{EconError, Result};
pub use smoothing::{expected_reward_for_power, FilterEstimate};
pub use types::{ChainHead, MinerId, MinerInfo, SectorRecord, VestingEntry, VestingSchedule};
pub use version::{ProtocolVersion, TerminationFormula, VersionSchedule};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::amount::TokenAmount;
    pub use crate::epoch::{ChainEpoch, DateMapper};
    pub use crate::error::{EconError, Result};
    pub use crate::smoothing::FilterEstimate;
    pub use crate::types::{ChainHead, MinerId, MinerInfo, SectorRecord, VestingSchedule};
    pub use crate::version::{ProtocolVersion, VersionSchedule};
}
