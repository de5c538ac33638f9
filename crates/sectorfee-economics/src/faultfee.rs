//! Continued-fault fees
//!
//! A faulty sector keeps accruing a fee proportional to the reward its
//! quality-adjusted power would have earned over a short projection window.
//! The window differs between the fee used inside termination penalties
//! (3.5 days) and the standalone fault-fee query (3.51 days).

use num_bigint::BigInt;

use sectorfee_core::amount::TokenAmount;
use sectorfee_core::epoch::ChainEpoch;
use sectorfee_core::error::Result;
use sectorfee_core::smoothing::{expected_reward_for_power, FilterEstimate};

/// Projection window for the fault fee inside penalty formulas
pub const FAULT_FEE_PROJECTION_WINDOW: ChainEpoch = 10_080;

/// Projection window for the standalone fault-fee query
pub const STANDALONE_PROJECTION_WINDOW: ChainEpoch = 10_108;

/// Nominal sector size used by the standalone query: 32 GiB
pub const NOMINAL_SECTOR_QAP: u64 = 32 << 30;

/// Continued-fault fee for `qa_power` bytes under the current estimates
pub fn continued_fault_fee(
    reward_estimate: &FilterEstimate,
    power_estimate: &FilterEstimate,
    qa_power: &BigInt,
) -> Result<TokenAmount> {
    expected_reward_for_power(
        reward_estimate,
        power_estimate,
        qa_power,
        FAULT_FEE_PROJECTION_WINDOW,
    )
}

/// Standalone fault fee for one nominal 32 GiB sector
pub fn nominal_fault_fee(
    reward_estimate: &FilterEstimate,
    power_estimate: &FilterEstimate,
) -> Result<TokenAmount> {
    expected_reward_for_power(
        reward_estimate,
        power_estimate,
        &BigInt::from(NOMINAL_SECTOR_QAP),
        STANDALONE_PROJECTION_WINDOW,
    )
}
