//! Smoothed network estimates
//!
//! The chain publishes exponentially smoothed (position, velocity) pairs for
//! the per-epoch block reward and the network quality-adjusted power. Fee
//! formulas project a sector's share of future rewards from these estimates
//! rather than from raw instantaneous values.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;
use crate::epoch::ChainEpoch;
use crate::error::{EconError, Result};

/// A smoothed (position, velocity) network estimate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEstimate {
    /// Current smoothed value
    pub position: BigInt,
    /// Smoothed rate of change per epoch
    pub velocity: BigInt,
}

impl FilterEstimate {
    pub fn new(position: impl Into<BigInt>, velocity: impl Into<BigInt>) -> Self {
        Self {
            position: position.into(),
            velocity: velocity.into(),
        }
    }

    /// A constant estimate with no drift
    pub fn constant(position: impl Into<BigInt>) -> Self {
        Self::new(position, 0)
    }
}

/// Extrapolates the cumulative sum of `reward / power` over `window` epochs.
///
/// First-order expansion around the current estimates:
///
/// ```text
/// csr(T) = T * Rp/Pp + (T^2 / 2) * (Rv*Pp - Rp*Pv) / Pp^2
/// ```
///
/// Exact in rationals; fails rather than divide by a zero power position.
pub fn extrapolated_cum_sum_of_ratio(
    window: ChainEpoch,
    reward: &FilterEstimate,
    power: &FilterEstimate,
) -> Result<BigRational> {
    if power.position.is_zero() {
        return Err(EconError::DivisionByZero("network power estimate"));
    }
    let t = BigInt::from(window);
    let pp2 = &power.position * &power.position;

    let linear = BigRational::new(&t * &reward.position, power.position.clone());
    let drift_numer =
        (&reward.velocity * &power.position - &reward.position * &power.velocity) * &t * &t;
    let drift = BigRational::new(drift_numer, pp2 * BigInt::from(2));

    Ok(linear + drift)
}

/// Expected reward a quantity of quality-adjusted power earns over `window`
/// epochs, given the network estimates. Negative projections clamp to zero.
pub fn expected_reward_for_power(
    reward: &FilterEstimate,
    power: &FilterEstimate,
    qa_power: &BigInt,
    window: ChainEpoch,
) -> Result<TokenAmount> {
    let csr = extrapolated_cum_sum_of_ratio(window, reward, power)?;
    let projected = csr * BigRational::from_integer(qa_power.clone());
    Ok(TokenAmount::from_rational(&projected).clamp_non_negative())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_ratio_projection() {
        // reward 100 atto/epoch over power 1000 bytes, no drift:
        // a byte earns window * 0.1 atto
        let reward = FilterEstimate::constant(100);
        let power = FilterEstimate::constant(1000);
        let fee = expected_reward_for_power(&reward, &power, &BigInt::from(50), 1000).unwrap();
        // 1000 * 100/1000 * 50 = 5000
        assert_eq!(fee, TokenAmount::from_atto(5000));
    }

    #[test]
    fn test_drift_term_contributes() {
        // Growing reward, constant power: csr gains T^2/2 * Rv/Pp
        let reward = FilterEstimate::new(100, 2);
        let power = FilterEstimate::constant(1000);
        let fee = expected_reward_for_power(&reward, &power, &BigInt::from(1), 100).unwrap();
        // linear: 100 * 100/1000 = 10; drift: 100^2/2 * 2/1000 = 10
        assert_eq!(fee, TokenAmount::from_atto(20));
    }

    #[test]
    fn test_zero_power_position_fails() {
        let reward = FilterEstimate::constant(100);
        let power = FilterEstimate::constant(0);
        let err = expected_reward_for_power(&reward, &power, &BigInt::from(1), 100).unwrap_err();
        assert!(matches!(err, EconError::DivisionByZero(_)));
    }

    #[test]
    fn test_negative_projection_clamps() {
        // Falling reward dominating the window projects negative; clamp to zero
        let reward = FilterEstimate::new(10, -1000);
        let power = FilterEstimate::constant(1000);
        let fee = expected_reward_for_power(&reward, &power, &BigInt::from(1), 10_000).unwrap();
        assert_eq!(fee, TokenAmount::zero());
    }
}
