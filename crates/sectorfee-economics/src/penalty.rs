//! Termination penalties
//!
//! Two formula families, selected by the protocol version at the evaluation
//! epoch:
//!
//! | Family | Shape |
//! |--------|-------|
//! | Expected-reward | half the capped-lifetime day rewards + storage pledge |
//! | Pledge-percentage | max(8.5% pledge pro-rated by age, 2% pledge / 105% fault fee floor) |
//!
//! The evaluation epoch may be shifted by a caller-supplied day offset in
//! either direction; ages are clamped so a negative offset can never push a
//! sector's age below zero.

use num_bigint::BigInt;
use num_rational::BigRational;

use sectorfee_core::amount::TokenAmount;
use sectorfee_core::epoch::{ChainEpoch, EPOCHS_IN_DAY};
use sectorfee_core::error::Result;
use sectorfee_core::smoothing::FilterEstimate;
use sectorfee_core::types::SectorRecord;
use sectorfee_core::version::{ProtocolVersion, TerminationFormula};

use crate::faultfee::continued_fault_fee;

/// Maximum sector lifetime credited by the penalty, in days
pub const LIFETIME_CAP_DAYS: i64 = 140;

/// Lifetime cap in epochs
pub const LIFETIME_CAP: ChainEpoch = LIFETIME_CAP_DAYS * EPOCHS_IN_DAY;

/// Pledge share of the age-pro-rated cap: 8.5%
const CAP_PLEDGE_NUM: i64 = 85;
const CAP_PLEDGE_DENOM: i64 = 1000;

/// Pledge share of the unconditional floor: 2%
const FLOOR_PLEDGE_NUM: i64 = 2;
const FLOOR_PLEDGE_DENOM: i64 = 100;

/// Fault-fee multiple of the floor: 105%
const FLOOR_FAULT_NUM: i64 = 105;
const FLOOR_FAULT_DENOM: i64 = 100;

/// Penalty for terminating `sector` at `at_epoch` under `version`.
///
/// The network estimates are only consulted by the pledge-percentage family
/// (for its fault-fee floor); the expected-reward family ignores them.
pub fn termination_penalty(
    version: ProtocolVersion,
    sector: &SectorRecord,
    at_epoch: ChainEpoch,
    reward_estimate: &FilterEstimate,
    power_estimate: &FilterEstimate,
) -> Result<TokenAmount> {
    match version.termination_formula() {
        TerminationFormula::ExpectedReward => Ok(expected_reward_penalty(sector, at_epoch)),
        TerminationFormula::PledgePercentage => {
            pledge_percentage_penalty(sector, at_epoch, reward_estimate, power_estimate)
        }
    }
}

/// Expected-reward termination penalty.
///
/// Spreads the sector's (and any replaced sector's) day rewards over the
/// capped lifetime, halves them, converts epoch-count to days and adds the
/// expected storage pledge. Before activation the reward terms are not
/// meaningful and the penalty degenerates to the storage pledge alone.
fn expected_reward_penalty(sector: &SectorRecord, at_epoch: ChainEpoch) -> TokenAmount {
    if at_epoch < sector.activation_epoch {
        return sector.expected_storage_pledge.clone();
    }

    let sector_age = at_epoch - sector.power_base_epoch;
    let capped_age = sector_age.clamp(0, LIFETIME_CAP);

    let replaced_age = sector.power_base_epoch - sector.activation_epoch;
    let relevant_replaced_age = replaced_age.min(LIFETIME_CAP - capped_age).max(0);

    let expected_reward = &sector.expected_day_reward * capped_age
        + &(&sector.replaced_day_reward * relevant_replaced_age);

    // halve the spread, then convert the epoch-weighted sum to day units
    let spread = expected_reward
        .div_floor(2)
        .and_then(|half| half.div_floor(EPOCHS_IN_DAY))
        .expect("constant divisors are nonzero");

    spread + &sector.expected_storage_pledge
}

/// Pledge-percentage termination penalty.
///
/// `max(min(8.5% * IP, 8.5% * IP * age / 140d), max(2% * IP, 105% * fault_fee))`
/// where the fault fee projects the sector's QA power over the continued-fault
/// window using the request's network estimates.
fn pledge_percentage_penalty(
    sector: &SectorRecord,
    at_epoch: ChainEpoch,
    reward_estimate: &FilterEstimate,
    power_estimate: &FilterEstimate,
) -> Result<TokenAmount> {
    let age = (at_epoch - sector.activation_epoch).max(0);
    let pledge = sector.initial_pledge.to_rational();

    let cap_share = BigRational::new(CAP_PLEDGE_NUM.into(), CAP_PLEDGE_DENOM.into());
    let full_cap = &pledge * &cap_share;
    let prorated = &full_cap * BigRational::new(BigInt::from(age), BigInt::from(LIFETIME_CAP));
    let base_fee = if prorated < full_cap { prorated } else { full_cap };

    let fault_fee = continued_fault_fee(reward_estimate, power_estimate, &sector.qa_power)?;
    let fault_floor = fault_fee.to_rational()
        * BigRational::new(FLOOR_FAULT_NUM.into(), FLOOR_FAULT_DENOM.into());
    let pledge_floor =
        &pledge * BigRational::new(FLOOR_PLEDGE_NUM.into(), FLOOR_PLEDGE_DENOM.into());
    let min_fee = if pledge_floor > fault_floor {
        pledge_floor
    } else {
        fault_floor
    };

    let penalty = if base_fee > min_fee { base_fee } else { min_fee };
    Ok(TokenAmount::from_rational(&penalty).clamp_non_negative())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sectorfee_core::version::ProtocolVersion;

    fn sector(
        activation: ChainEpoch,
        power_base: ChainEpoch,
        day_reward_atto: i64,
        replaced_atto: i64,
        storage_pledge_atto: i64,
    ) -> SectorRecord {
        SectorRecord {
            sector_number: 1,
            activation_epoch: activation,
            expiration_epoch: activation + 540 * EPOCHS_IN_DAY,
            power_base_epoch: power_base,
            expected_day_reward: TokenAmount::from_atto(day_reward_atto),
            replaced_day_reward: TokenAmount::from_atto(replaced_atto),
            initial_pledge: TokenAmount::from_whole(1),
            expected_storage_pledge: TokenAmount::from_atto(storage_pledge_atto),
            daily_fee: TokenAmount::zero(),
            qa_power: BigInt::from(32u64 << 30),
            deadline_index: 0,
        }
    }

    fn flat_estimates() -> (FilterEstimate, FilterEstimate) {
        (
            FilterEstimate::constant(BigInt::from(1_000_000u64)),
            FilterEstimate::constant(BigInt::from(1u64) << 60),
        )
    }

    #[test]
    fn test_expected_reward_penalty_caps_age() {
        // age far past the cap: reward term = edr * cap / 2 / epochs_in_day
        let s = sector(0, 0, 2 * EPOCHS_IN_DAY, 0, 7);
        let (re, pe) = flat_estimates();
        let penalty = termination_penalty(
            ProtocolVersion::Genesis,
            &s,
            LIFETIME_CAP * 10,
            &re,
            &pe,
        )
        .unwrap();
        // edr * LIFETIME_CAP / 2 / 2880 = 2*2880 * 403200 / 5760 = 403200
        assert_eq!(penalty, TokenAmount::from_atto(LIFETIME_CAP + 7));
    }

    #[test]
    fn test_expected_reward_penalty_before_activation() {
        let s = sector(10_000, 10_000, 5760, 0, 42);
        let (re, pe) = flat_estimates();
        let penalty =
            termination_penalty(ProtocolVersion::Genesis, &s, 9_999, &re, &pe).unwrap();
        assert_eq!(penalty, TokenAmount::from_atto(42));
    }

    #[test]
    fn test_expected_reward_counts_replaced_sector() {
        // power base 70 days after activation; current epoch 70 days after that
        let activation = 0;
        let power_base = 70 * EPOCHS_IN_DAY;
        let now = 140 * EPOCHS_IN_DAY;
        let s = sector(activation, power_base, 5760, 2880, 0);
        let (re, pe) = flat_estimates();
        let penalty =
            termination_penalty(ProtocolVersion::DeadlineQuant, &s, now, &re, &pe).unwrap();
        // capped_age = 70d; relevant_replaced = min(70d, 140d - 70d) = 70d
        // (5760 * 201600 + 2880 * 201600) / 2 / 2880 = (2*201600 + 201600)/2 = 302400
        assert_eq!(penalty, TokenAmount::from_atto(302_400));
    }

    #[test]
    fn test_pledge_percentage_worked_example() {
        // 1.0 pledge, 70-day age, negligible fault fee:
        // base = min(0.085, 0.085 * 70/140) = 0.0425; floor = 0.02 -> 0.0425
        let s = sector(0, 0, 0, 0, 0);
        let (re, pe) = flat_estimates();
        let penalty = termination_penalty(
            ProtocolVersion::ProofFee,
            &s,
            70 * EPOCHS_IN_DAY,
            &re,
            &pe,
        )
        .unwrap();
        assert_eq!(penalty.format_units(10), "0.0425000000");
    }

    #[test]
    fn test_pledge_percentage_floor_wins_when_young() {
        // age zero: base = 0, floor = 2% of pledge
        let s = sector(0, 0, 0, 0, 0);
        let (re, pe) = flat_estimates();
        let penalty =
            termination_penalty(ProtocolVersion::ProofFee, &s, 0, &re, &pe).unwrap();
        assert_eq!(penalty.format_units(10), "0.0200000000");
    }

    #[test]
    fn test_pledge_percentage_fault_fee_floor() {
        // Estimates chosen so 105% of the fault fee beats 2% of pledge:
        // ratio 1e12 atto per byte-epoch over 10080 epochs on 2^35 qa bytes
        let s = sector(0, 0, 0, 0, 0);
        let reward = FilterEstimate::constant(BigInt::from(1_000_000_000_000u64));
        let power = FilterEstimate::constant(BigInt::from(1u64));
        let penalty =
            termination_penalty(ProtocolVersion::ProofFee, &s, 0, &reward, &power).unwrap();
        let fault_fee = continued_fault_fee(&reward, &power, &s.qa_power).unwrap();
        let expected = TokenAmount::from_rational(
            &(fault_fee.to_rational() * BigRational::new(105.into(), 100.into())),
        );
        assert_eq!(penalty, expected);
    }

    proptest! {
        #[test]
        fn prop_capped_age_bounds(
            activation in 0i64..10_000_000,
            base_delta in 0i64..1_000_000,
            eval_delta in -1_000_000i64..10_000_000,
        ) {
            let power_base = activation + base_delta;
            let at = power_base + eval_delta;
            let capped = (at - power_base).clamp(0, LIFETIME_CAP);
            prop_assert!(capped >= 0);
            prop_assert!(capped <= LIFETIME_CAP);
        }

        #[test]
        fn prop_selector_is_pure_and_penalty_deterministic(
            activation in 0i64..1_000_000,
            age in 0i64..600_000,
            edr in 0i64..1_000_000,
        ) {
            let s = sector(activation, activation, edr, 0, 13);
            let (re, pe) = flat_estimates();
            let at = activation + age;
            for version in [ProtocolVersion::Genesis, ProtocolVersion::ProofFee] {
                let a = termination_penalty(version, &s, at, &re, &pe).unwrap();
                let b = termination_penalty(version, &s, at, &re, &pe).unwrap();
                prop_assert_eq!(a, b);
            }
        }

        #[test]
        fn prop_penalty_never_negative(
            activation in 0i64..1_000_000,
            eval in -2_000_000i64..2_000_000,
            edr in 0i64..1_000_000,
        ) {
            let s = sector(activation, activation, edr, 0, 0);
            let (re, pe) = flat_estimates();
            for version in [ProtocolVersion::Genesis, ProtocolVersion::ProofFee] {
                let p = termination_penalty(version, &s, eval, &re, &pe).unwrap();
                prop_assert!(!p.is_negative());
            }
        }
    }
}
