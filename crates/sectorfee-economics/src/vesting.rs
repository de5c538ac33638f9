//! Vesting decumulation
//!
//! Walks a locked-funds schedule forward one day at a time: each step
//! queries the cumulative vested amount at the new epoch, emits the delta
//! keyed to the day that just closed, and decrements the remaining locked
//! balance. Two states: accumulating (remaining > 0) and done (remaining
//! == 0). A cumulative total that decreases, or a schedule that fails to
//! drain, is a protocol-state anomaly and aborts the computation.

use serde::{Deserialize, Serialize};

use sectorfee_core::amount::TokenAmount;
use sectorfee_core::epoch::{ChainEpoch, DateMapper, EPOCHS_IN_DAY};
use sectorfee_core::error::{EconError, Result};
use sectorfee_core::types::VestingSchedule;

/// Funds that became liquid on one calendar day
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VestingStep {
    /// Day the funds vested
    pub date: String,
    /// Amount newly vested that day
    pub vested: TokenAmount,
}

/// Decumulates `schedule` day by day starting after `start_epoch`.
///
/// The emitted deltas sum exactly to the schedule's initial locked total.
/// Steps with a zero delta are still emitted while funds remain locked, so
/// the series has no calendar gaps.
pub fn decumulate(
    schedule: &VestingSchedule,
    start_epoch: ChainEpoch,
    mapper: &DateMapper,
) -> Result<Vec<VestingStep>> {
    let mut remaining = schedule.total_locked();
    let mut steps = Vec::new();
    if remaining.is_zero() {
        return Ok(steps);
    }
    if remaining.is_negative() {
        return Err(EconError::VestingAnomaly {
            epoch: start_epoch,
            previous: "0".to_string(),
            current: remaining.to_string(),
        });
    }

    // one day past the last tranche everything must have drained
    let deadline = schedule
        .last_epoch()
        .map(|last| last + EPOCHS_IN_DAY)
        .unwrap_or(start_epoch);

    let mut epoch = start_epoch;
    let mut previously_vested = TokenAmount::zero();
    while remaining.is_positive() {
        epoch += EPOCHS_IN_DAY;

        let vested = schedule.vested_at(epoch);
        if vested < previously_vested {
            return Err(EconError::VestingAnomaly {
                epoch,
                previous: previously_vested.to_string(),
                current: vested.to_string(),
            });
        }
        let delta = vested.clone() - &previously_vested;
        previously_vested = vested;

        if &remaining < &delta {
            return Err(EconError::VestingAnomaly {
                epoch,
                previous: remaining.to_string(),
                current: delta.to_string(),
            });
        }
        remaining -= &delta;

        // the boundary epoch belongs to the day that just closed
        steps.push(VestingStep {
            date: mapper.date_key(epoch - 1),
            vested: delta,
        });

        if remaining.is_positive() && epoch > deadline {
            return Err(EconError::VestingStalled(remaining.to_string()));
        }
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectorfee_core::types::VestingEntry;

    fn schedule(entries: &[(ChainEpoch, i64)]) -> VestingSchedule {
        VestingSchedule::new(
            entries
                .iter()
                .map(|&(epoch, amount)| VestingEntry {
                    epoch,
                    amount: TokenAmount::from_atto(amount),
                })
                .collect(),
        )
    }

    #[test]
    fn test_deltas_sum_to_initial_locked() {
        let sched = schedule(&[
            (EPOCHS_IN_DAY, 100),
            (2 * EPOCHS_IN_DAY, 250),
            (4 * EPOCHS_IN_DAY, 650),
        ]);
        let steps = decumulate(&sched, 0, &DateMapper::mainnet()).unwrap();

        let total: TokenAmount = steps.iter().map(|s| s.vested.clone()).sum();
        assert_eq!(total, TokenAmount::from_atto(1000));
        // day 3 has no tranche but is still emitted
        assert_eq!(steps.len(), 4);
        assert!(steps[2].vested.is_zero());
    }

    #[test]
    fn test_terminates_exactly_at_zero() {
        let sched = schedule(&[(EPOCHS_IN_DAY, 5)]);
        let steps = decumulate(&sched, 0, &DateMapper::mainnet()).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].vested, TokenAmount::from_atto(5));
    }

    #[test]
    fn test_step_dates_advance_daily() {
        let mapper = DateMapper::mainnet();
        let sched = schedule(&[(EPOCHS_IN_DAY, 1), (2 * EPOCHS_IN_DAY, 1)]);
        let steps = decumulate(&sched, 0, &mapper).unwrap();
        assert_eq!(steps[0].date, mapper.date_key(EPOCHS_IN_DAY - 1));
        assert_eq!(steps[1].date, mapper.date_key(2 * EPOCHS_IN_DAY - 1));
        assert!(steps[0].date < steps[1].date);
    }

    #[test]
    fn test_empty_schedule_is_done() {
        let steps = decumulate(&VestingSchedule::default(), 0, &DateMapper::mainnet()).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn test_negative_tranche_is_an_anomaly() {
        // A negative tranche makes the cumulative total decrease
        let sched = schedule(&[(EPOCHS_IN_DAY, 100), (2 * EPOCHS_IN_DAY, -40)]);
        let err = decumulate(&sched, 0, &DateMapper::mainnet()).unwrap_err();
        assert!(matches!(err, EconError::VestingAnomaly { .. }));
    }
}
