//! Chain epochs and calendar-date mapping
//!
//! Epoch to wall-clock conversion is linear: one epoch every thirty seconds
//! from the network genesis timestamp. Expiration epochs are quantized to
//! proving-deadline boundaries before they are mapped to a calendar day;
//! two historical quantization rules exist and are selected by the protocol
//! version schedule.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EconError, Result};

/// The chain's discrete time unit
pub type ChainEpoch = i64;

/// Seconds between consecutive epochs
pub const EPOCH_DURATION_SECONDS: i64 = 30;

/// Epochs in one calendar day
pub const EPOCHS_IN_DAY: ChainEpoch = 2880;

/// Number of proving deadlines in one proving period
pub const WPOST_PERIOD_DEADLINES: u64 = 48;

/// Epochs in one proving-deadline challenge window
pub const WPOST_CHALLENGE_WINDOW: ChainEpoch = 60;

/// Epochs in one full proving period (48 windows of 60 epochs)
pub const WPOST_PROVING_PERIOD: ChainEpoch = WPOST_CHALLENGE_WINDOW * WPOST_PERIOD_DEADLINES as i64;

/// Mainnet genesis block timestamp (2020-08-24 22:00:00 UTC)
pub const MAINNET_GENESIS_TIMESTAMP: i64 = 1_598_306_400;

/// Rounds epochs up to the next boundary of a repeating cycle.
///
/// Boundaries fall at `offset + n * unit`; epochs already on a boundary are
/// unchanged. Mirrors the miner actor's expiration quantization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantSpec {
    /// Cycle length in epochs
    pub unit: ChainEpoch,
    /// Phase of the cycle
    pub offset: ChainEpoch,
}

impl QuantSpec {
    /// Quantization for a given deadline of a proving period.
    ///
    /// The boundary is the last epoch of that deadline's challenge window,
    /// recurring once per proving period.
    pub fn for_deadline(period_start: ChainEpoch, deadline_idx: u64) -> Self {
        Self {
            unit: WPOST_PROVING_PERIOD,
            offset: period_start + (deadline_idx as i64 + 1) * WPOST_CHALLENGE_WINDOW - 1,
        }
    }

    /// Smallest boundary epoch >= `epoch`
    pub fn quantize_up(&self, epoch: ChainEpoch) -> ChainEpoch {
        let rem = (epoch - self.offset).rem_euclid(self.unit);
        if rem == 0 {
            epoch
        } else {
            epoch + (self.unit - rem)
        }
    }
}

/// Which expiration-to-boundary rule is in force
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirationRule {
    /// Legacy rule: shift the raw expiration by the deadline's window offset
    AdditiveOffset,
    /// Quantize up to the deadline's next boundary within the proving period
    DeadlineQuantized,
}

/// Converts epochs to fixed-width ISO 8601 calendar-date keys
///
/// The UTC offset shifts which wall-clock day an epoch lands in; the key
/// format itself is always `YYYY-MM-DD` so that lexicographic order equals
/// chronological order.
#[derive(Clone, Copy, Debug)]
pub struct DateMapper {
    genesis_timestamp: i64,
    utc_offset_secs: i64,
}

impl DateMapper {
    pub fn new(genesis_timestamp: i64, utc_offset_secs: i64) -> Self {
        Self {
            genesis_timestamp,
            utc_offset_secs,
        }
    }

    /// Mainnet genesis, dates reported in UTC
    pub fn mainnet() -> Self {
        Self::new(MAINNET_GENESIS_TIMESTAMP, 0)
    }

    /// Unix timestamp of an epoch
    pub fn timestamp(&self, epoch: ChainEpoch) -> i64 {
        self.genesis_timestamp + epoch * EPOCH_DURATION_SECONDS
    }

    /// Calendar-date key (`YYYY-MM-DD`) of the day an epoch falls in
    pub fn date_key(&self, epoch: ChainEpoch) -> String {
        let ts = self.timestamp(epoch) + self.utc_offset_secs;
        let dt: DateTime<Utc> = Utc
            .timestamp_opt(ts, 0)
            .single()
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
        let key = dt.format("%Y-%m-%d").to_string();
        debug_assert_eq!(key.len(), 10, "date keys must be fixed-width");
        key
    }

    /// Date key for a quantized sector expiration.
    ///
    /// The quantized rule lands exactly on a deadline boundary, and the
    /// boundary epoch belongs to the previous day, so it maps `epoch - 1`.
    /// The additive rule maps the shifted epoch directly.
    pub fn expiration_date(
        &self,
        rule: ExpirationRule,
        expiration: ChainEpoch,
        deadline_idx: u64,
        period_start: ChainEpoch,
    ) -> Result<String> {
        if deadline_idx >= WPOST_PERIOD_DEADLINES {
            return Err(EconError::DeadlineOutOfRange(deadline_idx));
        }
        let epoch = match rule {
            ExpirationRule::AdditiveOffset => {
                expiration + deadline_idx as i64 * WPOST_CHALLENGE_WINDOW
            }
            ExpirationRule::DeadlineQuantized => {
                QuantSpec::for_deadline(period_start, deadline_idx).quantize_up(expiration) - 1
            }
        };
        Ok(self.date_key(epoch))
    }

    /// Epoch of the most recent local midnight before `now`
    pub fn epoch_at_midnight(&self, now: DateTime<Utc>) -> ChainEpoch {
        let local = now.timestamp() + self.utc_offset_secs;
        let midnight = local.div_euclid(86_400) * 86_400 - self.utc_offset_secs;
        (midnight - self.genesis_timestamp) / EPOCH_DURATION_SECONDS
    }

    /// Midnight epoch shifted by a whole number of days.
    ///
    /// The offset comes straight from a query parameter; an extreme value
    /// that would overflow the epoch arithmetic is a caller error.
    pub fn epoch_at_midnight_offset(
        &self,
        now: DateTime<Utc>,
        offset_days: i64,
    ) -> Result<ChainEpoch> {
        offset_days
            .checked_mul(EPOCHS_IN_DAY)
            .and_then(|shift| self.epoch_at_midnight(now).checked_add(shift))
            .ok_or(EconError::OffsetOutOfRange(offset_days))
    }
}
