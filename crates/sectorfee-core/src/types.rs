//! Chain-state snapshot types
//!
//! These are the immutable per-request inputs: the chain head, the queried
//! account, its sector records and its vesting schedule. They are fetched
//! once by the state adapter and owned exclusively by the request.

use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;
use crate::epoch::ChainEpoch;
use crate::error::{EconError, Result};

/// A validated storage-provider actor identifier (`f0...` / `t0...`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinerId(String);

impl MinerId {
    /// Parses an ID-class actor address: network prefix `f` or `t`,
    /// protocol digit `0`, then the numeric actor id.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || EconError::InvalidMiner(s.to_string());
        if s.is_empty() {
            return Err(EconError::InvalidMiner("(empty)".to_string()));
        }
        let mut chars = s.chars();
        match chars.next() {
            Some('f') | Some('t') => {}
            _ => return Err(invalid()),
        }
        if chars.next() != Some('0') {
            return Err(invalid());
        }
        let digits: &str = &s[2..];
        if digits.is_empty() || digits.parse::<u64>().is_err() {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric actor id
    pub fn actor_id(&self) -> u64 {
        self.0[2..].parse().expect("validated at construction")
    }
}

impl fmt::Display for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current head of the chain
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ChainHead {
    /// Head epoch
    pub epoch: ChainEpoch,
    /// Head block timestamp (Unix seconds)
    pub timestamp: u64,
}

/// Static per-miner state needed by every report
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MinerInfo {
    /// Size of each of this miner's sectors in bytes
    pub sector_size: u64,
    /// Start epoch of the current proving period
    pub period_start: ChainEpoch,
}

/// On-chain snapshot of one sector
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SectorRecord {
    /// Sector number, unique per miner
    pub sector_number: u64,
    /// Epoch the sector was first committed
    pub activation_epoch: ChainEpoch,
    /// Scheduled expiration epoch (unquantized)
    pub expiration_epoch: ChainEpoch,
    /// Epoch the sector's current power took effect (snap/replace resets it)
    pub power_base_epoch: ChainEpoch,
    /// Expected one-day reward at activation
    pub expected_day_reward: TokenAmount,
    /// One-day reward of the sector this one replaced, if any
    pub replaced_day_reward: TokenAmount,
    /// Pledge locked against the sector
    pub initial_pledge: TokenAmount,
    /// Expected storage pledge component of the termination penalty
    pub expected_storage_pledge: TokenAmount,
    /// Per-day protocol fee charged against this sector
    pub daily_fee: TokenAmount,
    /// Quality-adjusted power in bytes
    pub qa_power: BigInt,
    /// Proving deadline this sector is assigned to
    pub deadline_index: u64,
}

/// One locked-funds tranche: `amount` becomes liquid at `epoch`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VestingEntry {
    pub epoch: ChainEpoch,
    pub amount: TokenAmount,
}

/// A miner's locked-rewards vesting schedule, ordered by epoch
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub entries: Vec<VestingEntry>,
}

impl VestingSchedule {
    pub fn new(mut entries: Vec<VestingEntry>) -> Self {
        entries.sort_by_key(|e| e.epoch);
        Self { entries }
    }

    /// Total funds still locked at the schedule's snapshot
    pub fn total_locked(&self) -> TokenAmount {
        self.entries.iter().map(|e| e.amount.clone()).sum()
    }

    /// Funds vested once the chain reaches `epoch` (tranches at or before it)
    pub fn vested_at(&self, epoch: ChainEpoch) -> TokenAmount {
        self.entries
            .iter()
            .take_while(|e| e.epoch <= epoch)
            .map(|e| e.amount.clone())
            .sum()
    }

    /// Epoch of the last tranche, if any
    pub fn last_epoch(&self) -> Option<ChainEpoch> {
        self.entries.last().map(|e| e.epoch)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miner_id_accepts_id_addresses() {
        for ok in ["f01234", "t0999", "f01"] {
            let id = MinerId::parse(ok).unwrap();
            assert_eq!(id.as_str(), ok);
        }
        assert_eq!(MinerId::parse("f01234").unwrap().actor_id(), 1234);
    }

    #[test]
    fn test_miner_id_rejects_malformed() {
        for bad in ["", "x01234", "f1abc", "f2xyz", "f0", "f0notdigits", "01234"] {
            assert!(MinerId::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_vesting_schedule_sorts_and_sums() {
        let schedule = VestingSchedule::new(vec![
            VestingEntry { epoch: 200, amount: TokenAmount::from_whole(2) },
            VestingEntry { epoch: 100, amount: TokenAmount::from_whole(1) },
        ]);
        assert_eq!(schedule.entries[0].epoch, 100);
        assert_eq!(schedule.total_locked(), TokenAmount::from_whole(3));
        assert_eq!(schedule.vested_at(99), TokenAmount::zero());
        assert_eq!(schedule.vested_at(100), TokenAmount::from_whole(1));
        assert_eq!(schedule.vested_at(500), TokenAmount::from_whole(3));
        assert_eq!(schedule.last_epoch(), Some(200));
    }
}
