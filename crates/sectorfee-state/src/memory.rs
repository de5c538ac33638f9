//! In-memory state adapter for tests
//!
//! Serves fixed snapshots; construction mirrors what a real node would
//! answer so pipeline tests can run without a network.

use std::collections::HashMap;

use async_trait::async_trait;
use num_bigint::BigInt;

use sectorfee_core::amount::TokenAmount;
use sectorfee_core::epoch::{ChainEpoch, WPOST_PERIOD_DEADLINES};
use sectorfee_core::error::{EconError, Result};
use sectorfee_core::smoothing::FilterEstimate;
use sectorfee_core::types::{ChainHead, MinerId, MinerInfo, SectorRecord, VestingSchedule};

use crate::{DeadlineSectors, NetworkEstimates, StateAdapter};

/// Fixture-backed adapter
#[derive(Clone, Debug)]
pub struct MemoryAdapter {
    pub head: ChainHead,
    pub miner: MinerId,
    pub info: MinerInfo,
    /// Deadline index -> membership
    pub deadlines: HashMap<u64, DeadlineSectors>,
    /// Every sector ever recorded
    pub sectors: Vec<SectorRecord>,
    /// Sector numbers considered currently active
    pub active: Vec<u64>,
    pub estimates: NetworkEstimates,
    pub supply: TokenAmount,
    pub fees: Vec<TokenAmount>,
    pub vesting: VestingSchedule,
}

impl MemoryAdapter {
    /// A minimal healthy fixture for one miner
    pub fn new(miner: MinerId, head_epoch: ChainEpoch) -> Self {
        Self {
            head: ChainHead {
                epoch: head_epoch,
                timestamp: 0,
            },
            miner,
            info: MinerInfo {
                sector_size: 32 << 30,
                period_start: 0,
            },
            deadlines: HashMap::new(),
            sectors: Vec::new(),
            active: Vec::new(),
            estimates: NetworkEstimates {
                reward: FilterEstimate::constant(BigInt::from(1_000_000_000u64)),
                qa_power: FilterEstimate::constant(BigInt::from(1u128 << 62)),
            },
            supply: TokenAmount::from_whole(400_000_000i64),
            fees: vec![TokenAmount::zero(); WPOST_PERIOD_DEADLINES as usize],
            vesting: VestingSchedule::default(),
        }
    }

    /// Adds a sector and registers it live in its deadline
    pub fn push_sector(&mut self, sector: SectorRecord, active: bool) {
        let slot = self.deadlines.entry(sector.deadline_index).or_default();
        slot.all_sectors.push(sector.sector_number);
        slot.live_sectors.push(sector.sector_number);
        if active {
            self.active.push(sector.sector_number);
        }
        self.sectors.push(sector);
    }

    fn check_miner(&self, miner: &MinerId) -> Result<()> {
        if miner != &self.miner {
            return Err(EconError::Upstream(format!("unknown miner {miner}")));
        }
        Ok(())
    }
}

#[async_trait]
impl StateAdapter for MemoryAdapter {
    async fn chain_head(&self) -> Result<ChainHead> {
        Ok(self.head)
    }

    async fn miner_info(&self, miner: &MinerId) -> Result<MinerInfo> {
        self.check_miner(miner)?;
        Ok(self.info)
    }

    async fn deadline_sectors(
        &self,
        miner: &MinerId,
        deadline_idx: u64,
    ) -> Result<DeadlineSectors> {
        self.check_miner(miner)?;
        if deadline_idx >= WPOST_PERIOD_DEADLINES {
            return Err(EconError::DeadlineOutOfRange(deadline_idx));
        }
        Ok(self.deadlines.get(&deadline_idx).cloned().unwrap_or_default())
    }

    async fn miner_sectors(&self, miner: &MinerId, all: bool) -> Result<Vec<SectorRecord>> {
        self.check_miner(miner)?;
        if all {
            Ok(self.sectors.clone())
        } else {
            Ok(self
                .sectors
                .iter()
                .filter(|s| self.active.contains(&s.sector_number))
                .cloned()
                .collect())
        }
    }

    async fn network_estimates(&self) -> Result<NetworkEstimates> {
        Ok(self.estimates.clone())
    }

    async fn circulating_supply(&self) -> Result<TokenAmount> {
        Ok(self.supply.clone())
    }

    async fn deadline_fees(&self, miner: &MinerId) -> Result<Vec<TokenAmount>> {
        self.check_miner(miner)?;
        Ok(self.fees.clone())
    }

    async fn vesting_schedule(
        &self,
        miner: &MinerId,
        _at_epoch: ChainEpoch,
    ) -> Result<VestingSchedule> {
        self.check_miner(miner)?;
        Ok(self.vesting.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(number: u64, deadline: u64) -> SectorRecord {
        SectorRecord {
            sector_number: number,
            activation_epoch: 0,
            expiration_epoch: 1_000_000,
            power_base_epoch: 0,
            expected_day_reward: TokenAmount::zero(),
            replaced_day_reward: TokenAmount::zero(),
            initial_pledge: TokenAmount::zero(),
            expected_storage_pledge: TokenAmount::zero(),
            daily_fee: TokenAmount::zero(),
            qa_power: BigInt::from(32u64 << 30),
            deadline_index: deadline,
        }
    }

    #[tokio::test]
    async fn test_active_filter() {
        let miner = MinerId::parse("f01000").unwrap();
        let mut adapter = MemoryAdapter::new(miner.clone(), 100);
        adapter.push_sector(record(1, 0), true);
        adapter.push_sector(record(2, 3), false);

        assert_eq!(adapter.miner_sectors(&miner, true).await.unwrap().len(), 2);
        assert_eq!(adapter.miner_sectors(&miner, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_miner_is_upstream_error() {
        let adapter = MemoryAdapter::new(MinerId::parse("f01000").unwrap(), 100);
        let other = MinerId::parse("f09999").unwrap();
        assert!(adapter.miner_info(&other).await.is_err());
    }

    #[tokio::test]
    async fn test_deadline_bounds() {
        let miner = MinerId::parse("f01000").unwrap();
        let adapter = MemoryAdapter::new(miner.clone(), 100);
        assert!(adapter.deadline_sectors(&miner, 48).await.is_err());
        assert!(adapter.deadline_sectors(&miner, 47).await.unwrap().all_sectors.is_empty());
    }
}
