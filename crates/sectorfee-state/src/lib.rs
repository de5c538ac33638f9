//! # sectorfee State
//!
//! The chain-state boundary: everything the aggregation engine needs from
//! the blockchain, expressed as one injected `StateAdapter` handle. No
//! ambient globals; every computation entry point receives its adapter
//! explicitly.
//!
//! Two implementations:
//! - [`LotusAdapter`] - JSON-RPC client against a Lotus-style full node
//! - [`MemoryAdapter`] - fixture-backed adapter for tests

pub mod memory;
pub mod rpc;

use async_trait::async_trait;

use sectorfee_core::amount::TokenAmount;
use sectorfee_core::epoch::ChainEpoch;
use sectorfee_core::error::Result;
use sectorfee_core::smoothing::FilterEstimate;
use sectorfee_core::types::{ChainHead, MinerId, MinerInfo, SectorRecord, VestingSchedule};

pub use memory::MemoryAdapter;
pub use rpc::LotusAdapter;

/// Sector membership of one deadline's partitions
#[derive(Clone, Debug, Default)]
pub struct DeadlineSectors {
    /// Every sector ever assigned to the deadline
    pub all_sectors: Vec<u64>,
    /// Sectors currently live (not terminated)
    pub live_sectors: Vec<u64>,
}

/// Smoothed network estimates at the query head
#[derive(Clone, Debug)]
pub struct NetworkEstimates {
    /// Smoothed per-epoch block reward
    pub reward: FilterEstimate,
    /// Smoothed network quality-adjusted power
    pub qa_power: FilterEstimate,
}

/// Read-only chain-state queries the engine depends on.
///
/// Calls are independent of one another and may be issued concurrently;
/// each returns a snapshot at the adapter's current head. Any failure
/// aborts the whole request - no partial results.
#[async_trait]
pub trait StateAdapter: Send + Sync {
    /// Current chain head
    async fn chain_head(&self) -> Result<ChainHead>;

    /// Static miner state (sector size, proving period start)
    async fn miner_info(&self, miner: &MinerId) -> Result<MinerInfo>;

    /// Partition membership for one of the 48 deadlines
    async fn deadline_sectors(&self, miner: &MinerId, deadline_idx: u64)
        -> Result<DeadlineSectors>;

    /// Sector records; `all` selects every sector ever recorded instead of
    /// only currently active ones. `deadline_index` on the returned records
    /// is not populated here - callers join it from `deadline_sectors`.
    async fn miner_sectors(&self, miner: &MinerId, all: bool) -> Result<Vec<SectorRecord>>;

    /// Smoothed reward and QA-power estimates
    async fn network_estimates(&self) -> Result<NetworkEstimates>;

    /// Network circulating supply
    async fn circulating_supply(&self) -> Result<TokenAmount>;

    /// Per-deadline daily fees, one entry per deadline
    async fn deadline_fees(&self, miner: &MinerId) -> Result<Vec<TokenAmount>>;

    /// Locked-funds vesting schedule as of `at_epoch`
    async fn vesting_schedule(&self, miner: &MinerId, at_epoch: ChainEpoch)
        -> Result<VestingSchedule>;
}
