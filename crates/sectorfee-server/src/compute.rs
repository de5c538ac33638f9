//! Request orchestration
//!
//! Fetches the per-request chain-state snapshot through the injected
//! adapter, runs the per-sector calculators (partitioned across blocking
//! workers for large sector sets) and merges the partial aggregations.
//! Any upstream failure aborts the whole request; no partial results leak.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use sectorfee_core::amount::TokenAmount;
use sectorfee_core::epoch::{ChainEpoch, DateMapper, EPOCHS_IN_DAY, WPOST_PERIOD_DEADLINES};
use sectorfee_core::error::{EconError, Result};
use sectorfee_core::types::{ChainHead, MinerId, SectorRecord};
use sectorfee_core::version::{ProtocolVersion, VersionSchedule};
use sectorfee_economics::aggregate::Aggregator;
use sectorfee_economics::dailyfee::{reference_fees, sp_fee_summary, DailyFeeQuote, SpFeeSummary};
use sectorfee_economics::faultfee::nominal_fault_fee;
use sectorfee_economics::penalty::termination_penalty;
use sectorfee_economics::report::{vesting_rows, PenaltyReport, VestingRow};
use sectorfee_economics::vesting::decumulate;
use sectorfee_state::{NetworkEstimates, StateAdapter};

/// Concurrent in-flight deadline fetches
const DEADLINE_FETCH_PARALLELISM: usize = 8;

/// Sector count above which per-sector work is partitioned across workers
const PARALLEL_THRESHOLD: usize = 4096;

/// Worker partitions for large sector sets
const WORKER_PARTITIONS: usize = 4;

/// Builds the per-date termination-penalty report for a miner.
///
/// `offset_days` shifts the evaluation epoch in either direction; `all`
/// includes terminated sectors rather than only active ones.
pub async fn penalty_report<A: StateAdapter + ?Sized>(
    adapter: &A,
    mapper: &DateMapper,
    versions: &VersionSchedule,
    miner: &MinerId,
    all: bool,
    offset_days: i64,
) -> Result<PenaltyReport> {
    let head = adapter.chain_head().await?;
    let info = adapter.miner_info(miner).await?;
    let (deadline_of, _live) = deadline_membership(adapter, miner).await?;
    let mut sectors = adapter.miner_sectors(miner, all).await?;
    let estimates = adapter.network_estimates().await?;

    for sector in &mut sectors {
        // sectors missing from every partition keep deadline zero
        if let Some(&dl) = deadline_of.get(&sector.sector_number) {
            sector.deadline_index = dl;
        }
    }

    let at_epoch = offset_days
        .checked_mul(EPOCHS_IN_DAY)
        .and_then(|shift| head.epoch.checked_add(shift))
        .ok_or(EconError::OffsetOutOfRange(offset_days))?;
    let version = versions.version_at(at_epoch);
    tracing::debug!(
        miner = %miner,
        sectors = sectors.len(),
        at_epoch,
        ?version,
        "computing penalty report"
    );

    let agg = aggregate_all(
        sectors,
        at_epoch,
        version,
        *mapper,
        info.period_start,
        estimates,
    )
    .await?;

    PenaltyReport::build(&agg, miner, info.sector_size)
}

/// Runs the per-sector calculators, partitioned when the set is large.
///
/// Partial aggregators are merged; bucket totals are independent of the
/// partitioning because aggregation is commutative.
async fn aggregate_all(
    sectors: Vec<SectorRecord>,
    at_epoch: ChainEpoch,
    version: ProtocolVersion,
    mapper: DateMapper,
    period_start: ChainEpoch,
    estimates: NetworkEstimates,
) -> Result<Aggregator> {
    if sectors.len() < PARALLEL_THRESHOLD {
        return aggregate_chunk(&sectors, at_epoch, version, &mapper, period_start, &estimates);
    }

    let estimates = Arc::new(estimates);
    let chunk_size = sectors.len().div_ceil(WORKER_PARTITIONS);
    let handles: Vec<_> = sectors
        .chunks(chunk_size)
        .map(|chunk| {
            let chunk = chunk.to_vec();
            let estimates = Arc::clone(&estimates);
            tokio::task::spawn_blocking(move || {
                aggregate_chunk(&chunk, at_epoch, version, &mapper, period_start, &estimates)
            })
        })
        .collect();

    let mut merged = Aggregator::new();
    for handle in handles {
        let partial = handle
            .await
            .map_err(|e| EconError::Internal(format!("penalty worker: {e}")))??;
        merged.merge(partial);
    }
    Ok(merged)
}

fn aggregate_chunk(
    sectors: &[SectorRecord],
    at_epoch: ChainEpoch,
    version: ProtocolVersion,
    mapper: &DateMapper,
    period_start: ChainEpoch,
    estimates: &NetworkEstimates,
) -> Result<Aggregator> {
    let rule = version.expiration_rule();
    let mut agg = Aggregator::new();
    for sector in sectors {
        let date = mapper.expiration_date(
            rule,
            sector.expiration_epoch,
            sector.deadline_index,
            period_start,
        )?;
        let penalty = termination_penalty(
            version,
            sector,
            at_epoch,
            &estimates.reward,
            &estimates.qa_power,
        )?;
        agg.record(
            date,
            sector.sector_number,
            sector.initial_pledge.clone(),
            penalty,
        );
    }
    Ok(agg)
}

/// Builds the vested-funds series. `offset_days` must be zero or negative.
pub async fn vested_report<A: StateAdapter + ?Sized>(
    adapter: &A,
    mapper: &DateMapper,
    miner: &MinerId,
    offset_days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<VestingRow>> {
    if offset_days > 0 {
        return Err(EconError::PositiveOffset(offset_days));
    }
    let start_epoch = mapper.epoch_at_midnight_offset(now, offset_days)?;
    let schedule = adapter.vesting_schedule(miner, start_epoch).await?;
    let steps = decumulate(&schedule, start_epoch, mapper)?;
    Ok(vesting_rows(&steps, miner))
}

/// Reference daily fees at the four nominal sizes
pub async fn daily_fee<A: StateAdapter + ?Sized>(
    adapter: &A,
) -> Result<(ChainHead, TokenAmount, DailyFeeQuote)> {
    let head = adapter.chain_head().await?;
    let supply = adapter.circulating_supply().await?;
    let quote = reference_fees(&supply)?;
    Ok((head, supply, quote))
}

/// Per-SP daily-fee total and naive lifetime projection
pub async fn sp_daily_fee<A: StateAdapter + ?Sized>(
    adapter: &A,
    miner: &MinerId,
) -> Result<(ChainHead, SpFeeSummary)> {
    let head = adapter.chain_head().await?;
    let fees = adapter.deadline_fees(miner).await?;
    let (_deadline_of, live) = deadline_membership(adapter, miner).await?;

    let sectors = adapter.miner_sectors(miner, true).await?;
    let live_sectors: Vec<SectorRecord> = sectors
        .into_iter()
        .filter(|s| live.contains(&s.sector_number))
        .collect();

    let summary = sp_fee_summary(&fees, &live_sectors, head.epoch)?;
    Ok((head, summary))
}

/// Standalone fault fee for one nominal 32 GiB sector
pub async fn fault_fee<A: StateAdapter + ?Sized>(adapter: &A) -> Result<TokenAmount> {
    let estimates = adapter.network_estimates().await?;
    nominal_fault_fee(&estimates.reward, &estimates.qa_power)
}

/// Fetches all 48 deadlines with bounded concurrency and joins them into
/// a sector -> deadline map plus the live-sector set. Completion order is
/// irrelevant to the result.
async fn deadline_membership<A: StateAdapter + ?Sized>(
    adapter: &A,
    miner: &MinerId,
) -> Result<(HashMap<u64, u64>, HashSet<u64>)> {
    let mut fetches = stream::iter(
        (0..WPOST_PERIOD_DEADLINES).map(|idx| async move {
            adapter
                .deadline_sectors(miner, idx)
                .await
                .map(|sectors| (idx, sectors))
        }),
    )
    .buffer_unordered(DEADLINE_FETCH_PARALLELISM);

    let mut deadline_of = HashMap::new();
    let mut live = HashSet::new();
    while let Some(fetched) = fetches.next().await {
        let (idx, sectors) = fetched?;
        for sector in sectors.all_sectors {
            deadline_of.insert(sector, idx);
        }
        live.extend(sectors.live_sectors);
    }
    Ok((deadline_of, live))
}
