//! Lotus JSON-RPC state adapter
//!
//! Speaks JSON-RPC 2.0 to a Lotus-style full node (`Filecoin.*` methods)
//! and maps wire shapes onto the engine's snapshot types. Bitfields arrive
//! as alternating absent/present run lengths and are expanded here; big
//! integers arrive as decimal strings.

use async_trait::async_trait;
use num_bigint::BigInt;
use num_traits::Zero;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use sectorfee_core::amount::TokenAmount;
use sectorfee_core::epoch::{ChainEpoch, WPOST_PERIOD_DEADLINES};
use sectorfee_core::error::{EconError, Result};
use sectorfee_core::smoothing::FilterEstimate;
use sectorfee_core::types::{
    ChainHead, MinerId, MinerInfo, SectorRecord, VestingEntry, VestingSchedule,
};

use crate::{DeadlineSectors, NetworkEstimates, StateAdapter};

/// Reward actor address (holds the smoothed reward estimate)
const REWARD_ACTOR: &str = "f02";

/// Storage power actor address (holds the smoothed QA-power estimate)
const POWER_ACTOR: &str = "f04";

/// Quality multipliers, in tenths (base 10)
const QUALITY_BASE_MULTIPLIER: i64 = 10;
const DEAL_WEIGHT_MULTIPLIER: i64 = 10;
const VERIFIED_DEAL_WEIGHT_MULTIPLIER: i64 = 100;

/// JSON-RPC client for a Lotus-style full node
#[derive(Clone, Debug)]
pub struct LotusAdapter {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl LotusAdapter {
    pub fn new(endpoint: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EconError::Upstream(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };
        tracing::trace!(method, "rpc call");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EconError::Upstream(format!("{method}: {e}")))?;
        if !response.status().is_success() {
            return Err(EconError::Upstream(format!(
                "{method}: http status {}",
                response.status()
            )));
        }
        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| EconError::Upstream(format!("{method}: decoding response: {e}")))?;
        if let Some(err) = body.error {
            return Err(EconError::Upstream(format!(
                "{method}: rpc error {}: {}",
                err.code, err.message
            )));
        }
        body.result
            .ok_or_else(|| EconError::MissingState(format!("{method}: empty result")))
    }

    async fn tipset_at(&self, epoch: ChainEpoch) -> Result<Value> {
        let ts: WireTipSet = self
            .call("Filecoin.ChainGetTipSetByHeight", json!([epoch, null]))
            .await?;
        Ok(json!(ts.cids))
    }

    async fn actor_state(&self, actor: &str, tipset: Value) -> Result<Value> {
        let read: WireReadState = self
            .call("Filecoin.StateReadState", json!([actor, tipset]))
            .await?;
        Ok(read.state)
    }
}

// === wire shapes ===

#[derive(Deserialize)]
struct WireTipSet {
    #[serde(rename = "Cids")]
    cids: Vec<Value>,
    #[serde(rename = "Height")]
    height: ChainEpoch,
    #[serde(rename = "Blocks")]
    blocks: Vec<WireBlockHeader>,
}

#[derive(Deserialize)]
struct WireBlockHeader {
    #[serde(rename = "Timestamp")]
    timestamp: u64,
}

#[derive(Deserialize)]
struct WireMinerInfo {
    #[serde(rename = "SectorSize")]
    sector_size: u64,
}

#[derive(Deserialize)]
struct WireProvingDeadline {
    #[serde(rename = "PeriodStart")]
    period_start: ChainEpoch,
}

#[derive(Deserialize)]
struct WirePartition {
    #[serde(rename = "AllSectors")]
    all_sectors: Vec<u64>,
    #[serde(rename = "LiveSectors")]
    live_sectors: Vec<u64>,
}

#[derive(Deserialize)]
struct WireSector {
    #[serde(rename = "SectorNumber")]
    sector_number: u64,
    #[serde(rename = "Activation")]
    activation: ChainEpoch,
    #[serde(rename = "Expiration")]
    expiration: ChainEpoch,
    #[serde(rename = "PowerBaseEpoch", default)]
    power_base_epoch: Option<ChainEpoch>,
    #[serde(rename = "DealWeight")]
    deal_weight: String,
    #[serde(rename = "VerifiedDealWeight")]
    verified_deal_weight: String,
    #[serde(rename = "InitialPledge")]
    initial_pledge: TokenAmount,
    #[serde(rename = "ExpectedDayReward")]
    expected_day_reward: TokenAmount,
    #[serde(rename = "ReplacedDayReward", default)]
    replaced_day_reward: Option<TokenAmount>,
    #[serde(rename = "ExpectedStoragePledge")]
    expected_storage_pledge: TokenAmount,
    #[serde(rename = "DailyFee", default)]
    daily_fee: Option<TokenAmount>,
}

#[derive(Deserialize)]
struct WireDeadline {
    #[serde(rename = "DailyFee", default)]
    daily_fee: Option<TokenAmount>,
}

#[derive(Deserialize)]
struct WireReadState {
    #[serde(rename = "State")]
    state: Value,
}

#[derive(Deserialize)]
struct WireFilterEstimate {
    #[serde(rename = "PositionEstimate")]
    position: String,
    #[serde(rename = "VelocityEstimate")]
    velocity: String,
}

#[derive(Deserialize)]
struct WireCirculatingSupply {
    #[serde(rename = "FilCirculating")]
    fil_circulating: TokenAmount,
}

fn parse_bigint(s: &str, what: &'static str) -> Result<BigInt> {
    s.parse::<BigInt>()
        .map_err(|e| EconError::Upstream(format!("parsing {what} {s:?}: {e}")))
}

fn parse_estimate(value: Value, what: &'static str) -> Result<FilterEstimate> {
    let wire: WireFilterEstimate = serde_json::from_value(value)
        .map_err(|e| EconError::Upstream(format!("decoding {what}: {e}")))?;
    Ok(FilterEstimate {
        position: parse_bigint(&wire.position, what)?,
        velocity: parse_bigint(&wire.velocity, what)?,
    })
}

/// Expands a bitfield encoded as alternating absent/present run lengths
/// (starting with an absent run) into explicit sector numbers.
fn expand_runs(runs: &[u64]) -> Vec<u64> {
    let mut sectors = Vec::new();
    let mut present = false;
    let mut cursor = 0u64;
    for &run in runs {
        if present {
            sectors.extend(cursor..cursor + run);
        }
        cursor += run;
        present = !present;
    }
    sectors
}

/// Quality-adjusted power of one sector from its deal weights.
///
/// Space-time shares of deal and verified-deal data weigh 1x and 10x the
/// base quality; the result is in bytes.
fn qa_power(
    sector_size: u64,
    duration: ChainEpoch,
    deal_weight: &BigInt,
    verified_weight: &BigInt,
) -> BigInt {
    let size = BigInt::from(sector_size);
    if duration <= 0 {
        return size;
    }
    let space_time = &size * BigInt::from(duration);
    let base = (&space_time - deal_weight - verified_weight) * QUALITY_BASE_MULTIPLIER;
    let weighted = base
        + deal_weight * DEAL_WEIGHT_MULTIPLIER
        + verified_weight * VERIFIED_DEAL_WEIGHT_MULTIPLIER;
    if weighted.is_zero() || space_time.is_zero() {
        return size;
    }
    // qap = size * quality, quality = weighted / (space_time * base_multiplier)
    &size * weighted / (space_time * QUALITY_BASE_MULTIPLIER)
}

#[async_trait]
impl StateAdapter for LotusAdapter {
    async fn chain_head(&self) -> Result<ChainHead> {
        let ts: WireTipSet = self.call("Filecoin.ChainHead", json!([])).await?;
        let timestamp = ts
            .blocks
            .first()
            .map(|b| b.timestamp)
            .ok_or_else(|| EconError::MissingState("chain head has no blocks".to_string()))?;
        Ok(ChainHead {
            epoch: ts.height,
            timestamp,
        })
    }

    async fn miner_info(&self, miner: &MinerId) -> Result<MinerInfo> {
        let info: WireMinerInfo = self
            .call("Filecoin.StateMinerInfo", json!([miner.as_str(), null]))
            .await?;
        let deadline: WireProvingDeadline = self
            .call(
                "Filecoin.StateMinerProvingDeadline",
                json!([miner.as_str(), null]),
            )
            .await?;
        Ok(MinerInfo {
            sector_size: info.sector_size,
            period_start: deadline.period_start,
        })
    }

    async fn deadline_sectors(
        &self,
        miner: &MinerId,
        deadline_idx: u64,
    ) -> Result<DeadlineSectors> {
        if deadline_idx >= WPOST_PERIOD_DEADLINES {
            return Err(EconError::DeadlineOutOfRange(deadline_idx));
        }
        let partitions: Vec<WirePartition> = self
            .call(
                "Filecoin.StateMinerPartitions",
                json!([miner.as_str(), deadline_idx, null]),
            )
            .await?;
        let mut out = DeadlineSectors::default();
        for part in partitions {
            out.all_sectors.extend(expand_runs(&part.all_sectors));
            out.live_sectors.extend(expand_runs(&part.live_sectors));
        }
        Ok(out)
    }

    async fn miner_sectors(&self, miner: &MinerId, all: bool) -> Result<Vec<SectorRecord>> {
        let method = if all {
            "Filecoin.StateMinerSectors"
        } else {
            "Filecoin.StateMinerActiveSectors"
        };
        let params = if all {
            json!([miner.as_str(), null, null])
        } else {
            json!([miner.as_str(), null])
        };
        let info: WireMinerInfo = self
            .call("Filecoin.StateMinerInfo", json!([miner.as_str(), null]))
            .await?;
        let wire: Vec<WireSector> = self.call(method, params).await?;

        wire.into_iter()
            .map(|s| {
                let deal_weight = parse_bigint(&s.deal_weight, "deal weight")?;
                let verified_weight =
                    parse_bigint(&s.verified_deal_weight, "verified deal weight")?;
                let power_base_epoch = s.power_base_epoch.unwrap_or(s.activation);
                let qa = qa_power(
                    info.sector_size,
                    s.expiration - s.activation,
                    &deal_weight,
                    &verified_weight,
                );
                Ok(SectorRecord {
                    sector_number: s.sector_number,
                    activation_epoch: s.activation,
                    expiration_epoch: s.expiration,
                    power_base_epoch,
                    expected_day_reward: s.expected_day_reward,
                    replaced_day_reward: s.replaced_day_reward.unwrap_or_else(TokenAmount::zero),
                    initial_pledge: s.initial_pledge,
                    expected_storage_pledge: s.expected_storage_pledge,
                    daily_fee: s.daily_fee.unwrap_or_else(TokenAmount::zero),
                    qa_power: qa,
                    // joined from deadline_sectors by the caller
                    deadline_index: 0,
                })
            })
            .collect()
    }

    async fn network_estimates(&self) -> Result<NetworkEstimates> {
        let reward_state = self.actor_state(REWARD_ACTOR, Value::Null).await?;
        let power_state = self.actor_state(POWER_ACTOR, Value::Null).await?;

        let reward_smoothed = reward_state
            .get("ThisEpochRewardSmoothed")
            .cloned()
            .ok_or_else(|| EconError::MissingState("reward actor smoothed estimate".into()))?;
        let power_smoothed = power_state
            .get("ThisEpochQAPowerSmoothed")
            .cloned()
            .ok_or_else(|| EconError::MissingState("power actor smoothed estimate".into()))?;

        Ok(NetworkEstimates {
            reward: parse_estimate(reward_smoothed, "reward estimate")?,
            qa_power: parse_estimate(power_smoothed, "power estimate")?,
        })
    }

    async fn circulating_supply(&self) -> Result<TokenAmount> {
        let supply: WireCirculatingSupply = self
            .call("Filecoin.StateVMCirculatingSupplyInternal", json!([null]))
            .await?;
        Ok(supply.fil_circulating)
    }

    async fn deadline_fees(&self, miner: &MinerId) -> Result<Vec<TokenAmount>> {
        let deadlines: Vec<WireDeadline> = self
            .call("Filecoin.StateMinerDeadlines", json!([miner.as_str(), null]))
            .await?;
        Ok(deadlines
            .into_iter()
            .map(|d| d.daily_fee.unwrap_or_else(TokenAmount::zero))
            .collect())
    }

    async fn vesting_schedule(
        &self,
        miner: &MinerId,
        at_epoch: ChainEpoch,
    ) -> Result<VestingSchedule> {
        let tipset = self.tipset_at(at_epoch).await?;
        let state = self.actor_state(miner.as_str(), tipset).await?;

        // expanded vesting funds: [{"Epoch": n, "Amount": "..."}]
        let funds = state
            .pointer("/VestingFunds/Funds")
            .or_else(|| state.pointer("/VestingFunds"))
            .cloned()
            .ok_or_else(|| {
                EconError::MissingState(format!("vesting funds for {miner} not in state response"))
            })?;

        #[derive(Deserialize)]
        struct WireVestingFund {
            #[serde(rename = "Epoch")]
            epoch: ChainEpoch,
            #[serde(rename = "Amount")]
            amount: TokenAmount,
        }

        let wire: Vec<WireVestingFund> = serde_json::from_value(funds)
            .map_err(|e| EconError::Upstream(format!("decoding vesting funds: {e}")))?;
        Ok(VestingSchedule::new(
            wire.into_iter()
                .map(|f| VestingEntry {
                    epoch: f.epoch,
                    amount: f.amount,
                })
                .collect(),
        ))
    }
}
