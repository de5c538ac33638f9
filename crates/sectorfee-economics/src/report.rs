//! Report building
//!
//! Turns an aggregation into an ordered series plus a grand-total row,
//! rendered either as structured records for JSON consumers or as
//! comma-delimited text. Date keys are fixed-width ISO 8601, so the
//! lexicographic bucket order is chronological.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use sectorfee_core::amount::{format_scaled, TokenAmount};
use sectorfee_core::error::Result;
use sectorfee_core::types::{ChainHead, MinerId};

use crate::aggregate::Aggregator;
use crate::dailyfee::{DailyFeeQuote, SpFeeSummary, FEE_HORIZONS, REFERENCE_SIZES};
use crate::vesting::VestingStep;

/// Decimal digits for pledge/penalty/vested columns
pub const AMOUNT_RENDER_DIGITS: u32 = 10;

/// Decimal digits for the power column (TiB)
pub const POWER_RENDER_DIGITS: u32 = 6;

/// One per-date row of the penalty report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PenaltyRow {
    pub date: String,
    pub miner: String,
    pub sector_count: usize,
    pub power_tib: String,
    pub pledge: String,
    pub penalty: String,
}

/// Ordered penalty series plus grand totals
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PenaltyReport {
    pub rows: Vec<PenaltyRow>,
    /// Totals row; `date` and `miner` are empty
    pub totals: PenaltyRow,
}

impl PenaltyReport {
    /// Builds the report from an aggregation.
    ///
    /// Bucket power is derived from the miner's uniform sector size; the
    /// totals row is the elementwise sum over all buckets.
    pub fn build(agg: &Aggregator, miner: &MinerId, sector_size: u64) -> Result<Self> {
        let tib = BigInt::from(1u64 << 40);

        let mut rows = Vec::with_capacity(agg.len());
        for (date, bucket) in agg.iter() {
            let power_bytes = BigInt::from(sector_size) * BigInt::from(bucket.sector_count());
            rows.push(PenaltyRow {
                date: date.clone(),
                miner: miner.to_string(),
                sector_count: bucket.sector_count(),
                power_tib: format_scaled(&power_bytes, &tib, POWER_RENDER_DIGITS)?,
                pledge: bucket.pledge_sum().format_units(AMOUNT_RENDER_DIGITS),
                penalty: bucket.penalty_sum().format_units(AMOUNT_RENDER_DIGITS),
            });
        }

        let (count, pledge, penalty) = agg.totals();
        let total_power = BigInt::from(sector_size) * BigInt::from(count);
        let totals = PenaltyRow {
            date: String::new(),
            miner: String::new(),
            sector_count: count,
            power_tib: format_scaled(&total_power, &tib, POWER_RENDER_DIGITS)?,
            pledge: pledge.format_units(AMOUNT_RENDER_DIGITS),
            penalty: penalty.format_units(AMOUNT_RENDER_DIGITS),
        };

        Ok(Self { rows, totals })
    }

    /// CSV with a header, one row per bucket and a trailing totals row
    /// whose leading key fields are empty
    pub fn to_csv(&self) -> String {
        let mut out = String::from("date,miner,sector_count,power(TiB),pledge,penalty\n");
        for row in &self.rows {
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                row.date, row.miner, row.sector_count, row.power_tib, row.pledge, row.penalty
            ));
        }
        let t = &self.totals;
        out.push_str(&format!(
            ",,{},{},{},{}\n",
            t.sector_count, t.power_tib, t.pledge, t.penalty
        ));
        out
    }
}

/// One per-day row of the vested-funds report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VestingRow {
    pub date: String,
    pub miner: String,
    pub vested_funds: String,
}

/// Renders decumulation steps as report rows
pub fn vesting_rows(steps: &[VestingStep], miner: &MinerId) -> Vec<VestingRow> {
    steps
        .iter()
        .map(|step| VestingRow {
            date: step.date.clone(),
            miner: miner.to_string(),
            vested_funds: step.vested.format_units(AMOUNT_RENDER_DIGITS),
        })
        .collect()
}

/// CSV for the vested-funds series
pub fn vesting_csv(rows: &[VestingRow]) -> String {
    let mut out = String::from("Date,Miner,VestedFunds(FIL)\n");
    for row in rows {
        out.push_str(&format!("{},{},{}\n", row.date, row.miner, row.vested_funds));
    }
    out
}

/// Plain-text daily-fee table with chain context header lines
pub fn daily_fee_text(head: &ChainHead, circulating_supply: &TokenAmount, quote: &DailyFeeQuote) -> String {
    let mut out = String::new();
    out.push_str(&format!("Chain Height: {}\n", head.epoch));
    out.push_str(&format!("Chain Timestamp: {}\n", head.timestamp));
    out.push_str(&format!(
        "FilCirculating: {} FIL\n",
        circulating_supply.format_units(0)
    ));
    out.push_str(&format!(
        "{:<10} {:>20} {:>20} {:>20}\n",
        "Size(QAP)",
        "Daily Fee(FIL)",
        format!("{} Fee(FIL)", FEE_HORIZONS[0]),
        format!("{} Fee(FIL)", FEE_HORIZONS[1]),
    ));
    let fees = [&quote.qap_32g, &quote.qap_1t, &quote.qap_100t, &quote.qap_1024t];
    for (&(name, _), daily) in REFERENCE_SIZES.iter().zip(fees) {
        let row = FEE_HORIZONS
            .iter()
            .map(|&days| scale_decimal(daily, days))
            .collect::<Vec<_>>();
        out.push_str(&format!(
            "{:<10} {:>20} {:>20} {:>20}\n",
            name, daily, row[0], row[1]
        ));
    }
    out
}

/// Plain-text per-SP fee summary
pub fn sp_fee_text(head: &ChainHead, miner: &MinerId, summary: &SpFeeSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Chain Height: {}\n", head.epoch));
    out.push_str(&format!("Chain Timestamp: {}\n", head.timestamp));
    out.push_str(&format!("Miner: {}\n", miner));
    out.push_str(&format!("Sectors: {}\n", summary.sector_count));
    out.push_str(&format!("Daily Fee: {} FIL\n", summary.daily_fee));
    out.push_str(&format!("Total Fee: {} FIL\n", summary.total_fee));
    out.push_str("Ps: Daily Fee * days != Total Fee, because sector expirations differ\n");
    out
}

/// Multiplies a fixed-point decimal string by an integer day count.
///
/// Keeps the rendering exact without re-threading the rational through the
/// caller: digits are scaled as an integer and the point is re-inserted.
fn scale_decimal(decimal: &str, factor: i64) -> String {
    let (int_part, frac_part) = decimal.split_once('.').unwrap_or((decimal, ""));
    let digits: BigInt = format!("{int_part}{frac_part}")
        .parse()
        .expect("renderer emits valid decimals");
    let scaled = digits * BigInt::from(factor);
    let mut s = scaled.to_str_radix(10);
    if frac_part.is_empty() {
        return s;
    }
    while s.len() <= frac_part.len() {
        s.insert(0, '0');
    }
    s.insert(s.len() - frac_part.len(), '.');
    s
}
