//! Protocol daily fees
//!
//! A flat linear function of network circulating supply and a nominal
//! quality-adjusted size; no per-account state involved:
//!
//! ```text
//! fee = 161817 / 10^30 * circulating_supply * qap_bytes
//! ```
//!
//! The per-SP summary additionally totals the real per-deadline fees and
//! projects a naive remaining-lifetime total (days-remaining times each
//! sector's daily fee) - an approximation, since sectors expire mid-day.

use num_bigint::BigInt;
use num_rational::BigRational;
use serde::{Deserialize, Serialize};

use sectorfee_core::amount::{format_atto_rational, TokenAmount};
use sectorfee_core::epoch::{ChainEpoch, EPOCHS_IN_DAY};
use sectorfee_core::error::{EconError, Result};
use sectorfee_core::types::SectorRecord;

/// Numerator of the supply/QAP fee multiplier
pub const FEE_MULTIPLIER_NUM: i64 = 161_817;

/// Denominator exponent of the multiplier: 10^30
pub const FEE_MULTIPLIER_DENOM_EXP: u32 = 30;

/// Decimal digits used when rendering fees
pub const FEE_RENDER_DIGITS: u32 = 12;

/// Reference QAP sizes quoted by the daily-fee report
pub const REFERENCE_SIZES: [(&str, u64); 4] = [
    ("32G", 32 << 30),
    ("1T", 1 << 40),
    ("100T", 100 << 40),
    ("1024T", 1024 << 40),
];

/// Fee horizons quoted alongside the daily rate, in days
pub const FEE_HORIZONS: [i64; 2] = [210, 540];

/// Exact daily fee in base units for `qap_bytes` of quality-adjusted power
pub fn daily_proof_fee(circulating_supply: &TokenAmount, qap_bytes: u64) -> Result<BigRational> {
    let denom = BigInt::from(10u32).pow(FEE_MULTIPLIER_DENOM_EXP);
    if circulating_supply.is_negative() {
        return Err(EconError::MissingState(
            "negative circulating supply".to_string(),
        ));
    }
    let numer =
        BigInt::from(FEE_MULTIPLIER_NUM) * circulating_supply.atto() * BigInt::from(qap_bytes);
    Ok(BigRational::new(numer, denom))
}

/// Daily fees at the four reference sizes, rendered in whole tokens
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyFeeQuote {
    pub qap_32g: String,
    pub qap_1t: String,
    pub qap_100t: String,
    pub qap_1024t: String,
}

/// Quotes the daily fee at every reference size
pub fn reference_fees(circulating_supply: &TokenAmount) -> Result<DailyFeeQuote> {
    let mut rendered = REFERENCE_SIZES
        .iter()
        .map(|&(_, size)| {
            let fee = daily_proof_fee(circulating_supply, size)?;
            format_atto_rational(&fee, FEE_RENDER_DIGITS)
        })
        .collect::<Result<Vec<_>>>()?;
    let qap_1024t = rendered.pop().expect("four reference sizes");
    let qap_100t = rendered.pop().expect("four reference sizes");
    let qap_1t = rendered.pop().expect("four reference sizes");
    let qap_32g = rendered.pop().expect("four reference sizes");
    Ok(DailyFeeQuote {
        qap_32g,
        qap_1t,
        qap_100t,
        qap_1024t,
    })
}

/// Per-SP daily fee totals and naive lifetime projection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpFeeSummary {
    /// Live sectors included in the projection
    pub sector_count: usize,
    /// Sum of the miner's per-deadline daily fees, whole tokens
    pub daily_fee: String,
    /// Naive days-remaining projection of total fees, whole tokens
    pub total_fee: String,
}

/// Totals per-deadline fees and projects each live sector's remaining fees.
///
/// The projection multiplies each sector's daily fee by its fractional
/// days-to-expiration at the current head; per-sector expiration times are
/// not day-aligned, so this is explicitly an approximation.
pub fn sp_fee_summary(
    deadline_fees: &[TokenAmount],
    live_sectors: &[SectorRecord],
    head_epoch: ChainEpoch,
) -> Result<SpFeeSummary> {
    let daily: TokenAmount = deadline_fees.iter().cloned().sum();

    let mut total = BigRational::from_integer(BigInt::from(0));
    for sector in live_sectors {
        if sector.daily_fee.is_zero() {
            continue;
        }
        let days = BigRational::new(
            BigInt::from(sector.expiration_epoch - head_epoch),
            BigInt::from(EPOCHS_IN_DAY),
        );
        total += days * sector.daily_fee.to_rational();
    }

    Ok(SpFeeSummary {
        sector_count: live_sectors.len(),
        daily_fee: format_atto_rational(&daily.to_rational(), FEE_RENDER_DIGITS)?,
        total_fee: format_atto_rational(&total, FEE_RENDER_DIGITS)?,
    })
}
