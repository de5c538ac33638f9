//! Exact token amounts
//!
//! A `TokenAmount` is an arbitrarily large integer count of base units
//! (10^18 base units per whole token). Amounts never pass through floating
//! point; the only lossy step is the final decimal rendering, which
//! truncates toward zero at a fixed digit count.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EconError, Result};

/// Base units per whole token (10^18)
pub const TOKEN_PRECISION: u64 = 1_000_000_000_000_000_000;

/// Returns 10^18 as a `BigInt`
pub fn token_precision() -> BigInt {
    BigInt::from(TOKEN_PRECISION)
}

/// An exact token amount in base units
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenAmount(BigInt);

impl TokenAmount {
    /// Zero base units
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    /// From raw base units
    pub fn from_atto(atto: impl Into<BigInt>) -> Self {
        Self(atto.into())
    }

    /// From whole tokens (scaled by 10^18)
    pub fn from_whole(whole: impl Into<BigInt>) -> Self {
        Self(whole.into() * token_precision())
    }

    /// Raw base units
    pub fn atto(&self) -> &BigInt {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Negative amounts clamp to zero; signed intermediates never escape a formula
    pub fn clamp_non_negative(self) -> Self {
        if self.0.is_negative() {
            Self::zero()
        } else {
            self
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Truncating division by an integer divisor
    pub fn div_floor(&self, divisor: i64) -> Result<Self> {
        if divisor == 0 {
            return Err(EconError::DivisionByZero("token amount division"));
        }
        Ok(Self(&self.0 / BigInt::from(divisor)))
    }

    /// Exact rational view of this amount in base units
    pub fn to_rational(&self) -> BigRational {
        BigRational::from_integer(self.0.clone())
    }

    /// Truncate a base-unit rational back to whole base units
    pub fn from_rational(rat: &BigRational) -> Self {
        Self(rat.to_integer())
    }

    /// Whole-token decimal string with `digits` fractional digits, truncated
    pub fn format_units(&self, digits: u32) -> String {
        format_scaled(&self.0, &token_precision(), digits)
            .expect("precision denominator is nonzero")
    }
}

impl Add for TokenAmount {
    type Output = TokenAmount;
    fn add(self, rhs: TokenAmount) -> TokenAmount {
        TokenAmount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a TokenAmount> for TokenAmount {
    type Output = TokenAmount;
    fn add(self, rhs: &'a TokenAmount) -> TokenAmount {
        TokenAmount(self.0 + &rhs.0)
    }
}

impl AddAssign<&TokenAmount> for TokenAmount {
    fn add_assign(&mut self, rhs: &TokenAmount) {
        self.0 += &rhs.0;
    }
}

impl Sub for TokenAmount {
    type Output = TokenAmount;
    fn sub(self, rhs: TokenAmount) -> TokenAmount {
        TokenAmount(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a TokenAmount> for TokenAmount {
    type Output = TokenAmount;
    fn sub(self, rhs: &'a TokenAmount) -> TokenAmount {
        TokenAmount(self.0 - &rhs.0)
    }
}

impl SubAssign<&TokenAmount> for TokenAmount {
    fn sub_assign(&mut self, rhs: &TokenAmount) {
        self.0 -= &rhs.0;
    }
}

impl Mul<i64> for &TokenAmount {
    type Output = TokenAmount;
    fn mul(self, rhs: i64) -> TokenAmount {
        TokenAmount(&self.0 * BigInt::from(rhs))
    }
}

impl Mul<&BigInt> for &TokenAmount {
    type Output = TokenAmount;
    fn mul(self, rhs: &BigInt) -> TokenAmount {
        TokenAmount(&self.0 * rhs)
    }
}

impl Sum for TokenAmount {
    fn sum<I: Iterator<Item = TokenAmount>>(iter: I) -> TokenAmount {
        iter.fold(TokenAmount::zero(), |acc, x| acc + x)
    }
}

impl fmt::Display for TokenAmount {
    /// Displays raw base units, matching the chain's canonical string form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let atto = s
            .parse::<BigInt>()
            .map_err(|e| serde::de::Error::custom(format!("bad token amount {s:?}: {e}")))?;
        Ok(TokenAmount(atto))
    }
}

/// Renders `numer / denom` as a decimal string with exactly `digits`
/// fractional digits.
///
/// The conversion truncates toward zero rather than rounding, so the output
/// is deterministic and two amounts that differ below the digit cutoff render
/// identically. Fails on a zero denominator.
pub fn format_scaled(numer: &BigInt, denom: &BigInt, digits: u32) -> Result<String> {
    if denom.is_zero() {
        return Err(EconError::DivisionByZero("decimal rendering"));
    }
    let negative = numer.is_negative() != denom.is_negative();
    let numer = numer.abs();
    let denom = denom.abs();

    let whole = &numer / &denom;
    let rem = &numer - &whole * &denom;
    let scale = BigInt::from(10u32).pow(digits);
    let frac = rem * &scale / &denom;

    let mut frac_str = frac.to_str_radix(10);
    while (frac_str.len() as u32) < digits {
        frac_str.insert(0, '0');
    }

    let sign = if negative && (!whole.is_zero() || frac_str.bytes().any(|b| b != b'0')) {
        "-"
    } else {
        ""
    };
    if digits == 0 {
        Ok(format!("{sign}{whole}"))
    } else {
        Ok(format!("{sign}{whole}.{frac_str}"))
    }
}

/// Renders a base-unit rational as whole tokens with `digits` fractional digits
pub fn format_atto_rational(rat: &BigRational, digits: u32) -> Result<String> {
    format_scaled(rat.numer(), &(rat.denom() * token_precision()), digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_whole_scaling() {
        let one = TokenAmount::from_whole(1);
        assert_eq!(one.atto(), &BigInt::from(TOKEN_PRECISION));
        assert_eq!(one.format_units(10), "1.0000000000");
    }

    #[test]
    fn test_format_truncates_toward_zero() {
        // 1.999999999999 rendered at 10 digits keeps 1.9999999999
        let amt = TokenAmount::from_atto(1_999_999_999_999_000_000i64);
        assert_eq!(amt.format_units(10), "1.9999999999");

        let neg = TokenAmount::from_atto(-1_999_999_999_999_000_000i64);
        assert_eq!(neg.format_units(10), "-1.9999999999");
    }

    #[test]
    fn test_format_pads_fraction() {
        let amt = TokenAmount::from_atto(1_000_000_000i64); // 1e9 atto = 1e-9 FIL
        assert_eq!(amt.format_units(10), "0.0000000010");
    }

    #[test]
    fn test_format_scaled_zero_denominator() {
        let err = format_scaled(&BigInt::from(1), &BigInt::zero(), 2).unwrap_err();
        assert!(matches!(err, EconError::DivisionByZero(_)));
    }

    #[test]
    fn test_negative_zero_has_no_sign() {
        // -1 atto truncated to 10 digits is exactly zero, no minus sign
        let amt = TokenAmount::from_atto(-1i64);
        assert_eq!(amt.format_units(10), "0.0000000000");
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(
            TokenAmount::from_atto(-5i64).clamp_non_negative(),
            TokenAmount::zero()
        );
        let positive = TokenAmount::from_atto(5i64);
        assert_eq!(positive.clone().clamp_non_negative(), positive);
    }

    #[test]
    fn test_div_floor_guards_zero() {
        let amt = TokenAmount::from_whole(10);
        assert!(amt.div_floor(0).is_err());
        assert_eq!(amt.div_floor(3).unwrap().atto(), &BigInt::from(3_333_333_333_333_333_333i64));
    }

    #[test]
    fn test_serde_round_trip_as_string() {
        let amt = TokenAmount::from_whole(42);
        let json = serde_json::to_string(&amt).unwrap();
        assert_eq!(json, "\"42000000000000000000\"");
        let back: TokenAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amt);
    }

    #[test]
    fn test_sum_matches_fold() {
        let parts = vec![
            TokenAmount::from_whole(1),
            TokenAmount::from_whole(2),
            TokenAmount::from_whole(3),
        ];
        let total: TokenAmount = parts.into_iter().sum();
        assert_eq!(total, TokenAmount::from_whole(6));
    }
}
