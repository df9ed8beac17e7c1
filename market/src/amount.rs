//! Non-negative fixed-point value with 18 fractional digits.
//!
//! Prices, quantities and cash balances all use [`Amount`]. The value is a
//! scaled integer (`rust_decimal`), never a float; operations truncate toward
//! zero at 18 digits unless they say otherwise, and overflow is reported
//! instead of wrapped.
//! Conversion to a human-readable string only happens at the presentation
//! boundary through [`Amount::to_display_string`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::AmountError;

/// Number of fractional decimal digits carried by every [`Amount`].
pub const SCALE: u32 = 18;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);
    pub const MAX: Amount = Amount(Decimal::MAX);

    /// Strict constructor: rejects negative values and more than 18 fractional digits.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value.to_string()));
        }
        if value.scale() > SCALE {
            return Err(AmountError::TooPrecise(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Builds an amount from an integer carrying 18 implied decimals
    /// (the representation price oracles publish on-chain).
    pub fn from_raw(raw: u128) -> Result<Self, AmountError> {
        let raw = i128::try_from(raw).map_err(|_| AmountError::Overflow)?;
        Decimal::try_from_i128_with_scale(raw, SCALE)
            .map(Self)
            .map_err(|_| AmountError::Overflow)
    }

    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// Inverse of [`Amount::from_raw`].
    pub fn to_raw(&self) -> Result<u128, AmountError> {
        let mantissa = u128::try_from(self.0.mantissa()).map_err(|_| AmountError::Overflow)?;
        let factor = 10u128.pow(SCALE - self.0.scale());
        mantissa.checked_mul(factor).ok_or(AmountError::Overflow)
    }

    /// Truncates to 18 digits and clamps negatives to zero.
    pub(crate) fn clamped(value: Decimal) -> Self {
        if value <= Decimal::ZERO {
            return Self::ZERO;
        }
        Self(value.round_dp_with_strategy(SCALE, RoundingStrategy::ToZero))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Self::clamped)
    }

    /// `None` when the result would be negative or overflow.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        if rhs.0 > self.0 {
            return None;
        }
        self.0.checked_sub(rhs.0).map(Self::clamped)
    }

    pub fn checked_mul(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_mul(rhs.0).map(Self::clamped)
    }

    /// Like [`Amount::checked_mul`] but rounds the 19th digit onward up.
    pub fn checked_mul_ceil(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_mul(rhs.0).map(|product| {
            Self::clamped(product.round_dp_with_strategy(SCALE, RoundingStrategy::AwayFromZero))
        })
    }

    /// Divides by a sample count; `None` for a zero count.
    pub fn checked_div_count(self, count: usize) -> Option<Amount> {
        if count == 0 {
            return None;
        }
        self.0.checked_div(Decimal::from(count)).map(Self::clamped)
    }

    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Self::clamped(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_mul(self, rhs: Amount) -> Amount {
        Self::clamped(self.0.saturating_mul(rhs.0))
    }

    /// Square root rounded to the nearest 18th digit.
    pub fn sqrt(self) -> Option<Amount> {
        self.0.sqrt().map(|root| Self::clamped(root.round_dp(SCALE)))
    }

    /// Presentation formatting: no fraction digits above 1000, two above 1,
    /// four otherwise; thousands are comma-grouped.
    pub fn to_display_string(&self) -> String {
        let dp = if self.0 > Decimal::ONE_THOUSAND {
            0
        } else if self.0 > Decimal::ONE {
            2
        } else {
            4
        };
        let rounded = self
            .0
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        group_thousands(&rounded.to_string())
    }
}

fn group_thousands(text: &str) -> String {
    let (int_part, frac) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text, None),
    };

    let mut out = String::with_capacity(text.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(f) = frac {
        out.push('.');
        out.push_str(f);
    }
    out
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.normalize(), f)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str_exact(trimmed).map_err(|e| AmountError::Parse {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_decimal(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn raw_oracle_values_map_to_units() {
        let price = Amount::from_raw(67_000_500_000_000_000_000_000).unwrap();
        assert_eq!(price, amt("67000.5"));
        assert_eq!(price.to_raw().unwrap(), 67_000_500_000_000_000_000_000);
    }

    #[test]
    fn raw_value_beyond_mantissa_is_overflow() {
        assert_eq!(Amount::from_raw(u128::MAX), Err(AmountError::Overflow));
    }

    #[test]
    fn parsing_rejects_negative_and_overprecise_input() {
        assert!(matches!("-1".parse::<Amount>(), Err(AmountError::Negative(_))));
        assert!(matches!(
            "0.0000000000000000001".parse::<Amount>(),
            Err(AmountError::TooPrecise(_))
        ));
        assert!(matches!("abc".parse::<Amount>(), Err(AmountError::Parse { .. })));
    }

    #[test]
    fn multiplication_is_exact_for_trade_sizes() {
        let cost = amt("0.1").checked_mul(amt("20000")).unwrap();
        assert_eq!(cost, Amount::from_units(2000));
    }

    #[test]
    fn multiplication_truncates_to_eighteen_digits() {
        let tiny = amt("0.000000001").checked_mul(amt("0.000000001")).unwrap();
        assert_eq!(tiny, amt("0.000000000000000001"));

        let below = amt("0.000000001").checked_mul(amt("0.0000000001")).unwrap();
        assert!(below.is_zero());
    }

    #[test]
    fn ceil_multiplication_rounds_dust_up() {
        let dust = amt("0.000000000000000001");
        assert!(dust.checked_mul(amt("0.9")).unwrap().is_zero());
        assert_eq!(dust.checked_mul_ceil(amt("0.9")).unwrap(), dust);

        let exact = amt("0.1").checked_mul_ceil(amt("20000")).unwrap();
        assert_eq!(exact, Amount::from_units(2000));
    }

    #[test]
    fn subtraction_never_goes_negative() {
        assert_eq!(amt("5").checked_sub(amt("7")), None);
        assert_eq!(amt("7").checked_sub(amt("5")), Some(amt("2")));
    }

    #[test]
    fn mul_overflow_is_reported() {
        assert_eq!(Amount::MAX.checked_mul(amt("2")), None);
        assert_eq!(Amount::MAX.saturating_mul(amt("2")), Amount::MAX);
    }

    #[test]
    fn division_by_count() {
        assert_eq!(amt("60").checked_div_count(3), Some(amt("20")));
        assert_eq!(amt("60").checked_div_count(0), None);
    }

    #[test]
    fn display_tiers_follow_magnitude() {
        assert_eq!(amt("67000.5").to_display_string(), "67,001");
        assert_eq!(amt("3512.449").to_display_string(), "3,512");
        assert_eq!(amt("1.08345").to_display_string(), "1.08");
        assert_eq!(amt("0.123456").to_display_string(), "0.1235");
        assert_eq!(Amount::ZERO.to_display_string(), "0");
        assert_eq!(amt("1234567.8").to_display_string(), "1,234,568");
    }

    #[test]
    fn plain_display_drops_trailing_zeros() {
        assert_eq!(amt("8000.000").to_string(), "8000");
        assert_eq!(Amount::try_from(dec!(0.10)).unwrap().to_string(), "0.1");
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let json = serde_json::to_string(&amt("20000.25")).unwrap();
        assert_eq!(json, "\"20000.25\"");

        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amt("20000.25"));

        assert!(serde_json::from_str::<Amount>("\"-3\"").is_err());
    }
}
