//! Monetary amounts using decimal arithmetic.
//!
//! The backend serializes amounts as JSON numbers or numeric strings
//! (`"1250.50"`), and occasionally as empty strings or `null`. [`Money`]
//! accepts all of these: anything that is not a finite number coerces to zero,
//! so a malformed amount can never surface as `NaN`.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// An amount in Algerian dinars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Zero dinars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from a whole number of centimes.
    #[must_use]
    pub fn from_centimes(centimes: i64) -> Self {
        Self(Decimal::new(centimes, 2))
    }

    /// Coerce a raw JSON value into an amount.
    ///
    /// Numbers are taken as-is, strings are trimmed and parsed. Empty strings,
    /// `null`, non-numeric text and non-finite floats all yield zero.
    #[must_use]
    pub fn coerce(value: &Value) -> Self {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self(Decimal::from(i))
                } else {
                    n.as_f64()
                        .and_then(|f| Decimal::try_from(f).ok())
                        .map_or(Self::ZERO, Self)
                }
            }
            Value::String(s) => Self::parse_lenient(s),
            _ => Self::ZERO,
        }
    }

    /// Parse text leniently; anything unparseable is zero.
    #[must_use]
    pub fn parse_lenient(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::ZERO;
        }
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map_or(Self::ZERO, Self)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The amount as a float, for charting.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().filter(|f| f.is_finite()).unwrap_or(0.0)
    }

    /// Round to two decimals, halves away from zero.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Display form used on screen: `1 234,56 DA`.
    #[must_use]
    pub fn format(&self) -> String {
        format_currency(*self)
    }

    /// Display form used in exported documents: `1234.56 DZD`.
    #[must_use]
    pub fn format_plain(&self) -> String {
        format!("{:.2} DZD", self.rounded().0)
    }
}

/// Format an amount with French digit grouping, two decimals and the `DA`
/// suffix.
///
/// ```
/// use officine_core::{Money, format_currency};
///
/// assert_eq!(format_currency(Money::from_centimes(123_456)), "1 234,56 DA");
/// assert_eq!(format_currency(Money::ZERO), "0,00 DA");
/// ```
#[must_use]
pub fn format_currency(amount: Money) -> String {
    let rounded = amount.rounded().0;
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let len = int_part.len();
    let mut grouped = String::with_capacity(len + len / 3 + 8);
    if negative {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    format!("{grouped},{frac_part} DA")
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }
}

// Arithmetic saturates at the decimal bounds.
impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// The backend expects plain JSON numbers on writes.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::coerce(&value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_numbers_and_strings() {
        assert_eq!(Money::coerce(&json!(100)), Money::from(100));
        assert_eq!(Money::coerce(&json!("1250.50")), Money::from_centimes(125_050));
        assert_eq!(Money::coerce(&json!(" 12.5 ")), Money::from_centimes(1250));
    }

    #[test]
    fn test_coerce_malformed_is_zero() {
        assert!(Money::coerce(&json!("")).is_zero());
        assert!(Money::coerce(&json!(null)).is_zero());
        assert!(Money::coerce(&json!("NaN")).is_zero());
        assert!(Money::coerce(&json!("abc")).is_zero());
        assert!(Money::coerce(&json!({"amount": 3})).is_zero());
    }

    #[test]
    fn test_from_centimes_negative() {
        assert_eq!(Money::from_centimes(-250).to_string(), "-2.50");
    }

    #[test]
    fn test_format_currency_grouping() {
        assert_eq!(format_currency(Money::from(1_234_567)), "1 234 567,00 DA");
        assert_eq!(format_currency(Money::from_centimes(99)), "0,99 DA");
        assert_eq!(format_currency(Money::from(123)), "123,00 DA");
        assert_eq!(format_currency(Money::from_centimes(-150_000)), "-1 500,00 DA");
    }

    #[test]
    fn test_format_currency_rounds_half_away() {
        let amount = Money::new(Decimal::from_str("2.345").unwrap());
        assert_eq!(format_currency(amount), "2,35 DA");
    }

    #[test]
    fn test_format_plain() {
        assert_eq!(Money::from_centimes(125_050).format_plain(), "1250.50 DZD");
    }

    #[test]
    fn test_sum_and_sub() {
        let total: Money = [Money::from(100), Money::from(50)].iter().sum();
        assert_eq!(total - Money::from(30), Money::from(120));
    }

    #[test]
    fn test_arithmetic_saturates_at_decimal_bounds() {
        let huge = Money::coerce(&json!("79228162514264337593543950335"));
        assert_eq!(huge.amount(), Decimal::MAX);

        let total: Money = [huge, huge].iter().sum();
        assert_eq!(total.amount(), Decimal::MAX);
        assert_eq!((-huge - huge).amount(), Decimal::MIN);

        let mut running = huge;
        running += Money::from(1);
        running -= -huge;
        assert_eq!(running.amount(), Decimal::MAX);
        assert!(total.to_f64().is_finite());
    }

    #[test]
    fn test_serde_accepts_string_and_writes_number() {
        let amount: Money = serde_json::from_str("\"42.10\"").unwrap();
        assert_eq!(serde_json::to_value(amount).unwrap(), json!(42.1));
    }
}
