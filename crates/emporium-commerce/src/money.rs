//! Money in minor units.
//!
//! Amounts are integer cents; every arithmetic operation is checked and
//! returns `None` on overflow or currency mismatch instead of panicking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CommerceError;

/// Currencies the store can be configured to sell in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::JPY => "\u{00a5}",
        }
    }

    /// Digits after the decimal point in the major unit.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }
}

impl FromStr for Currency {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "JPY" => Ok(Currency::JPY),
            other => Err(CommerceError::validation(format!(
                "unsupported currency '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the smallest currency unit.
    pub amount_cents: i64,
    pub currency: Currency,
}

impl Money {
    pub const fn new(amount_cents: i64, currency: Currency) -> Self {
        Self {
            amount_cents,
            currency,
        }
    }

    pub const fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Parse a decimal string such as `"19.99"` without going through floats.
    ///
    /// ```
    /// use emporium_commerce::money::{Currency, Money};
    /// let price = Money::parse("19.9", Currency::USD).unwrap();
    /// assert_eq!(price.amount_cents, 1990);
    /// ```
    pub fn parse(input: &str, currency: Currency) -> Result<Money, CommerceError> {
        let invalid = || CommerceError::validation(format!("invalid amount '{}'", input));
        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        let places = currency.decimal_places() as usize;
        if whole.is_empty()
            || fraction.len() > places
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let scale = 10_i64.pow(places as u32);
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction: i64 = if fraction.is_empty() {
            0
        } else {
            format!("{:0<width$}", fraction, width = places)
                .parse()
                .map_err(|_| invalid())?
        };
        let cents = whole
            .checked_mul(scale)
            .and_then(|c| c.checked_add(fraction))
            .ok_or(CommerceError::Overflow)?;
        Ok(Money::new(if negative { -cents } else { cents }, currency))
    }

    pub fn is_zero(&self) -> bool {
        self.amount_cents == 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount_cents < 0
    }

    /// Add, failing on overflow or currency mismatch.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_cents
            .checked_add(other.amount_cents)
            .map(|cents| Money::new(cents, self.currency))
    }

    /// Subtract, failing on overflow or currency mismatch.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_cents
            .checked_sub(other.amount_cents)
            .map(|cents| Money::new(cents, self.currency))
    }

    /// Multiply by a quantity.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        self.amount_cents
            .checked_mul(factor)
            .map(|cents| Money::new(cents, self.currency))
    }

    /// `percent`% of this amount, rounded half away from zero to the nearest cent.
    pub fn percentage(&self, percent: f64) -> Option<Money> {
        let raw = (self.amount_cents as f64 * percent / 100.0).round();
        if !raw.is_finite() || raw > i64::MAX as f64 || raw < i64::MIN as f64 {
            return None;
        }
        Some(Money::new(raw as i64, self.currency))
    }

    /// Sum amounts; an empty iterator yields zero in `currency`.
    pub fn try_sum<'a>(
        iter: impl IntoIterator<Item = &'a Money>,
        currency: Currency,
    ) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.try_add(m))
    }

    /// This amount, or zero if it is negative.
    pub fn floor_zero(&self) -> Money {
        Money::new(self.amount_cents.max(0), self.currency)
    }

    /// Format for humans, e.g. `$49.99`.
    pub fn display(&self) -> String {
        let places = self.currency.decimal_places();
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.amount_cents.unsigned_abs();
        if places == 0 {
            return format!("{}{}{}", sign, self.currency.symbol(), abs);
        }
        let scale = 10_u64.pow(places);
        format!(
            "{}{}{}.{:0width$}",
            sign,
            self.currency.symbol(),
            abs / scale,
            abs % scale,
            width = places as usize
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("49.99", Currency::USD).unwrap(), usd(4999));
        assert_eq!(Money::parse("5", Currency::USD).unwrap(), usd(500));
        assert_eq!(Money::parse("0.5", Currency::USD).unwrap(), usd(50));
        assert_eq!(
            Money::parse("1200", Currency::JPY).unwrap(),
            Money::new(1200, Currency::JPY)
        );
        assert!(Money::parse("1.999", Currency::USD).is_err());
        assert!(Money::parse("1.5", Currency::JPY).is_err());
        assert!(Money::parse("abc", Currency::USD).is_err());
        assert!(Money::parse("", Currency::USD).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(usd(4999).display(), "$49.99");
        assert_eq!(usd(5).display(), "$0.05");
        assert_eq!(usd(-250).display(), "-$2.50");
        assert_eq!(Money::new(100, Currency::JPY).display(), "\u{00a5}100");
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(usd(1000).try_add(&usd(500)), Some(usd(1500)));
        assert_eq!(usd(1000).try_subtract(&usd(1500)), Some(usd(-500)));
        assert_eq!(usd(1000).try_multiply(3), Some(usd(3000)));
        assert_eq!(usd(i64::MAX).try_add(&usd(1)), None);
        assert_eq!(usd(i64::MAX).try_multiply(2), None);
    }

    #[test]
    fn test_currency_mismatch() {
        let eur = Money::new(100, Currency::EUR);
        assert_eq!(usd(100).try_add(&eur), None);
        assert_eq!(usd(100).try_subtract(&eur), None);
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        assert_eq!(usd(10000).percentage(10.0), Some(usd(1000)));
        // 12.5 cents
        assert_eq!(usd(125).percentage(10.0), Some(usd(13)));
        // 12.4 cents
        assert_eq!(usd(124).percentage(10.0), Some(usd(12)));
        assert_eq!(usd(-125).percentage(10.0), Some(usd(-13)));
    }

    #[test]
    fn test_sum() {
        let items = [usd(2000), usd(500)];
        assert_eq!(Money::try_sum(&items, Currency::USD), Some(usd(2500)));
        assert_eq!(Money::try_sum(std::iter::empty(), Currency::USD), Some(usd(0)));
    }

    #[test]
    fn test_floor_zero() {
        assert_eq!(usd(-10).floor_zero(), usd(0));
        assert_eq!(usd(10).floor_zero(), usd(10));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::EUR);
        assert!("XYZ".parse::<Currency>().is_err());
    }
}
