//! Type-safe money representation using decimal arithmetic.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors from money arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Operands carry different currencies.
    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(CurrencyCode, CurrencyCode),
    /// The result does not fit in a `Decimal`.
    #[error("amount overflow")]
    Overflow,
}

/// An amount of money in a specific currency.
///
/// Amounts are stored in the currency's standard unit (rupiah, dollars), not
/// in minor units, matching the `NUMERIC(12, 2)` columns in Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Add two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` or `MoneyError::Overflow`.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency, other.currency));
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Multiply by a whole quantity (line totals).
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the product does not fit.
    pub fn checked_mul_quantity(self, quantity: i32) -> Result<Self, MoneyError> {
        self.amount
            .checked_mul(Decimal::from(quantity))
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Multiply by a rate (deposit percentages) and round to two places.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the product does not fit.
    pub fn checked_mul_rate(self, rate: Decimal) -> Result<Self, MoneyError> {
        self.amount
            .checked_mul(rate)
            .map(|amount| Self::new(amount.round_dp(2), self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Sum an iterator of amounts in `currency`.
    ///
    /// # Errors
    ///
    /// Returns the first arithmetic error encountered.
    pub fn sum<I>(currency: CurrencyCode, amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::zero(currency), Self::checked_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.currency {
            // Rupiah is shown without minor units
            CurrencyCode::IDR => write!(f, "Rp{}", self.amount.round_dp(0)),
            _ => write!(
                f,
                "{}{:.2}",
                self.currency.symbol(),
                self.amount.round_dp(2)
            ),
        }
    }
}

/// ISO 4217 currency codes the storefront sells in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    IDR,
    USD,
    SGD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::IDR => "Rp",
            Self::USD => "$",
            Self::SGD => "S$",
        }
    }

    /// Three-letter code as stored in the database.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::IDR => "IDR",
            Self::USD => "USD",
            Self::SGD => "SGD",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IDR" => Ok(Self::IDR),
            "USD" => Ok(Self::USD),
            "SGD" => Ok(Self::SGD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn idr(amount: i64) -> Money {
        Money::new(Decimal::from(amount), CurrencyCode::IDR)
    }

    #[test]
    fn test_sum_line_totals() {
        let line = idr(450_000).checked_mul_quantity(2).unwrap();
        let total = Money::sum(CurrencyCode::IDR, [line, idr(25_000)]).unwrap();
        assert_eq!(total, idr(925_000));
    }

    #[test]
    fn test_add_rejects_mixed_currency() {
        let usd = Money::new(Decimal::ONE, CurrencyCode::USD);
        assert_eq!(
            idr(1).checked_add(usd),
            Err(MoneyError::CurrencyMismatch(CurrencyCode::IDR, CurrencyCode::USD))
        );
    }

    #[test]
    fn test_mul_rate_rounds() {
        let deposit = Money::new(Decimal::new(1999, 2), CurrencyCode::USD)
            .checked_mul_rate(Decimal::new(5, 1))
            .unwrap();
        assert_eq!(deposit.amount, Decimal::new(1000, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(idr(450_000).to_string(), "Rp450000");
        assert_eq!(
            Money::new(Decimal::new(1999, 2), CurrencyCode::USD).to_string(),
            "$19.99"
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("idr".parse::<CurrencyCode>().unwrap(), CurrencyCode::IDR);
        assert!("EUR".parse::<CurrencyCode>().is_err());
    }
}
