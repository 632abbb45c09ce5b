use crate::error::ReconError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive monetary amount carried by a payment.
///
/// Wraps `rust_decimal::Decimal` so payment amounts are exact and can never be
/// zero or negative once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ReconError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ReconError::validation("amount must be positive"))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ReconError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.00)),
            Err(ReconError::Validation(msg)) if msg == "amount must be positive"
        ));
        assert!(matches!(
            Amount::new(dec!(-5)),
            Err(ReconError::Validation(_))
        ));
    }

    #[test]
    fn test_amount_keeps_scale() {
        let amount = Amount::new(dec!(40.00)).unwrap();
        assert_eq!(amount.to_string(), "40.00");
    }

    #[test]
    fn test_amount_rejects_non_positive_json() {
        let parsed: Result<Amount, _> = serde_json::from_str("\"-1.00\"");
        assert!(parsed.is_err());
        let parsed: Amount = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(parsed.value(), dec!(12.50));
    }
}
