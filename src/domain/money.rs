use crate::error::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest total the payment gateway will be asked to charge (one cent).
pub const MIN_CHARGE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Represents a chargeable monetary amount in the catalog currency.
///
/// Always rounded to two decimal places and never below [`MIN_CHARGE`], so a
/// value of this type can be handed to the payment gateway as-is.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ServiceError> {
        let rounded = value.round_dp(2);
        if rounded >= MIN_CHARGE {
            Ok(Self(rounded))
        } else {
            Err(ServiceError::ValidationError(
                "Amount must be at least 0.01".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// The amount expressed in minor units (cents).
    pub fn minor_units(&self) -> i64 {
        (self.0 * Decimal::ONE_HUNDRED)
            .trunc()
            .try_into()
            .unwrap_or(i64::MAX)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ServiceError;

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
        write!(f, "{:.2}", self.0)
    }
}
