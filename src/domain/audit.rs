use super::order::Order;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tagged result of one settlement attempt.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    SuccessfulPayment,
    FailedPayment,
    NoValidUser,
    FreeOrder,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Outcome::SuccessfulPayment => "successful-payment",
            Outcome::FailedPayment => "failed-payment",
            Outcome::NoValidUser => "no-valid-user",
            Outcome::FreeOrder => "free-order",
        };
        f.write_str(tag)
    }
}

/// One line of a per-order audit log.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AuditEntry {
    /// Snapshot of the order as discovered by the settlement worker.
    pub order: Order,
    pub outcome: Outcome,
    /// Epoch millis.
    pub time: i64,
}

impl AuditEntry {
    pub fn new(order: Order, outcome: Outcome, time: i64) -> Self {
        Self {
            order,
            outcome,
            time,
        }
    }
}
