use super::account::Email;
use super::catalog::ItemId;
use super::id::OrderId;
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Cart,
    Submitted,
    Paid,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Cart => f.write_str("cart"),
            OrderState::Submitted => f.write_str("submitted"),
            OrderState::Paid => f.write_str("paid"),
        }
    }
}

/// A customer order.
///
/// Serializes to the persisted record shape
/// `{id, email, order, state, timePaid?}`. The owning `email` is fixed at
/// creation; every state change goes through the methods below so only the
/// edges `cart -> submitted -> {paid | cart}` are reachable.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    email: Email,
    #[serde(rename = "order")]
    items: Vec<ItemId>,
    state: OrderState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_paid: Option<i64>,
}

impl Order {
    /// Creates a new order in the `cart` state.
    pub fn new(id: OrderId, email: Email, items: Vec<ItemId>) -> Result<Self, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::validation("Order must contain at least one item"));
        }
        Ok(Self {
            id,
            email,
            items,
            state: OrderState::Cart,
            time_paid: None,
        })
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn time_paid(&self) -> Option<i64> {
        self.time_paid
    }

    /// Replaces the item list and puts the order back in the cart.
    pub fn replace_items(&mut self, items: Vec<ItemId>) -> Result<(), ServiceError> {
        match self.state {
            OrderState::Submitted => Err(ServiceError::Conflict(
                "Order already processing".to_string(),
            )),
            OrderState::Paid => Err(ServiceError::Conflict("Order already paid".to_string())),
            OrderState::Cart if items.is_empty() => Err(ServiceError::validation(
                "Order must contain at least one item",
            )),
            OrderState::Cart => {
                self.items = items;
                self.state = OrderState::Cart;
                Ok(())
            }
        }
    }

    /// Marks the order as submitted for payment.
    pub fn submit(&mut self) -> Result<(), ServiceError> {
        if self.items.is_empty() {
            return Err(ServiceError::validation("The order is empty"));
        }
        match self.state {
            OrderState::Cart => {
                self.state = OrderState::Submitted;
                Ok(())
            }
            OrderState::Submitted => Err(ServiceError::Conflict(
                "This order is already being processed for payment".to_string(),
            )),
            OrderState::Paid => Err(ServiceError::Conflict("Order already paid".to_string())),
        }
    }

    /// Settles a submitted order as paid at `time` (epoch millis).
    pub fn mark_paid(&mut self, time: i64) -> Result<(), ServiceError> {
        self.expect_submitted()?;
        self.state = OrderState::Paid;
        self.time_paid = Some(time);
        Ok(())
    }

    /// Returns a submitted order to the customer's cart.
    pub fn return_to_cart(&mut self) -> Result<(), ServiceError> {
        self.expect_submitted()?;
        self.state = OrderState::Cart;
        Ok(())
    }

    fn expect_submitted(&self) -> Result<(), ServiceError> {
        if self.state == OrderState::Submitted {
            Ok(())
        } else {
            Err(ServiceError::Conflict(format!(
                "Order {} is {}, not submitted",
                self.id, self.state
            )))
        }
    }

    /// Parses and structurally validates a stored order record.
    ///
    /// Fails when any field is malformed or when the item list is empty.
    pub fn from_record(record: serde_json::Value) -> Result<Self, ServiceError> {
        let order: Order = serde_json::from_value(record)?;
        if order.items.is_empty() {
            return Err(ServiceError::validation("Order has no items"));
        }
        Ok(order)
    }

    /// Whether the settlement worker should attempt this order.
    pub fn awaits_settlement(&self) -> bool {
        self.state == OrderState::Submitted
    }
}
