//! Offline stand-ins for the payment gateway and notifier, used when no
//! provider credentials are configured.

use crate::domain::account::Email;
use crate::domain::id::OrderId;
use crate::domain::money::Amount;
use crate::domain::ports::{Notifier, PaymentGateway};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;

/// Card tokens the sandbox gateway approves.
pub const TEST_CARDS: [&str; 2] = ["tok_visa", "tok_mastercard"];

/// Approves charges against the well-known test cards and declines the rest.
#[derive(Debug, Default, Clone)]
pub struct SandboxGateway;

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn charge(&self, instrument: &str, order_id: &OrderId, amount: Amount) -> Result<()> {
        if TEST_CARDS.contains(&instrument) {
            tracing::info!(order_id = %order_id, amount = %amount, "Sandbox charge approved");
            Ok(())
        } else {
            Err(ServiceError::GatewayError(format!(
                "Card {instrument:?} declined"
            )))
        }
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, address: &Email, display_name: &str, body: &str) -> Result<()> {
        tracing::info!(to = %address, name = display_name, body, "Notification (not delivered)");
        Ok(())
    }
}
