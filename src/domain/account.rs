use super::id::OrderId;
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment instrument every new account is registered with.
pub const DEFAULT_CARD: &str = "tok_visa";

/// A validated, trimmed email address. Accounts are keyed by it and orders
/// carry it as their owning identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        let trimmed = value.trim();
        if is_valid_email(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ServiceError::ValidationError(format!(
                "Invalid email address: {trimmed:?}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && !local
            .chars()
            .any(|c| c.is_whitespace() || "<>()[]\\,;:@\"".contains(c));

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels
            .iter()
            .all(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        && labels
            .last()
            .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    local_ok && domain_ok
}

/// A customer account.
///
/// The `orders` list holds back-references to every order the account owns;
/// it is the only link from an account to its orders.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub street_address: String,
    /// Payment-instrument reference handed to the gateway.
    pub card: String,
    #[serde(default)]
    pub orders: Vec<OrderId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hashed_password: String,
    pub tos_agreement: bool,
}

impl Account {
    pub fn new(
        email: Email,
        first_name: String,
        last_name: String,
        street_address: String,
        hashed_password: String,
    ) -> Self {
        Self {
            email,
            first_name,
            last_name,
            street_address,
            card: DEFAULT_CARD.to_string(),
            orders: Vec::new(),
            hashed_password,
            tos_agreement: true,
        }
    }

    /// Name used when addressing the customer.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn owns(&self, order_id: &OrderId) -> bool {
        self.orders.contains(order_id)
    }

    pub fn add_order(&mut self, order_id: OrderId) {
        if !self.owns(&order_id) {
            self.orders.push(order_id);
        }
    }

    /// Removes the back-reference to `order_id`. Returns `false` when the
    /// account did not reference it.
    pub fn remove_order(&mut self, order_id: &OrderId) -> bool {
        match self.orders.iter().position(|id| id == order_id) {
            Some(position) => {
                self.orders.remove(position);
                true
            }
            None => false,
        }
    }

    /// Copy safe to hand back to the account owner.
    pub fn redacted(&self) -> Self {
        Self {
            hashed_password: String::new(),
            ..self.clone()
        }
    }
}
