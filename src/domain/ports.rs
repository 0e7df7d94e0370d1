use super::account::Email;
use super::audit::AuditEntry;
use super::id::{OrderId, TokenId};
use super::money::Amount;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Record collections held by the [`RecordStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Tokens,
    Orders,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Users, Collection::Tokens, Collection::Orders];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Tokens => "tokens",
            Collection::Orders => "orders",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable keyed storage. Each single-key write is atomic.
///
/// `create` fails with `Exists` when the key is taken; `read`, `update` and
/// `delete` fail with `NotFound` when it is absent.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, collection: Collection, key: &str, record: serde_json::Value)
    -> Result<()>;
    async fn read(&self, collection: Collection, key: &str) -> Result<serde_json::Value>;
    async fn update(&self, collection: Collection, key: &str, record: serde_json::Value)
    -> Result<()>;
    async fn delete(&self, collection: Collection, key: &str) -> Result<()>;
    async fn list(&self, collection: Collection) -> Result<Vec<String>>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `false` when the token is unknown, bound to another identity, or expired.
    async fn verify(&self, token: &TokenId, identity: &Email) -> bool;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `instrument` for `amount`. `Err` carries the decline/failure reason.
    async fn charge(&self, instrument: &str, order_id: &OrderId, amount: Amount) -> Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, address: &Email, display_name: &str, body: &str) -> Result<()>;
}

/// Append-only per-order settlement log with archive rotation.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, log_id: &str, entry: &AuditEntry) -> Result<()>;
    /// Ids of the active logs, plus archive ids when `include_archived`.
    async fn list(&self, include_archived: bool) -> Result<Vec<String>>;
    /// Compresses the active log into archive `archive_id`, then truncates it.
    /// Appends to the same log id are excluded while this runs.
    async fn rotate(&self, log_id: &str, archive_id: &str) -> Result<()>;
    async fn read_active(&self, log_id: &str) -> Result<String>;
    async fn read_archive(&self, archive_id: &str) -> Result<String>;
}

pub type RecordStoreRef = Arc<dyn RecordStore>;
pub type AuthenticatorRef = Arc<dyn Authenticator>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type NotifierRef = Arc<dyn Notifier>;
pub type AuditLogRef = Arc<dyn AuditLog>;
