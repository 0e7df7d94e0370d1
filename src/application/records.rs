use crate::domain::account::{Account, Email};
use crate::domain::id::{OrderId, TokenId};
use crate::domain::order::Order;
use crate::domain::ports::{Collection, RecordStoreRef};
use crate::domain::token::Token;
use crate::error::{Result, ServiceError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Typed access to the record store for the three entity collections.
#[derive(Clone)]
pub struct Records {
    store: RecordStoreRef,
}

impl Records {
    pub fn new(store: RecordStoreRef) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStoreRef {
        &self.store
    }

    async fn load<T: DeserializeOwned>(&self, collection: Collection, key: &str) -> Result<T> {
        let record = self.store.read(collection, key).await?;
        Ok(serde_json::from_value(record)?)
    }

    async fn insert<T: Serialize>(&self, collection: Collection, key: &str, value: &T) -> Result<()> {
        self.store
            .create(collection, key, serde_json::to_value(value)?)
            .await
    }

    async fn save<T: Serialize>(&self, collection: Collection, key: &str, value: &T) -> Result<()> {
        self.store
            .update(collection, key, serde_json::to_value(value)?)
            .await
    }

    pub async fn account(&self, email: &Email) -> Result<Account> {
        self.load(Collection::Users, email.as_str()).await
    }

    /// Like [`Records::account`] but maps a missing record to `None`.
    pub async fn find_account(&self, email: &Email) -> Result<Option<Account>> {
        match self.account(email).await {
            Ok(account) => Ok(Some(account)),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn insert_account(&self, account: &Account) -> Result<()> {
        self.insert(Collection::Users, account.email.as_str(), account)
            .await
    }

    pub async fn save_account(&self, account: &Account) -> Result<()> {
        self.save(Collection::Users, account.email.as_str(), account)
            .await
    }

    pub async fn delete_account(&self, email: &Email) -> Result<()> {
        self.store.delete(Collection::Users, email.as_str()).await
    }

    pub async fn token(&self, id: &TokenId) -> Result<Token> {
        self.load(Collection::Tokens, id.as_str()).await
    }

    pub async fn insert_token(&self, token: &Token) -> Result<()> {
        self.insert(Collection::Tokens, token.id.as_str(), token).await
    }

    pub async fn save_token(&self, token: &Token) -> Result<()> {
        self.save(Collection::Tokens, token.id.as_str(), token).await
    }

    pub async fn delete_token(&self, id: &TokenId) -> Result<()> {
        self.store.delete(Collection::Tokens, id.as_str()).await
    }

    pub async fn order(&self, id: &OrderId) -> Result<Order> {
        self.load(Collection::Orders, id.as_str()).await
    }

    pub async fn insert_order(&self, order: &Order) -> Result<()> {
        self.insert(Collection::Orders, order.id.as_str(), order).await
    }

    pub async fn save_order(&self, order: &Order) -> Result<()> {
        self.save(Collection::Orders, order.id.as_str(), order).await
    }

    pub async fn delete_order(&self, id: &OrderId) -> Result<()> {
        self.store.delete(Collection::Orders, id.as_str()).await
    }
}

/// Lock key serializing writes to one account's order list.
pub(crate) fn account_lock_key(email: &Email) -> String {
    format!("account:{email}")
}
