use super::records::{Records, account_lock_key};
use super::tokens::TokenService;
use crate::domain::catalog::{Catalog, ItemId};
use crate::domain::id::{OrderId, TokenId};
use crate::domain::order::Order;
use crate::error::{Result, ServiceError};
use crate::sync::KeyedLocks;
use std::sync::Arc;

const MAX_ID_ATTEMPTS: usize = 3;

/// Enforces the order state machine and ownership rules for customer-issued
/// operations.
///
/// Every operation on an existing order resolves the order first, then checks
/// that the presented token is valid for the order's owner. A token belonging
/// to someone else is indistinguishable from a bad token (`Forbidden`).
#[derive(Clone)]
pub struct OrderManager {
    records: Records,
    tokens: TokenService,
    catalog: Arc<Catalog>,
    locks: KeyedLocks,
}

impl OrderManager {
    pub fn new(
        records: Records,
        tokens: TokenService,
        catalog: Arc<Catalog>,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            records,
            tokens,
            catalog,
            locks,
        }
    }

    fn check_items(&self, items: &[ItemId]) -> Result<()> {
        if items.is_empty() {
            return Err(ServiceError::validation(
                "Order must contain at least one item",
            ));
        }
        self.catalog.validate(items)
    }

    /// Opens a new order in the cart of the token's owner.
    pub async fn create(&self, token: &TokenId, items: Vec<ItemId>) -> Result<Order> {
        self.check_items(&items)?;
        let email = self.tokens.identity(token).await?;

        let _guard = self.locks.lock(&account_lock_key(&email)).await;
        let mut account = self
            .records
            .find_account(&email)
            .await?
            .ok_or(ServiceError::Forbidden)?;

        let mut attempt = 0;
        let order = loop {
            attempt += 1;
            let order = Order::new(OrderId::generate(), email.clone(), items.clone())?;
            match self.records.insert_order(&order).await {
                Ok(()) => break order,
                Err(ServiceError::Exists(_)) if attempt < MAX_ID_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        };

        account.add_order(order.id.clone());
        if let Err(e) = self.records.save_account(&account).await {
            // Without the back-reference the order would be orphaned.
            if let Err(rollback) = self.records.delete_order(&order.id).await {
                tracing::error!(order_id = %order.id, error = %rollback, "Failed to roll back order");
            }
            return Err(e);
        }

        tracing::info!(order_id = %order.id, email = %email, items = order.items().len(), "Order created");
        Ok(order)
    }

    pub async fn read(&self, token: &TokenId, id: &OrderId) -> Result<Order> {
        let order = self.records.order(id).await?;
        self.tokens.authorize(token, order.email()).await?;
        Ok(order)
    }

    /// Replaces the item list; the order goes back to `cart`.
    pub async fn update_items(
        &self,
        token: &TokenId,
        id: &OrderId,
        items: Vec<ItemId>,
    ) -> Result<Order> {
        self.check_items(&items)?;
        let mut order = self.records.order(id).await?;
        self.tokens.authorize(token, order.email()).await?;

        order.replace_items(items)?;
        self.records.save_order(&order).await?;
        tracing::debug!(order_id = %id, "Order items updated");
        Ok(order)
    }

    /// Deletes the order and its back-reference on the owner's account.
    ///
    /// A missing account or back-reference is an integrity fault; nothing is
    /// deleted in that case.
    pub async fn delete(&self, token: &TokenId, id: &OrderId) -> Result<()> {
        let order = self.records.order(id).await?;
        self.tokens.authorize(token, order.email()).await?;

        let _guard = self.locks.lock(&account_lock_key(order.email())).await;
        let mut account = self
            .records
            .find_account(order.email())
            .await?
            .ok_or_else(|| {
                ServiceError::IntegrityFault(format!(
                    "Could not find the user who created order {id}"
                ))
            })?;
        if !account.owns(id) {
            tracing::error!(order_id = %id, email = %account.email, "Order missing from account's order list");
            return Err(ServiceError::IntegrityFault(format!(
                "Could not find order {id} on the user's order list"
            )));
        }

        self.records.delete_order(id).await?;
        account.remove_order(id);
        self.records.save_account(&account).await?;
        tracing::info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Queues the order for the next settlement cycle.
    pub async fn submit(&self, token: &TokenId, id: &OrderId) -> Result<Order> {
        let mut order = self.records.order(id).await?;
        self.tokens.authorize(token, order.email()).await?;

        order.submit()?;
        self.records.save_order(&order).await?;
        tracing::info!(order_id = %id, "Order submitted for payment");
        Ok(order)
    }

    /// The catalog, for holders of a valid token.
    pub async fn menu(&self, token: &TokenId) -> Result<Arc<Catalog>> {
        let email = self.tokens.identity(token).await?;
        if self.records.find_account(&email).await?.is_none() {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.catalog.clone())
    }
}
