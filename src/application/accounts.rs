use super::credentials::PasswordHasher;
use super::records::{Records, account_lock_key};
use super::tokens::TokenService;
use crate::domain::account::{Account, Email};
use crate::domain::id::TokenId;
use crate::error::{Result, ServiceError};
use crate::sync::KeyedLocks;
use tokio::task::JoinSet;

/// Validated input for opening an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub street_address: String,
    pub password: String,
}

/// Validated profile changes; at least one field is set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_address: Option<String>,
    pub password: Option<String>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.street_address.is_none()
            && self.password.is_none()
    }
}

#[derive(Clone)]
pub struct AccountService {
    records: Records,
    tokens: TokenService,
    hasher: PasswordHasher,
    locks: KeyedLocks,
}

impl AccountService {
    pub fn new(
        records: Records,
        tokens: TokenService,
        hasher: PasswordHasher,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            records,
            tokens,
            hasher,
            locks,
        }
    }

    pub async fn create(&self, new: NewAccount) -> Result<Account> {
        let account = Account::new(
            new.email,
            new.first_name,
            new.last_name,
            new.street_address,
            self.hasher.hash(&new.password),
        );
        self.records
            .insert_account(&account)
            .await
            .map_err(|e| match e {
                ServiceError::Exists(_) => ServiceError::Conflict(
                    "A user with that email already exists".to_string(),
                ),
                other => other,
            })?;
        tracing::info!(email = %account.email, "Account created");
        Ok(account.redacted())
    }

    pub async fn get(&self, token: &TokenId, email: &Email) -> Result<Account> {
        self.tokens.authorize(token, email).await?;
        Ok(self.records.account(email).await?.redacted())
    }

    pub async fn update(
        &self,
        token: &TokenId,
        email: &Email,
        changes: AccountChanges,
    ) -> Result<Account> {
        if changes.is_empty() {
            return Err(ServiceError::validation("Missing fields to update"));
        }
        self.tokens.authorize(token, email).await?;

        let _guard = self.locks.lock(&account_lock_key(email)).await;
        let mut account = self.records.account(email).await?;
        if let Some(first_name) = changes.first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            account.last_name = last_name;
        }
        if let Some(street_address) = changes.street_address {
            account.street_address = street_address;
        }
        if let Some(password) = changes.password {
            account.hashed_password = self.hasher.hash(&password);
        }
        self.records.save_account(&account).await?;
        Ok(account.redacted())
    }

    /// Removes the account and every order it owns.
    ///
    /// Order deletions run concurrently and are all awaited; if any of them
    /// fails the call reports `PartialFailure` with the ids left behind.
    pub async fn delete(&self, token: &TokenId, email: &Email) -> Result<()> {
        self.tokens.authorize(token, email).await?;

        let _guard = self.locks.lock(&account_lock_key(email)).await;
        let account = self.records.account(email).await?;
        self.records.delete_account(email).await?;

        let mut deletions = JoinSet::new();
        for order_id in account.orders {
            let records = self.records.clone();
            deletions.spawn(async move {
                let result = records.delete_order(&order_id).await;
                (order_id, result)
            });
        }

        let mut failed = Vec::new();
        while let Some(joined) = deletions.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((order_id, Err(e))) => {
                    tracing::warn!(order_id = %order_id, error = %e, "Failed to delete order of removed account");
                    failed.push(order_id.to_string());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Order deletion task failed");
                    failed.push("<unknown>".to_string());
                }
            }
        }

        if failed.is_empty() {
            tracing::info!(email = %email, "Account deleted");
            Ok(())
        } else {
            failed.sort();
            Err(ServiceError::PartialFailure {
                message: "Errors encountered while trying to delete all the user's orders"
                    .to_string(),
                failed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::ItemId;
    use crate::domain::id::OrderId;
    use crate::domain::order::Order;
    use crate::infrastructure::in_memory::InMemoryRecordStore;
    use secrecy::SecretString;
    use std::sync::Arc;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: Email::parse(email).unwrap(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            street_address: "1 Main St".into(),
            password: "pw".into(),
        }
    }

    async fn setup() -> (AccountService, TokenService, Records) {
        let records = Records::new(Arc::new(InMemoryRecordStore::new()));
        let hasher = PasswordHasher::new(SecretString::from("s"));
        let tokens = TokenService::new(records.clone(), hasher.clone());
        let accounts = AccountService::new(records.clone(), tokens.clone(), hasher, KeyedLocks::new());
        (accounts, tokens, records)
    }

    async fn add_order(records: &Records, email: &Email, item: u32) -> OrderId {
        let order = Order::new(OrderId::generate(), email.clone(), vec![ItemId(item)]).unwrap();
        records.insert_order(&order).await.unwrap();
        let mut account = records.account(email).await.unwrap();
        account.add_order(order.id.clone());
        records.save_account(&account).await.unwrap();
        order.id
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let (accounts, _, _) = setup().await;
        let created = accounts.create(new_account("jane@example.com")).await.unwrap();
        assert!(created.hashed_password.is_empty());
        assert!(matches!(
            accounts.create(new_account("jane@example.com")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_get_and_update_require_own_token() {
        let (accounts, tokens, _) = setup().await;
        accounts.create(new_account("jane@example.com")).await.unwrap();
        accounts.create(new_account("john@example.com")).await.unwrap();
        let jane = Email::parse("jane@example.com").unwrap();
        let john = Email::parse("john@example.com").unwrap();
        let token = tokens.issue(&jane, "pw").await.unwrap().id;

        assert_eq!(accounts.get(&token, &jane).await.unwrap().email, jane);
        assert!(matches!(
            accounts.get(&token, &john).await,
            Err(ServiceError::Forbidden)
        ));

        let changes = AccountChanges {
            street_address: Some("2 High St".into()),
            password: Some("new-pw".into()),
            ..Default::default()
        };
        let updated = accounts.update(&token, &jane, changes).await.unwrap();
        assert_eq!(updated.street_address, "2 High St");
        assert!(tokens.issue(&jane, "new-pw").await.is_ok());
        assert!(tokens.issue(&jane, "pw").await.is_err());

        assert!(matches!(
            accounts.update(&token, &jane, AccountChanges::default()).await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_account_and_orders() {
        let (accounts, tokens, records) = setup().await;
        accounts.create(new_account("jane@example.com")).await.unwrap();
        let jane = Email::parse("jane@example.com").unwrap();
        let first = add_order(&records, &jane, 1).await;
        let second = add_order(&records, &jane, 2).await;
        let token = tokens.issue(&jane, "pw").await.unwrap().id;

        accounts.delete(&token, &jane).await.unwrap();

        assert!(records.find_account(&jane).await.unwrap().is_none());
        assert!(records.order(&first).await.is_err());
        assert!(records.order(&second).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_reports_partial_failure() {
        let (accounts, tokens, records) = setup().await;
        accounts.create(new_account("jane@example.com")).await.unwrap();
        let jane = Email::parse("jane@example.com").unwrap();
        let kept = add_order(&records, &jane, 1).await;
        let missing = add_order(&records, &jane, 2).await;
        records.delete_order(&missing).await.unwrap();
        let token = tokens.issue(&jane, "pw").await.unwrap().id;

        match accounts.delete(&token, &jane).await {
            Err(ServiceError::PartialFailure { failed, .. }) => {
                assert_eq!(failed, vec![missing.to_string()]);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert!(records.find_account(&jane).await.unwrap().is_none());
        assert!(records.order(&kept).await.is_err());
    }
}
