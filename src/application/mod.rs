//! Application layer: the use cases driven by requests and by the background
//! jobs.
//!
//! [`Services`] wires every service over one record store, one audit log and
//! one set of per-account locks. Customer-facing operations and the settlement
//! worker must share those locks for account order lists to stay consistent.

pub mod accounts;
pub mod credentials;
pub mod orders;
pub mod records;
pub mod rotation;
pub mod scheduler;
pub mod settlement;
pub mod tokens;

use crate::domain::catalog::Catalog;
use crate::domain::ports::{AuditLogRef, NotifierRef, PaymentGatewayRef, RecordStoreRef};
use crate::sync::KeyedLocks;
use accounts::AccountService;
use credentials::PasswordHasher;
use orders::OrderManager;
use records::Records;
use rotation::LogRotator;
use secrecy::SecretString;
use settlement::SettlementWorker;
use std::sync::Arc;
use tokens::TokenService;

/// Adapters the services are built from.
pub struct Adapters {
    pub store: RecordStoreRef,
    pub audit: AuditLogRef,
    pub gateway: PaymentGatewayRef,
    pub notifier: NotifierRef,
}

#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub tokens: TokenService,
    pub orders: OrderManager,
    pub settlement: SettlementWorker,
    pub rotation: LogRotator,
}

impl Services {
    pub fn new(adapters: Adapters, catalog: Catalog, hashing_secret: SecretString) -> Self {
        let records = Records::new(adapters.store);
        let catalog = Arc::new(catalog);
        let locks = KeyedLocks::new();
        let hasher = PasswordHasher::new(hashing_secret);

        let tokens = TokenService::new(records.clone(), hasher.clone());
        let accounts = AccountService::new(records.clone(), tokens.clone(), hasher, locks.clone());
        let orders = OrderManager::new(records.clone(), tokens.clone(), catalog.clone(), locks.clone());
        let settlement = SettlementWorker::new(
            records,
            catalog,
            adapters.gateway,
            adapters.notifier,
            adapters.audit.clone(),
            locks,
        );

        Self {
            accounts,
            tokens,
            orders,
            settlement,
            rotation: LogRotator::new(adapters.audit),
        }
    }
}
