//! Adapters implementing the domain ports: record stores, the audit log, and
//! the payment/notification providers.

pub mod audit_log;
pub mod file_store;
pub mod in_memory;
pub mod mailgun;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sandbox;
pub mod stripe;
