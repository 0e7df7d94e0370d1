//! Domain layer: entities, value objects and the ports the application layer
//! drives.

pub mod account;
pub mod audit;
pub mod catalog;
pub mod id;
pub mod money;
pub mod order;
pub mod ports;
pub mod token;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
