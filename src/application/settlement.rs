use super::records::{Records, account_lock_key};
use crate::domain::account::Account;
use crate::domain::audit::{AuditEntry, Outcome};
use crate::domain::catalog::{Catalog, Receipt};
use crate::domain::id::OrderId;
use crate::domain::now_millis;
use crate::domain::order::Order;
use crate::domain::ports::{AuditLogRef, Collection, NotifierRef, PaymentGatewayRef};
use crate::error::Result;
use crate::sync::KeyedLocks;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Summary of one settlement cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleReport {
    /// Orders found in the store.
    pub discovered: usize,
    /// Records that failed sanitization.
    pub skipped: usize,
    /// Outcome recorded for each candidate that reached one.
    pub outcomes: Vec<(OrderId, Outcome)>,
    /// Candidates whose settlement errored before or after reaching an outcome.
    pub failures: Vec<(OrderId, String)>,
}

impl CycleReport {
    pub fn outcome_of(&self, id: &OrderId) -> Option<Outcome> {
        self.outcomes
            .iter()
            .find(|(order_id, _)| order_id == id)
            .map(|(_, outcome)| *outcome)
    }
}

/// Discovers submitted orders, charges them and reconciles their state.
///
/// Each candidate is settled on its own task; a failure in one never affects
/// the others. An order that errors before an outcome is committed stays
/// `submitted` and is picked up again next cycle.
#[derive(Clone)]
pub struct SettlementWorker {
    records: Records,
    catalog: Arc<Catalog>,
    gateway: PaymentGatewayRef,
    notifier: NotifierRef,
    audit: AuditLogRef,
    locks: KeyedLocks,
}

impl SettlementWorker {
    pub fn new(
        records: Records,
        catalog: Arc<Catalog>,
        gateway: PaymentGatewayRef,
        notifier: NotifierRef,
        audit: AuditLogRef,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            records,
            catalog,
            gateway,
            notifier,
            audit,
            locks,
        }
    }

    /// Runs one discovery-through-reconciliation pass.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let ids = self.records.store().list(Collection::Orders).await?;
        let mut report = CycleReport {
            discovered: ids.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();
        for key in ids {
            let Some(order) = self.sanitize(&key).await else {
                report.skipped += 1;
                continue;
            };
            if !order.awaits_settlement() {
                continue;
            }
            let worker = self.clone();
            let order_id = order.id.clone();
            let handle = tasks.spawn(async move { worker.settle(order).await });
            pending.insert(handle.id(), order_id);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((task_id, result)) => {
                    let Some(order_id) = pending.remove(&task_id) else {
                        continue;
                    };
                    match result {
                        Ok(outcome) => report.outcomes.push((order_id, outcome)),
                        Err(e) => {
                            tracing::error!(order_id = %order_id, error = %e, "Settlement failed");
                            report.failures.push((order_id, e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    if let Some(order_id) = pending.remove(&e.id()) {
                        tracing::error!(order_id = %order_id, error = %e, "Settlement task aborted");
                        report.failures.push((order_id, e.to_string()));
                    }
                }
            }
        }

        tracing::info!(
            discovered = report.discovered,
            skipped = report.skipped,
            settled = report.outcomes.len(),
            failed = report.failures.len(),
            "Settlement cycle finished"
        );
        Ok(report)
    }

    /// Reads and validates one stored order. Nothing is mutated here.
    async fn sanitize(&self, key: &str) -> Option<Order> {
        let record = match self.records.store().read(Collection::Orders, key).await {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(key, error = %e, "Error reading one of the orders");
                return None;
            }
        };
        let order = match Order::from_record(record) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(key, error = %e, "Order is not properly formatted, skipping it");
                return None;
            }
        };
        if order.id.as_str() != key {
            tracing::warn!(key, order_id = %order.id, "Order id does not match its record key, skipping it");
            return None;
        }
        if let Err(e) = self.catalog.validate(order.items()) {
            tracing::warn!(key, error = %e, "Order references unknown items, skipping it");
            return None;
        }
        Some(order)
    }

    async fn settle(&self, order: Order) -> Result<Outcome> {
        let account = match self.records.find_account(order.email()).await {
            Ok(Some(account)) => account,
            Ok(None) => return self.settle_no_valid_user(order).await,
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Order owner could not be read");
                return self.settle_no_valid_user(order).await;
            }
        };

        let receipt = self.catalog.compile(order.items())?;
        match receipt.chargeable() {
            Some(amount) => {
                match self.gateway.charge(&account.card, &order.id, amount).await {
                    Ok(()) => self.settle_paid(order, &account, &receipt).await,
                    Err(e) => {
                        tracing::warn!(order_id = %order.id, error = %e, "Payment failed");
                        self.settle_failed(order).await
                    }
                }
            }
            None => self.settle_free(order, account).await,
        }
    }

    async fn record(&self, order: &Order, outcome: Outcome, time: i64) {
        let entry = AuditEntry::new(order.clone(), outcome, time);
        if let Err(e) = self.audit.append(order.id.as_str(), &entry).await {
            tracing::warn!(order_id = %order.id, outcome = %outcome, error = %e, "Audit append failed");
        }
    }

    async fn settle_paid(&self, mut order: Order, account: &Account, receipt: &Receipt) -> Result<Outcome> {
        let now = now_millis();
        self.record(&order, Outcome::SuccessfulPayment, now).await;

        order.mark_paid(now)?;
        if let Err(e) = self.records.save_order(&order).await {
            tracing::error!(order_id = %order.id, error = %e, "Charge succeeded but the paid state was not saved");
            return Err(e);
        }
        tracing::info!(order_id = %order.id, total = %receipt.total, "Order paid");

        let name = account.display_name();
        let body = format!("{name}\n{}\n{}", account.street_address, receipt.message);
        match self.notifier.send(&account.email, &name, &body).await {
            Ok(()) => tracing::debug!(order_id = %order.id, "Customer notified"),
            Err(e) => tracing::warn!(order_id = %order.id, error = %e, "Could not notify the customer"),
        }
        Ok(Outcome::SuccessfulPayment)
    }

    async fn settle_failed(&self, mut order: Order) -> Result<Outcome> {
        self.record(&order, Outcome::FailedPayment, now_millis()).await;
        order.return_to_cart()?;
        self.records.save_order(&order).await?;
        Ok(Outcome::FailedPayment)
    }

    async fn settle_no_valid_user(&self, mut order: Order) -> Result<Outcome> {
        tracing::warn!(order_id = %order.id, email = %order.email(), "Order owner not found");
        self.record(&order, Outcome::NoValidUser, now_millis()).await;
        order.return_to_cart()?;
        self.records.save_order(&order).await?;
        Ok(Outcome::NoValidUser)
    }

    async fn settle_free(&self, order: Order, account: Account) -> Result<Outcome> {
        self.record(&order, Outcome::FreeOrder, now_millis()).await;

        let _guard = self.locks.lock(&account_lock_key(&account.email)).await;
        self.records.delete_order(&order.id).await?;

        // Re-read under the lock; the snapshot taken before charging may be stale.
        let Some(mut account) = self.records.find_account(&account.email).await? else {
            return Ok(Outcome::FreeOrder);
        };
        if account.remove_order(&order.id) {
            self.records.save_account(&account).await?;
        } else {
            tracing::warn!(order_id = %order.id, "Free order was not on the user's order list");
        }
        tracing::info!(order_id = %order.id, "Free order removed");
        Ok(Outcome::FreeOrder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Email;
    use crate::domain::catalog::{CatalogItem, ItemId};
    use crate::domain::money::Amount;
    use crate::domain::order::OrderState;
    use crate::domain::ports::{AuditLog, Notifier, PaymentGateway};
    use crate::error::ServiceError;
    use crate::infrastructure::audit_log::FileAuditLog;
    use crate::infrastructure::in_memory::InMemoryRecordStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingGateway {
        decline: bool,
        charges: Mutex<Vec<(String, OrderId, Amount)>>,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn charge(&self, instrument: &str, order_id: &OrderId, amount: Amount) -> Result<()> {
            self.charges
                .lock()
                .unwrap()
                .push((instrument.to_string(), order_id.clone(), amount));
            if self.decline {
                Err(ServiceError::GatewayError("card declined".into()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fail: bool,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, address: &Email, display_name: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((
                address.to_string(),
                display_name.to_string(),
                body.to_string(),
            ));
            if self.fail {
                Err(ServiceError::NotificationError("mail down".into()))
            } else {
                Ok(())
            }
        }
    }

    struct Harness {
        worker: SettlementWorker,
        records: Records,
        gateway: Arc<RecordingGateway>,
        notifier: Arc<RecordingNotifier>,
        audit: Arc<FileAuditLog>,
        _dir: TempDir,
    }

    async fn harness(gateway: RecordingGateway, notifier: RecordingNotifier) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let records = Records::new(Arc::new(InMemoryRecordStore::new()));
        let gateway = Arc::new(gateway);
        let notifier = Arc::new(notifier);
        let audit = Arc::new(FileAuditLog::open(dir.path()).await.unwrap());
        let mut catalog = Catalog::standard().items().cloned().collect::<Vec<_>>();
        catalog.push(CatalogItem {
            id: ItemId(0),
            name: "Napkins".into(),
            price: dec!(0),
        });
        let worker = SettlementWorker::new(
            records.clone(),
            Arc::new(Catalog::new(catalog)),
            gateway.clone(),
            notifier.clone(),
            audit.clone(),
            KeyedLocks::new(),
        );
        Harness {
            worker,
            records,
            gateway,
            notifier,
            audit,
            _dir: dir,
        }
    }

    async fn account(records: &Records, email: &str) -> Account {
        let account = Account::new(
            Email::parse(email).unwrap(),
            "Jane".into(),
            "Doe".into(),
            "1 Main St".into(),
            "hash".into(),
        );
        records.insert_account(&account).await.unwrap();
        account
    }

    async fn submitted_order(records: &Records, email: &str, items: &[u32]) -> Order {
        let email = Email::parse(email).unwrap();
        let mut order = Order::new(
            OrderId::generate(),
            email.clone(),
            items.iter().copied().map(ItemId).collect(),
        )
        .unwrap();
        order.submit().unwrap();
        records.insert_order(&order).await.unwrap();
        if let Some(mut account) = records.find_account(&email).await.unwrap() {
            account.add_order(order.id.clone());
            records.save_account(&account).await.unwrap();
        }
        order
    }

    async fn audit_outcomes(audit: &FileAuditLog, id: &OrderId) -> Vec<Outcome> {
        audit
            .read_active(id.as_str())
            .await
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str::<AuditEntry>(l).unwrap().outcome)
            .collect()
    }

    #[tokio::test]
    async fn test_successful_payment() {
        let h = harness(RecordingGateway::default(), RecordingNotifier::default()).await;
        account(&h.records, "jane@example.com").await;
        let order = submitted_order(&h.records, "jane@example.com", &[1, 1]).await;

        let report = h.worker.run_cycle().await.unwrap();
        assert_eq!(report.outcome_of(&order.id), Some(Outcome::SuccessfulPayment));

        let charges = h.gateway.charges.lock().unwrap().clone();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].0, "tok_visa");
        assert_eq!(charges[0].1, order.id);
        assert_eq!(charges[0].2.value(), dec!(2.00));

        let stored = h.records.order(&order.id).await.unwrap();
        assert_eq!(stored.state(), OrderState::Paid);
        assert!(stored.time_paid().is_some());

        let sent = h.notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "jane@example.com");
        assert_eq!(sent[0].1, "Jane Doe");
        assert!(sent[0].2.starts_with("Jane Doe\n1 Main St\n"));
        assert!(sent[0].2.contains("Pizza 1: $1.00\nPizza 1: $1.00"));
        assert!(sent[0].2.contains("Total: $2.00"));

        assert_eq!(
            audit_outcomes(&h.audit, &order.id).await,
            vec![Outcome::SuccessfulPayment]
        );
    }

    #[tokio::test]
    async fn test_failed_payment_returns_to_cart_without_notification() {
        let gateway = RecordingGateway {
            decline: true,
            ..Default::default()
        };
        let h = harness(gateway, RecordingNotifier::default()).await;
        account(&h.records, "jane@example.com").await;
        let order = submitted_order(&h.records, "jane@example.com", &[1, 1]).await;

        let report = h.worker.run_cycle().await.unwrap();
        assert_eq!(report.outcome_of(&order.id), Some(Outcome::FailedPayment));
        assert_eq!(
            h.records.order(&order.id).await.unwrap().state(),
            OrderState::Cart
        );
        assert!(h.notifier.sent.lock().unwrap().is_empty());
        assert_eq!(
            audit_outcomes(&h.audit, &order.id).await,
            vec![Outcome::FailedPayment]
        );

        // not a candidate until resubmitted
        let report = h.worker.run_cycle().await.unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(h.gateway.charges.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_paid_state() {
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let h = harness(RecordingGateway::default(), notifier).await;
        account(&h.records, "jane@example.com").await;
        let order = submitted_order(&h.records, "jane@example.com", &[3]).await;

        let report = h.worker.run_cycle().await.unwrap();
        assert_eq!(report.outcome_of(&order.id), Some(Outcome::SuccessfulPayment));
        assert!(report.failures.is_empty());
        assert_eq!(
            h.records.order(&order.id).await.unwrap().state(),
            OrderState::Paid
        );
    }

    #[tokio::test]
    async fn test_free_order_is_deleted_without_charging() {
        let h = harness(RecordingGateway::default(), RecordingNotifier::default()).await;
        account(&h.records, "jane@example.com").await;
        let free = submitted_order(&h.records, "jane@example.com", &[0, 0]).await;
        let paid = submitted_order(&h.records, "jane@example.com", &[2]).await;

        let report = h.worker.run_cycle().await.unwrap();
        assert_eq!(report.outcome_of(&free.id), Some(Outcome::FreeOrder));
        assert_eq!(report.outcome_of(&paid.id), Some(Outcome::SuccessfulPayment));

        assert!(matches!(
            h.records.order(&free.id).await,
            Err(ServiceError::NotFound(_))
        ));
        let charges = h.gateway.charges.lock().unwrap().clone();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].1, paid.id);

        let account = h
            .records
            .account(&Email::parse("jane@example.com").unwrap())
            .await
            .unwrap();
        assert_eq!(account.orders, vec![paid.id.clone()]);
    }

    #[tokio::test]
    async fn test_no_valid_user() {
        let h = harness(RecordingGateway::default(), RecordingNotifier::default()).await;
        let order = submitted_order(&h.records, "ghost@example.com", &[1]).await;

        let report = h.worker.run_cycle().await.unwrap();
        assert_eq!(report.outcome_of(&order.id), Some(Outcome::NoValidUser));
        assert_eq!(
            h.records.order(&order.id).await.unwrap().state(),
            OrderState::Cart
        );
        assert!(h.gateway.charges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_owner_is_no_valid_user() {
        let h = harness(RecordingGateway::default(), RecordingNotifier::default()).await;
        h.records
            .store()
            .create(Collection::Users, "jane@example.com", json!({"firstName": 7}))
            .await
            .unwrap();
        let order = submitted_order(&h.records, "ghost@example.com", &[1]).await;
        let broken = {
            let mut order = Order::new(
                OrderId::generate(),
                Email::parse("jane@example.com").unwrap(),
                vec![ItemId(2)],
            )
            .unwrap();
            order.submit().unwrap();
            h.records.insert_order(&order).await.unwrap();
            order
        };

        let report = h.worker.run_cycle().await.unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.outcome_of(&order.id), Some(Outcome::NoValidUser));
        assert_eq!(report.outcome_of(&broken.id), Some(Outcome::NoValidUser));
        assert_eq!(
            h.records.order(&broken.id).await.unwrap().state(),
            OrderState::Cart
        );
        assert_eq!(
            audit_outcomes(&h.audit, &broken.id).await,
            vec![Outcome::NoValidUser]
        );
        assert!(h.gateway.charges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_and_idle_orders_are_skipped() {
        let h = harness(RecordingGateway::default(), RecordingNotifier::default()).await;
        account(&h.records, "jane@example.com").await;
        let good = submitted_order(&h.records, "jane@example.com", &[1]).await;

        let store = h.records.store();
        store
            .create(Collection::Orders, "broken", json!({"id": 7}))
            .await
            .unwrap();
        store
            .create(
                Collection::Orders,
                "zzzzzzzzzzzzzzzzzzzz",
                json!({"id": "zzzzzzzzzzzzzzzzzzzz", "email": "jane@example.com", "order": [42], "state": "submitted"}),
            )
            .await
            .unwrap();
        let cart = Order::new(
            OrderId::generate(),
            Email::parse("jane@example.com").unwrap(),
            vec![ItemId(1)],
        )
        .unwrap();
        h.records.insert_order(&cart).await.unwrap();

        let report = h.worker.run_cycle().await.unwrap();
        assert_eq!(report.discovered, 4);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.outcomes, vec![(good.id.clone(), Outcome::SuccessfulPayment)]);
        assert_eq!(
            store.read(Collection::Orders, "broken").await.unwrap(),
            json!({"id": 7})
        );
        assert_eq!(
            h.records.order(&cart.id).await.unwrap().state(),
            OrderState::Cart
        );
    }

    #[tokio::test]
    async fn test_one_outcome_per_candidate_with_shared_account() {
        let h = harness(RecordingGateway::default(), RecordingNotifier::default()).await;
        account(&h.records, "jane@example.com").await;
        let mut ids = Vec::new();
        for n in 0..6u32 {
            let items = if n % 2 == 0 { vec![0] } else { vec![1, 2] };
            ids.push(submitted_order(&h.records, "jane@example.com", &items).await.id);
        }

        let report = h.worker.run_cycle().await.unwrap();
        assert_eq!(report.outcomes.len(), 6);
        for id in &ids {
            assert_eq!(audit_outcomes(&h.audit, id).await.len(), 1);
        }

        // concurrent free-order settlements must not lose each other's list updates
        let account = h
            .records
            .account(&Email::parse("jane@example.com").unwrap())
            .await
            .unwrap();
        assert_eq!(account.orders.len(), 3);
        assert_eq!(h.gateway.charges.lock().unwrap().len(), 3);
        assert!(h.worker.locks.is_empty());
    }
}
