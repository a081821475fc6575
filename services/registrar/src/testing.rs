//! In-memory collaborators for driving the pipeline in tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use adapter_service::{
    AdapterError, FeeProvider, NameLedger, PriceProvider, QueueTransport, Result,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use types::{Address, Decimal, DeleteEntry, RawMessage, RegistrationTransaction, TxHash};

/// Queue double: hands out scripted batches and records deletions per queue URL
#[derive(Default)]
pub struct MockQueue {
    batches: Mutex<VecDeque<Vec<RawMessage>>>,
    urls: HashMap<String, String>,
    deleted: Mutex<Vec<(String, DeleteEntry)>>,
    rejected_ids: Mutex<HashSet<String>>,
    fail_receive: AtomicBool,
    delete_delay: Duration,
    url_lookups: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_url(mut self, queue_arn: &str, queue_url: &str) -> Self {
        self.urls.insert(queue_arn.to_string(), queue_url.to_string());
        self
    }

    /// Every delete call waits this long before touching the queue
    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    pub fn push_batch(&self, batch: Vec<RawMessage>) {
        self.batches.lock().push_back(batch);
    }

    pub fn fail_receive(&self, fail: bool) {
        self.fail_receive.store(fail, Ordering::SeqCst);
    }

    /// The transport reports these entry ids as failed on delete
    pub fn reject_delete(&self, message_id: &str) {
        self.rejected_ids.lock().insert(message_id.to_string());
    }

    pub fn deleted(&self) -> Vec<(String, DeleteEntry)> {
        self.deleted.lock().clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.deleted.lock().iter().map(|(_, e)| e.id.clone()).collect();
        ids.sort();
        ids
    }

    pub fn url_lookups(&self) -> usize {
        self.url_lookups.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueTransport for MockQueue {
    async fn receive_batch(&self) -> Result<Vec<RawMessage>> {
        if self.fail_receive.load(Ordering::SeqCst) {
            return Err(AdapterError::Queue {
                operation: "receive",
                reason: "mock receive failure".to_string(),
            });
        }
        Ok(self.batches.lock().pop_front().unwrap_or_default())
    }

    async fn delete_batch(&self, queue_url: &str, entries: &[DeleteEntry]) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delete_delay.is_zero() {
            tokio::time::sleep(self.delete_delay).await;
        }
        let rejected = self.rejected_ids.lock().clone();
        let mut failed_ids = Vec::new();
        let mut deleted = self.deleted.lock();
        for entry in entries {
            if rejected.contains(&entry.id) {
                failed_ids.push(entry.id.clone());
            } else {
                deleted.push((queue_url.to_string(), entry.clone()));
            }
        }

        if failed_ids.is_empty() {
            Ok(())
        } else {
            Err(AdapterError::PartialDelete {
                queue_url: queue_url.to_string(),
                failed_ids,
            })
        }
    }

    async fn resolve_queue_url(&self, queue_arn: &str) -> Result<String> {
        self.url_lookups.fetch_add(1, Ordering::SeqCst);
        self.urls
            .get(queue_arn)
            .cloned()
            .ok_or_else(|| AdapterError::QueueUrlMissing {
                queue_name: queue_arn.to_string(),
            })
    }
}

/// Ledger double: scripted resolutions, recorded submissions
#[derive(Default)]
pub struct MockLedger {
    resolutions: Mutex<HashMap<String, Address>>,
    failing_lookups: Mutex<HashSet<String>>,
    submissions: Mutex<Vec<RegistrationTransaction>>,
    fail_submission: AtomicBool,
    lookups: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_resolution(&self, name: &str, address: Address) {
        self.resolutions.lock().insert(name.to_string(), address);
    }

    pub fn fail_lookup(&self, name: &str) {
        self.failing_lookups.lock().insert(name.to_string());
    }

    pub fn fail_submission(&self, fail: bool) {
        self.fail_submission.store(fail, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<RegistrationTransaction> {
        self.submissions.lock().clone()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameLedger for MockLedger {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing_lookups.lock().contains(name) {
            return Err(AdapterError::Lookup {
                name: name.to_string(),
                reason: "mock provider timeout".to_string(),
            });
        }
        Ok(self.resolutions.lock().get(name).copied())
    }

    async fn submit_registration(&self, transaction: &RegistrationTransaction) -> Result<TxHash> {
        if self.fail_submission.load(Ordering::SeqCst) {
            return Err(AdapterError::Submission("mock revert".to_string()));
        }
        let mut submissions = self.submissions.lock();
        submissions.push(transaction.clone());
        Ok(TxHash::from_low_u64_be(submissions.len() as u64))
    }
}

/// Spot price double with a fetch counter and optional latency
pub struct MockPriceProvider {
    price: Mutex<Option<Decimal>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockPriceProvider {
    pub fn new(price: Decimal) -> Self {
        Self {
            price: Mutex::new(Some(price)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every fetch fails until [`Self::set_price`] is called
    pub fn failing() -> Self {
        Self {
            price: Mutex::new(None),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock() = Some(price);
    }

    pub fn set_failing(&self) {
        *self.price.lock() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    async fn fetch_spot_price(&self) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let price = *self.price.lock();
        price.ok_or(AdapterError::HttpStatus {
            provider: "price feed",
            status: 503,
        })
    }
}

/// Fee rate double, in provider units (tenths of gwei)
pub struct MockFeeProvider {
    rate: Mutex<Option<Decimal>>,
    calls: AtomicUsize,
}

impl MockFeeProvider {
    pub fn new(rate: Decimal) -> Self {
        Self {
            rate: Mutex::new(Some(rate)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            rate: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_rate(&self, rate: Decimal) {
        *self.rate.lock() = Some(rate);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeeProvider for MockFeeProvider {
    async fn fetch_safe_fee_rate(&self) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rate = *self.rate.lock();
        rate.ok_or(AdapterError::HttpStatus {
            provider: "gas station",
            status: 502,
        })
    }
}

/// Raw queue message with a JSON body
pub fn raw_message(message_id: &str, queue_arn: &str, body: &str) -> RawMessage {
    RawMessage {
        message_id: message_id.to_string(),
        receipt_handle: format!("receipt-{message_id}"),
        body: body.to_string(),
        event_source_arn: queue_arn.to_string(),
    }
}

/// Registration request body in the queue wire format
pub fn request_body(name: &str, target_address: &str, dollar_amount: &str) -> String {
    format!(
        r#"{{"name":"{name}","targetAddress":"{target_address}","dollarAmount":{dollar_amount}}}"#
    )
}
