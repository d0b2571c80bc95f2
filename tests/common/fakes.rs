use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use creator_settlement::{
    api::{
        CollaboratorError,
        catalog::ProductCatalog,
        notifications::EmailSender,
        razorpay::{self, GatewayError, PaymentGateway, PayoutRequest},
        uploads::FileStorage,
    },
    models::{BankDetails, OrderEntity, Product},
    queue::{Task, TaskSink},
};
use uuid::Uuid;

/// How the mock gateway answers `create_payout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutMode {
    Accept,
    Reject,
    Timeout,
    /// 504 from the gateway: the transfer may or may not exist.
    ServerError,
}

/// Razorpay stand-in that hands out sequential ids and counts calls.
pub struct MockGateway {
    key_secret: String,
    ids: AtomicUsize,
    pub orders_created: AtomicUsize,
    pub contacts_created: AtomicUsize,
    pub payouts_created: AtomicUsize,
    pub cancelled: Mutex<Vec<String>>,
    pub payout_requests: Mutex<Vec<PayoutRequest>>,
    payout_mode: Mutex<PayoutMode>,
}

impl MockGateway {
    pub fn new(key_secret: &str) -> Self {
        Self {
            key_secret: key_secret.to_string(),
            ids: AtomicUsize::new(0),
            orders_created: AtomicUsize::new(0),
            contacts_created: AtomicUsize::new(0),
            payouts_created: AtomicUsize::new(0),
            cancelled: Mutex::new(vec![]),
            payout_requests: Mutex::new(vec![]),
            payout_mode: Mutex::new(PayoutMode::Accept),
        }
    }

    pub fn set_payout_mode(&self, mode: PayoutMode) {
        *self.payout_mode.lock().unwrap() = mode;
    }

    pub fn payout_calls(&self) -> usize {
        self.payouts_created.load(Ordering::SeqCst)
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.ids.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        _amount: i64,
        _currency: &str,
        _receipt: &str,
    ) -> Result<String, GatewayError> {
        self.orders_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_id("order"))
    }

    async fn create_plan(
        &self,
        _name: &str,
        _amount: i64,
        _currency: &str,
        _interval: &str,
    ) -> Result<String, GatewayError> {
        Ok(self.next_id("plan"))
    }

    async fn create_subscription(
        &self,
        _plan_id: &str,
        _total_count: i32,
    ) -> Result<String, GatewayError> {
        Ok(self.next_id("sub"))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
        self.cancelled
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
        Ok(())
    }

    async fn create_contact(
        &self,
        _name: &str,
        _email: &str,
        _reference_id: &str,
    ) -> Result<String, GatewayError> {
        self.contacts_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_id("cont"))
    }

    async fn create_fund_account(
        &self,
        _contact_id: &str,
        _bank: &BankDetails,
    ) -> Result<String, GatewayError> {
        Ok(self.next_id("fa"))
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<String, GatewayError> {
        self.payouts_created.fetch_add(1, Ordering::SeqCst);
        self.payout_requests.lock().unwrap().push(request.clone());
        // Give a concurrent withdrawal the chance to interleave.
        tokio::task::yield_now().await;

        let mode = *self.payout_mode.lock().unwrap();
        match mode {
            PayoutMode::Accept => Ok(self.next_id("pout")),
            PayoutMode::Reject => Err(GatewayError::Rejected {
                operation: "create_payout",
                status: 400,
                body: "fund account is inactive".into(),
            }),
            PayoutMode::Timeout => Err(GatewayError::Timeout {
                operation: "create_payout",
            }),
            PayoutMode::ServerError => Err(GatewayError::Rejected {
                operation: "create_payout",
                status: 504,
                body: "upstream timed out".into(),
            }),
        }
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool {
        let payload = format!("{gateway_order_id}|{gateway_payment_id}");
        razorpay::sign(payload.as_bytes(), &self.key_secret) == signature
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    products: Mutex<HashMap<Uuid, Product>>,
}

impl FakeCatalog {
    pub fn insert(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }
}

#[async_trait]
impl ProductCatalog for FakeCatalog {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, CollaboratorError> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }
}

pub struct FakeStorage;

#[async_trait]
impl FileStorage for FakeStorage {
    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, CollaboratorError> {
        Ok(format!("https://files.test/{key}?ttl={}", ttl.as_secs()))
    }
}

/// Records every confirmation as `(order id, download url)`.
#[derive(Default)]
pub struct FakeEmail {
    pub sent: Mutex<Vec<(Uuid, String)>>,
}

#[async_trait]
impl EmailSender for FakeEmail {
    async fn send_order_confirmation(
        &self,
        order: &OrderEntity,
        _product: &Product,
        download_url: &str,
    ) -> Result<(), CollaboratorError> {
        self.sent
            .lock()
            .unwrap()
            .push((order.id, download_url.to_string()));
        Ok(())
    }
}

/// Keeps enqueued tasks instead of running them.
#[derive(Default)]
pub struct RecordingSink {
    pub tasks: Mutex<Vec<Task>>,
}

impl RecordingSink {
    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.lock().unwrap().iter().map(Task::name).collect()
    }

    pub fn take(&self) -> Vec<Task> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }
}

impl TaskSink for RecordingSink {
    fn enqueue(&self, task: Task) {
        self.tasks.lock().unwrap().push(task);
    }
}
