//! Shared fixtures for the integration tests: an in-memory store that enforces the same guards as
//! the Postgres schema, and recording doubles for every collaborator.

#![allow(dead_code)]

pub mod fakes;
pub mod memory_store;

use std::sync::Arc;

use creator_settlement::{
    consumers::settlement::FulfilmentContext,
    models::{AvailabilityWindow, CreatorProfileEntity, Product, ProductType},
    services::{BookingService, Collaborators, Repositories, Services},
};
use uuid::Uuid;

#[allow(unused_imports)]
pub use fakes::{FakeCatalog, FakeEmail, FakeStorage, MockGateway, PayoutMode, RecordingSink};
#[allow(unused_imports)]
pub use memory_store::InMemoryStore;

pub const MIN_WITHDRAWAL: i64 = 10_000;
pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const KEY_SECRET: &str = "key_secret_test";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub catalog: Arc<FakeCatalog>,
    pub storage: Arc<FakeStorage>,
    pub email: Arc<FakeEmail>,
    pub sink: Arc<RecordingSink>,
    pub repos: Repositories,
    pub collaborators: Collaborators,
    pub services: Services,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::default());
        let gateway = Arc::new(MockGateway::new(KEY_SECRET));
        let catalog = Arc::new(FakeCatalog::default());
        let storage = Arc::new(FakeStorage);
        let email = Arc::new(FakeEmail::default());
        let sink = Arc::new(RecordingSink::default());

        let repos = Repositories {
            orders: store.clone(),
            subscriptions: store.clone(),
            ledger: store.clone(),
            payouts: store.clone(),
            bookings: store.clone(),
            coupons: store.clone(),
            profiles: store.clone(),
            subscribers: store.clone(),
        };
        let collaborators = Collaborators {
            catalog: catalog.clone(),
            gateway: gateway.clone(),
            storage: storage.clone(),
            email: email.clone(),
        };
        let services = Services::new(&repos, &collaborators, sink.clone(), MIN_WITHDRAWAL);

        Self {
            store,
            gateway,
            catalog,
            storage,
            email,
            sink,
            repos,
            collaborators,
            services,
        }
    }

    /// Context the background workers would run with, sharing this harness' doubles.
    pub fn fulfilment(&self) -> Arc<FulfilmentContext> {
        Arc::new(FulfilmentContext {
            catalog: self.collaborators.catalog.clone(),
            storage: self.collaborators.storage.clone(),
            email: self.collaborators.email.clone(),
            bookings: BookingService::new(
                self.repos.bookings.clone(),
                self.collaborators.catalog.clone(),
            ),
            subscribers: self.repos.subscribers.clone(),
        })
    }

    /// Registers a creator profile with an optional fee rate and no payout settings.
    pub fn add_creator(&self, platform_fee_rate: Option<f64>) -> Uuid {
        let creator_id = Uuid::new_v4();
        self.store.insert_profile(CreatorProfileEntity {
            creator_id,
            display_name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            platform_fee_rate,
            payout_holder_name: None,
            payout_account_masked: None,
            payout_ifsc: None,
            gateway_contact_id: None,
            gateway_fund_account_id: None,
            payout_verified: false,
            updated_at: chrono::Utc::now(),
        });
        creator_id
    }

    pub fn add_product(&self, product: Product) -> Product {
        self.catalog.insert(product.clone());
        product
    }
}

pub fn product(creator_id: Uuid, product_type: ProductType, price: i64) -> Product {
    Product {
        id: Uuid::new_v4(),
        creator_id,
        title: "Lightroom Presets".into(),
        price,
        product_type,
        is_visible: true,
        file_key: Some("products/presets.zip".into()),
        bump: None,
        duration_minutes: None,
        timezone: None,
        availability: vec![],
        cancellation_window_hours: None,
        subscription_interval: None,
    }
}

/// Coaching product open Mondays 09:00-10:00 UTC in 30 minute slots.
pub fn coaching(creator_id: Uuid, price: i64) -> Product {
    Product {
        title: "1:1 Coaching".into(),
        file_key: None,
        duration_minutes: Some(30),
        timezone: Some("UTC".into()),
        availability: vec![AvailabilityWindow {
            day_of_week: 1,
            start_time: "09:00".into(),
            end_time: "10:00".into(),
        }],
        ..product(creator_id, ProductType::Booking, price)
    }
}
