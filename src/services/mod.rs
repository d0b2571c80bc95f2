pub mod bookings;
pub mod coupons;
pub mod orders;
pub mod payouts;
pub mod wallet;

use std::sync::Arc;

use crate::{
    api::{
        catalog::ProductCatalog, notifications::EmailSender, razorpay::PaymentGateway,
        uploads::FileStorage,
    },
    queue::TaskSink,
    store::{
        BookingRepository, CouponRepository, LedgerRepository, OrderRepository, PayoutRepository,
        PgStore, ProfileRepository, SubscriberRepository, SubscriptionRepository,
    },
};

pub use bookings::BookingService;
pub use coupons::CouponService;
pub use orders::OrderService;
pub use payouts::PayoutService;
pub use wallet::WalletService;

/// Currency every order and payout is denominated in.
pub const CURRENCY: &str = "INR";

/// Buyer emails are stored and looked up trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub payouts: Arc<dyn PayoutRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub subscribers: Arc<dyn SubscriberRepository>,
}

impl Repositories {
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            orders: store.clone(),
            subscriptions: store.clone(),
            ledger: store.clone(),
            payouts: store.clone(),
            bookings: store.clone(),
            coupons: store.clone(),
            profiles: store.clone(),
            subscribers: store,
        }
    }
}

/// Clients for everything outside this service.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn ProductCatalog>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub storage: Arc<dyn FileStorage>,
    pub email: Arc<dyn EmailSender>,
}

#[derive(Clone)]
pub struct Services {
    pub orders: OrderService,
    pub wallet: WalletService,
    pub payouts: PayoutService,
    pub bookings: BookingService,
    pub coupons: CouponService,
}

impl Services {
    pub fn new(
        repos: &Repositories,
        collaborators: &Collaborators,
        tasks: Arc<dyn TaskSink>,
        min_withdrawal: i64,
    ) -> Self {
        let wallet = WalletService::new(repos.ledger.clone());
        let coupons = CouponService::new(repos.coupons.clone());
        let bookings = BookingService::new(repos.bookings.clone(), collaborators.catalog.clone());
        let orders = OrderService::new(
            repos,
            collaborators,
            wallet.clone(),
            coupons.clone(),
            tasks,
        );
        let payouts = PayoutService::new(
            repos,
            collaborators.gateway.clone(),
            wallet.clone(),
            min_withdrawal,
        );

        Self {
            orders,
            wallet,
            payouts,
            bookings,
            coupons,
        }
    }
}
