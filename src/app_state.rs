use std::sync::Arc;

use crate::{api::razorpay::PaymentGateway, services::Services};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Verifies client-submitted checkout signatures.
    pub gateway: Arc<dyn PaymentGateway>,
    pub webhook_secret: Arc<str>,
}
