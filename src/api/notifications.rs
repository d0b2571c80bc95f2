use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::{ApiUrls, COLLABORATOR_TIMEOUT, CollaboratorError},
    models::{LineItem, OrderEntity, Product},
};

const SERVICE: &str = "NotificationService";

/// Outbound transactional email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_order_confirmation(
        &self,
        order: &OrderEntity,
        product: &Product,
        download_url: &str,
    ) -> Result<(), CollaboratorError>;
}

#[derive(Serialize)]
struct OrderConfirmationReq<'a> {
    to: &'a str,
    customer_name: &'a str,
    order_id: Uuid,
    product_title: &'a str,
    line_items: &'a [LineItem],
    amount: i64,
    currency: &'a str,
    download_url: &'a str,
}

#[derive(Clone)]
pub struct NotificationClient {
    client: Client,
    base_url: String,
}

impl NotificationClient {
    pub fn new(client: Client, urls: &ApiUrls) -> Self {
        Self {
            client,
            base_url: urls.notification_service_url.clone(),
        }
    }
}

#[async_trait]
impl EmailSender for NotificationClient {
    async fn send_order_confirmation(
        &self,
        order: &OrderEntity,
        product: &Product,
        download_url: &str,
    ) -> Result<(), CollaboratorError> {
        let res = self
            .client
            .post(format!("{}/emails/order-confirmation", self.base_url))
            .timeout(COLLABORATOR_TIMEOUT)
            .json(&OrderConfirmationReq {
                to: &order.customer_email,
                customer_name: &order.customer_name,
                order_id: order.id,
                product_title: &product.title,
                line_items: &order.line_items.0,
                amount: order.amount,
                currency: &order.currency,
                download_url,
            })
            .send()
            .await
            .map_err(|err| CollaboratorError::unreachable(SERVICE, err))?;

        if !res.status().is_success() {
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: res.status().as_u16(),
            });
        }
        Ok(())
    }
}
