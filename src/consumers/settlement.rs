use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tracing::info;

use crate::{
    api::{
        catalog::ProductCatalog,
        notifications::EmailSender,
        uploads::{DOWNLOAD_URL_TTL, FileStorage},
    },
    models::{CreateEmailSubscriberEntity, OrderEntity, Product, ProductType},
    queue::Task,
    services::{BookingService, bookings::NewBooking, normalize_email},
    store::SubscriberRepository,
};

/// Everything the background tasks touch. Built once at startup and shared by every worker.
pub struct FulfilmentContext {
    pub catalog: Arc<dyn ProductCatalog>,
    pub storage: Arc<dyn FileStorage>,
    pub email: Arc<dyn EmailSender>,
    pub bookings: BookingService,
    pub subscribers: Arc<dyn SubscriberRepository>,
}

pub fn dispatch(task: Task, ctx: Arc<FulfilmentContext>) -> BoxFuture<'static, Result<()>> {
    match task {
        Task::UpsertSubscriber(subscriber) => upsert_subscriber(subscriber, ctx),
        Task::SendConfirmation { order, product } => send_confirmation(order, product, ctx),
        Task::FulfilPaidOrder { order } => fulfil_paid_order(order, ctx),
    }
}

pub fn upsert_subscriber(
    mut subscriber: CreateEmailSubscriberEntity,
    ctx: Arc<FulfilmentContext>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        subscriber.email = normalize_email(&subscriber.email);
        let creator_id = subscriber.creator_id;
        ctx.subscribers
            .upsert(subscriber)
            .await
            .context("Failed to add email subscriber")?;

        info!(%creator_id, "Email subscriber added");
        Ok(())
    })
}

pub fn send_confirmation(
    order: OrderEntity,
    product: Product,
    ctx: Arc<FulfilmentContext>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let download_url = download_url(&ctx, &product).await;
        ctx.email
            .send_order_confirmation(&order, &product, &download_url)
            .await
            .context("Failed to send order confirmation")?;

        info!(order_id = %order.id, "Order confirmation sent");
        Ok(())
    })
}

/// Post-settlement work for a paid order: reserve the booked slot, mint a download link and email
/// the buyer. A lost slot is logged and the email still goes out.
pub fn fulfil_paid_order(
    order: OrderEntity,
    ctx: Arc<FulfilmentContext>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let product_id = order
            .primary_product_id()
            .context("Paid order has no line items")?;
        let product = ctx
            .catalog
            .find_by_id(product_id)
            .await
            .context("Failed to load product for fulfilment")?
            .with_context(|| format!("Product {product_id} no longer exists"))?;

        if product.product_type == ProductType::Booking {
            if let (Some(slot_start), Some(slot_end)) =
                (order.booking_slot_start, order.booking_slot_end)
            {
                let booking = ctx
                    .bookings
                    .create_booking(NewBooking {
                        product_id: product.id,
                        creator_id: product.creator_id,
                        order_id: order.id,
                        buyer_email: order.customer_email.clone(),
                        buyer_name: order.customer_name.clone(),
                        slot_start,
                        slot_end,
                        meeting_link: None,
                    })
                    .await;
                if let Err(err) = booking {
                    tracing::error!(
                        order_id = %order.id,
                        %slot_start,
                        error = %err,
                        "Failed to book the paid slot"
                    );
                }
            }
        }

        let download_url = download_url(&ctx, &product).await;
        ctx.email
            .send_order_confirmation(&order, &product, &download_url)
            .await
            .context("Failed to send order confirmation")?;

        info!(order_id = %order.id, "Paid order fulfilled");
        Ok(())
    })
}

/// Presigned link to the product file, or `#` when there is none to give.
async fn download_url(ctx: &FulfilmentContext, product: &Product) -> String {
    let Some(key) = product.file_key.as_deref().filter(|key| !key.is_empty()) else {
        return "#".to_string();
    };
    match ctx.storage.presign_download(key, DOWNLOAD_URL_TTL).await {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(product_id = %product.id, error = %err, "Failed to presign download");
            "#".to_string()
        }
    }
}
