use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    CURRENCY, Collaborators, Repositories,
    bookings::slot_duration,
    coupons::CouponService,
    normalize_email,
    wallet::WalletService,
};
use crate::{
    api::{
        catalog::ProductCatalog,
        razorpay::PaymentGateway,
        uploads::{DOWNLOAD_URL_TTL, FileStorage},
    },
    app_error::AppError,
    models::{
        CreateEmailSubscriberEntity, CreateOrderEntity, CreateSubscriptionEntity, EntrySource,
        LineItem, LineItems, OrderEntity, OrderStatus, Product, ProductType, SubscriptionEntity,
        SubscriptionStatus, SubscriptionSync,
    },
    queue::{Task, TaskSink},
    store::{OrderRepository, ProfileRepository, SubscriptionRepository},
    webhooks::{SubscriptionEvent, SubscriptionEventKind},
};

/// Platform commission when the creator's profile does not set one.
pub const DEFAULT_PLATFORM_FEE_RATE: f64 = 5.0;
/// Billing cycles requested for a membership; effectively open-ended.
pub const SUBSCRIPTION_TOTAL_COUNT: i32 = 1200;

#[derive(Deserialize, Debug, ToSchema)]
pub struct NewOrder {
    pub product_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub bump_accepted: bool,
    /// RFC 3339 start of the requested slot, booking products only.
    #[serde(default)]
    pub booking_slot_start: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug)]
pub enum SettlementOutcome {
    /// This call moved the order to `paid` and ran the settlement side effects.
    Settled(OrderEntity),
    /// The order was paid before this call; nothing was done.
    AlreadySettled,
}

/// `floor(amount * rate / 100)` in paise.
pub fn platform_fee(amount: i64, rate: f64) -> i64 {
    ((amount as f64) * rate / 100.0).floor() as i64
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    profiles: Arc<dyn ProfileRepository>,
    catalog: Arc<dyn ProductCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    storage: Arc<dyn FileStorage>,
    wallet: WalletService,
    coupons: CouponService,
    tasks: Arc<dyn TaskSink>,
}

impl OrderService {
    pub fn new(
        repos: &Repositories,
        collaborators: &Collaborators,
        wallet: WalletService,
        coupons: CouponService,
        tasks: Arc<dyn TaskSink>,
    ) -> Self {
        Self {
            orders: repos.orders.clone(),
            subscriptions: repos.subscriptions.clone(),
            profiles: repos.profiles.clone(),
            catalog: collaborators.catalog.clone(),
            gateway: collaborators.gateway.clone(),
            storage: collaborators.storage.clone(),
            wallet,
            coupons,
            tasks,
        }
    }

    async fn product(&self, product_id: Uuid) -> Result<Product, AppError> {
        self.catalog
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("product".into()))
    }

    /// Bump line item, when the offer is configured, accepted and still valid.
    async fn bump_line_item(&self, product: &Product) -> Option<LineItem> {
        let bump = product.bump.as_ref()?;
        let bump_product = match self.catalog.find_by_id(bump.bump_product_id).await {
            Ok(Some(bump_product)) => bump_product,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(product_id = %product.id, error = %err, "Skipping order bump");
                return None;
            }
        };
        if !bump_product.is_visible || bump_product.creator_id != product.creator_id {
            return None;
        }

        let amount = if bump.bump_discount > 0 {
            (bump_product.price - bump.bump_discount).max(0)
        } else {
            bump_product.price
        };
        Some(LineItem {
            product_id: bump_product.id,
            title: format!("{} (Bump Offer)", bump_product.title),
            amount,
            product_type: bump_product.product_type,
        })
    }

    pub async fn create_order(&self, req: NewOrder) -> Result<OrderEntity, AppError> {
        let customer_name = req.customer_name.trim().to_string();
        let customer_email = normalize_email(&req.customer_email);
        if customer_name.is_empty() || customer_email.is_empty() {
            return Err(AppError::BadRequest(
                "customer_name and customer_email are required".into(),
            ));
        }

        let product = self.product(req.product_id).await?;

        let mut line_items = vec![LineItem {
            product_id: product.id,
            title: product.title.clone(),
            amount: product.price,
            product_type: product.product_type,
        }];
        if req.bump_accepted {
            if let Some(bump) = self.bump_line_item(&product).await {
                line_items.push(bump);
            }
        }
        let mut total: i64 = line_items.iter().map(|item| item.amount).sum();

        if total == 0 || product.product_type == ProductType::LeadMagnet {
            return self
                .create_free_order(product, line_items, customer_name, customer_email)
                .await;
        }

        let mut coupon_code = None;
        let mut coupon_id = None;
        let mut discount_amount = 0;
        if let Some(code) = req.coupon_code.as_deref().filter(|code| !code.trim().is_empty()) {
            let validation = self
                .coupons
                .validate(product.creator_id, code, product.id, total)
                .await?;
            if !validation.valid {
                return Err(AppError::BadRequest(
                    validation
                        .message
                        .unwrap_or_else(|| "coupon is not valid".into()),
                ));
            }
            discount_amount = validation.discount_amount;
            total -= discount_amount;
            coupon_code = Some(code.trim().to_uppercase());
            coupon_id = validation.coupon_id;
        }

        // Parsed before any gateway call so a bad slot never leaves an orphaned gateway order.
        let (booking_slot_start, booking_slot_end) = match (
            product.product_type,
            req.booking_slot_start.as_deref().filter(|s| !s.is_empty()),
        ) {
            (ProductType::Booking, Some(raw)) => {
                let start = DateTime::parse_from_rfc3339(raw)
                    .map_err(|_| {
                        AppError::BadRequest(
                            "invalid booking slot start format, expected RFC3339".into(),
                        )
                    })?
                    .with_timezone(&Utc);
                (Some(start), Some(start + slot_duration(&product)))
            }
            _ => (None, None),
        };

        let order_id = Uuid::new_v4();
        let gateway_order_id = if product.product_type == ProductType::Membership {
            self.open_subscription(&product, total, &customer_name, &customer_email)
                .await?
                .gateway_subscription_id
        } else {
            let receipt = format!("rcpt_{}", order_id.simple());
            self.gateway.create_order(total, CURRENCY, &receipt).await?
        };

        let order = self
            .orders
            .create(CreateOrderEntity {
                id: order_id,
                line_items: LineItems(line_items),
                booking_slot_start,
                booking_slot_end,
                creator_id: product.creator_id,
                customer_name,
                customer_email,
                amount: total,
                currency: CURRENCY.to_string(),
                coupon_code,
                coupon_id,
                discount_amount,
                gateway_order_id,
                status: OrderStatus::Created,
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            gateway_order_id = %order.gateway_order_id,
            amount = order.amount,
            "Order created"
        );
        Ok(order)
    }

    async fn create_free_order(
        &self,
        product: Product,
        line_items: Vec<LineItem>,
        customer_name: String,
        customer_email: String,
    ) -> Result<OrderEntity, AppError> {
        let id = Uuid::new_v4();
        let order = self
            .orders
            .create(CreateOrderEntity {
                id,
                line_items: LineItems(line_items),
                booking_slot_start: None,
                booking_slot_end: None,
                creator_id: product.creator_id,
                customer_name: customer_name.clone(),
                customer_email: customer_email.clone(),
                amount: 0,
                currency: CURRENCY.to_string(),
                coupon_code: None,
                coupon_id: None,
                discount_amount: 0,
                gateway_order_id: format!("free_{}", id.simple()),
                status: OrderStatus::Paid,
            })
            .await?;

        self.tasks
            .enqueue(Task::UpsertSubscriber(CreateEmailSubscriberEntity {
                id: Uuid::new_v4(),
                creator_id: product.creator_id,
                email: customer_email,
                name: customer_name,
                source_product_id: product.id,
                consent_given: true,
            }));
        self.tasks.enqueue(Task::SendConfirmation {
            order: order.clone(),
            product,
        });

        tracing::info!(order_id = %order.id, "Free order fulfilled without gateway");
        Ok(order)
    }

    async fn open_subscription(
        &self,
        product: &Product,
        amount: i64,
        customer_name: &str,
        customer_email: &str,
    ) -> Result<SubscriptionEntity, AppError> {
        let interval = product
            .subscription_interval
            .clone()
            .filter(|interval| !interval.is_empty())
            .unwrap_or_else(|| "monthly".into());

        let plan_id = self
            .gateway
            .create_plan(&product.title, amount, CURRENCY, &interval)
            .await?;
        let gateway_subscription_id = self
            .gateway
            .create_subscription(&plan_id, SUBSCRIPTION_TOTAL_COUNT)
            .await?;

        let sub = self
            .subscriptions
            .create(CreateSubscriptionEntity {
                id: Uuid::new_v4(),
                product_id: product.id,
                creator_id: product.creator_id,
                customer_email: customer_email.to_string(),
                customer_name: customer_name.to_string(),
                amount,
                currency: CURRENCY.to_string(),
                interval,
                gateway_plan_id: plan_id,
                gateway_subscription_id,
                status: SubscriptionStatus::Created,
                total_count: SUBSCRIPTION_TOTAL_COUNT,
            })
            .await?;
        Ok(sub)
    }

    /// Settles an order exactly once. Only the caller that wins the compare-and-set to `paid`
    /// credits the wallet; every later call returns [`SettlementOutcome::AlreadySettled`].
    pub async fn handle_payment_success(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Result<SettlementOutcome, AppError> {
        let order = self
            .orders
            .find_by_gateway_order_id(gateway_order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("order".into()))?;
        if order.status == OrderStatus::Paid {
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let Some(order) = self
            .orders
            .mark_paid(gateway_order_id, gateway_payment_id)
            .await?
        else {
            return Ok(SettlementOutcome::AlreadySettled);
        };

        // From here on the payment is captured and the order is paid. Nothing below may fail the
        // call, or a redelivery would find the order settled and skip the credit for good.
        let rate = self.fee_rate(order.creator_id).await;
        let fee = platform_fee(order.amount, rate);
        let net = order.amount - fee;

        if fee > 0 {
            if let Err(err) = self.orders.update_platform_fee(order.id, fee).await {
                tracing::error!(order_id = %order.id, fee, error = %err, "Failed to record platform fee");
            }
        }

        if net > 0 {
            let credited = self
                .wallet
                .credit(
                    order.creator_id,
                    net,
                    format!("Order payment via {gateway_payment_id} (net after {rate:.1}% fee)"),
                    order.id.to_string(),
                    EntrySource::Order,
                )
                .await;
            if let Err(err) = credited {
                tracing::error!(
                    critical = true,
                    order_id = %order.id,
                    creator_id = %order.creator_id,
                    net,
                    error = %err,
                    "Wallet credit failed after payment capture"
                );
            }
        }

        if let Some(coupon_id) = order.coupon_id {
            if let Err(err) = self.coupons.increment_usage(coupon_id).await {
                tracing::error!(order_id = %order.id, %coupon_id, error = %err, "Failed to count coupon usage");
            }
        }

        tracing::info!(order_id = %order.id, amount = order.amount, fee, net, "Order settled");
        self.tasks.enqueue(Task::FulfilPaidOrder {
            order: order.clone(),
        });
        Ok(SettlementOutcome::Settled(order))
    }

    async fn fee_rate(&self, creator_id: Uuid) -> f64 {
        match self.profiles.find_by_creator_id(creator_id).await {
            Ok(profile) => profile
                .and_then(|profile| profile.platform_fee_rate)
                .filter(|rate| *rate > 0.0)
                .unwrap_or(DEFAULT_PLATFORM_FEE_RATE),
            Err(err) => {
                tracing::warn!(%creator_id, error = %err, "Falling back to default platform fee rate");
                DEFAULT_PLATFORM_FEE_RATE
            }
        }
    }

    pub async fn handle_subscription_event(
        &self,
        event: SubscriptionEvent,
    ) -> Result<SubscriptionEntity, AppError> {
        let sub = self
            .subscriptions
            .find_by_gateway_id(&event.gateway_subscription_id)
            .await?
            .ok_or_else(|| AppError::NotFound("subscription".into()))?;

        let sub = self
            .subscriptions
            .sync(
                sub.id,
                SubscriptionSync {
                    status: event.status,
                    paid_count: event.paid_count,
                    current_start: event.current_start,
                    current_end: event.current_end,
                },
            )
            .await?;
        tracing::info!(
            subscription_id = %sub.id,
            status = %sub.status,
            paid_count = sub.paid_count,
            "Subscription synced"
        );

        // The first charge settles the order opened alongside the subscription.
        if event.kind == SubscriptionEventKind::Charged && sub.paid_count == 1 {
            if let Some(payment_id) = event.gateway_payment_id.as_deref() {
                if let Err(err) = self
                    .handle_payment_success(&sub.gateway_subscription_id, payment_id)
                    .await
                {
                    tracing::error!(
                        subscription_id = %sub.id,
                        error = %err,
                        "Failed to settle the subscription's first charge"
                    );
                }
            }
        }

        Ok(sub)
    }

    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        requester_email: &str,
    ) -> Result<SubscriptionEntity, AppError> {
        let sub = self
            .subscriptions
            .find_by_id(subscription_id)
            .await?
            .ok_or_else(|| AppError::NotFound("subscription".into()))?;
        if !sub.customer_email.eq_ignore_ascii_case(requester_email) {
            return Err(AppError::Unauthorized(
                "unauthorized to cancel this subscription".into(),
            ));
        }
        if sub.status.is_terminal() {
            return Err(AppError::AlreadyCancelled("subscription"));
        }

        self.gateway
            .cancel_subscription(&sub.gateway_subscription_id)
            .await?;
        self.subscriptions
            .update_status(sub.id, SubscriptionStatus::Cancelled)
            .await?;

        tracing::info!(%subscription_id, "Subscription cancelled");
        Ok(SubscriptionEntity {
            status: SubscriptionStatus::Cancelled,
            ..sub
        })
    }

    pub async fn get_order_download_url(
        &self,
        order_id: Uuid,
        product_id: Option<Uuid>,
    ) -> Result<String, AppError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("order".into()))?;
        if order.status != OrderStatus::Paid {
            return Err(AppError::ForbiddenResource("order is not paid".into()));
        }

        let product_id = match product_id {
            Some(product_id) if order.contains_product(product_id) => product_id,
            Some(_) => {
                return Err(AppError::ForbiddenResource(
                    "product is not part of this order".into(),
                ));
            }
            None => order
                .primary_product_id()
                .ok_or_else(|| AppError::NotFound("product".into()))?,
        };

        let product = self.product(product_id).await?;
        let file_key = product
            .file_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::NotFound("product file".into()))?;

        Ok(self
            .storage
            .presign_download(&file_key, DOWNLOAD_URL_TTL)
            .await?)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderEntity, AppError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("order".into()))
    }

    pub async fn get_creator_orders(&self, creator_id: Uuid) -> Result<Vec<OrderEntity>, AppError> {
        Ok(self.orders.find_all_by_creator_id(creator_id).await?)
    }

    pub async fn get_buyer_orders(&self, email: &str) -> Result<Vec<OrderEntity>, AppError> {
        Ok(self
            .orders
            .find_paid_by_customer_email(&normalize_email(email))
            .await?)
    }

    pub async fn get_buyer_subscriptions(
        &self,
        email: &str,
    ) -> Result<Vec<SubscriptionEntity>, AppError> {
        Ok(self
            .subscriptions
            .find_all_by_customer_email(&normalize_email(email))
            .await?)
    }
}
