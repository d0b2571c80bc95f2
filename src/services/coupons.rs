use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app_error::AppError,
    models::{CouponEntity, CreateCouponEntity, DiscountType, UpdateCouponEntity},
    store::{CouponRepository, StoreError},
};

/// Smallest amount a discounted order may still cost, in paise.
pub const MIN_PAYABLE: i64 = 100;

#[derive(Deserialize, Debug, ToSchema)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(default)]
    pub min_order_amount: i64,
    /// 0 means unlimited.
    #[serde(default)]
    pub max_uses: i64,
    #[serde(default)]
    pub applicable_product_ids: Vec<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct CouponValidation {
    pub valid: bool,
    pub discount_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    pub coupon_id: Option<Uuid>,
}

impl CouponValidation {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount_amount: 0,
            message: Some(message.into()),
            coupon_id: None,
        }
    }
}

/// Checks everything except existence: active flag, expiry, usage cap, minimum and allowlist.
pub fn check_eligibility(
    coupon: &CouponEntity,
    product_id: Uuid,
    order_amount: i64,
    now: DateTime<Utc>,
) -> Result<(), String> {
    if !coupon.is_active {
        return Err("Coupon not found or inactive".into());
    }
    if coupon.expires_at.is_some_and(|expires_at| now > expires_at) {
        return Err("Coupon has expired".into());
    }
    if coupon.max_uses > 0 && coupon.times_used >= coupon.max_uses {
        return Err("Coupon usage limit reached".into());
    }
    if coupon.min_order_amount > 0 && order_amount < coupon.min_order_amount {
        return Err(format!(
            "Minimum order amount is ₹{:.2}",
            coupon.min_order_amount as f64 / 100.0
        ));
    }
    if !coupon.applicable_product_ids.is_empty()
        && !coupon.applicable_product_ids.contains(&product_id)
    {
        return Err("Coupon is not applicable to this product".into());
    }
    Ok(())
}

/// Discount in paise, capped so that at least [`MIN_PAYABLE`] remains to be paid.
pub fn compute_discount(discount_type: DiscountType, discount_value: i64, order_amount: i64) -> i64 {
    let raw = match discount_type {
        DiscountType::Percentage => {
            (i128::from(order_amount) * i128::from(discount_value) / 100) as i64
        }
        DiscountType::Fixed => discount_value,
    };
    let cap = (order_amount - MIN_PAYABLE).max(0);
    raw.clamp(0, cap)
}

#[derive(Clone)]
pub struct CouponService {
    coupons: Arc<dyn CouponRepository>,
}

impl CouponService {
    pub fn new(coupons: Arc<dyn CouponRepository>) -> Self {
        Self { coupons }
    }

    pub async fn validate(
        &self,
        creator_id: Uuid,
        code: &str,
        product_id: Uuid,
        order_amount: i64,
    ) -> Result<CouponValidation, AppError> {
        let code = code.trim().to_uppercase();
        let Some(coupon) = self.coupons.find_by_code(creator_id, &code).await? else {
            return Ok(CouponValidation::rejected("Coupon not found or inactive"));
        };

        if let Err(message) = check_eligibility(&coupon, product_id, order_amount, Utc::now()) {
            return Ok(CouponValidation::rejected(message));
        }

        Ok(CouponValidation {
            valid: true,
            discount_amount: compute_discount(
                coupon.discount_type,
                coupon.discount_value,
                order_amount,
            ),
            message: None,
            coupon_id: Some(coupon.id),
        })
    }

    pub async fn increment_usage(&self, coupon_id: Uuid) -> Result<(), AppError> {
        Ok(self.coupons.increment_usage(coupon_id).await?)
    }

    pub async fn create(&self, creator_id: Uuid, req: NewCoupon) -> Result<CouponEntity, AppError> {
        let code = req.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(AppError::BadRequest("coupon code is required".into()));
        }
        if req.discount_value <= 0 {
            return Err(AppError::BadRequest("discount_value must be positive".into()));
        }
        if req.discount_type == DiscountType::Percentage && req.discount_value > 100 {
            return Err(AppError::BadRequest(
                "percentage discount cannot exceed 100".into(),
            ));
        }
        if req.min_order_amount < 0 || req.max_uses < 0 {
            return Err(AppError::BadRequest(
                "min_order_amount and max_uses cannot be negative".into(),
            ));
        }

        if self.coupons.find_by_code(creator_id, &code).await?.is_some() {
            return Err(AppError::DuplicateCoupon(code));
        }

        let created = self
            .coupons
            .create(CreateCouponEntity {
                id: Uuid::new_v4(),
                creator_id,
                code: code.clone(),
                discount_type: req.discount_type,
                discount_value: req.discount_value,
                min_order_amount: req.min_order_amount,
                max_uses: req.max_uses,
                applicable_product_ids: req.applicable_product_ids,
                is_active: true,
                expires_at: req.expires_at,
            })
            .await;

        match created {
            Ok(coupon) => Ok(coupon),
            Err(StoreError::Conflict(_)) => Err(AppError::DuplicateCoupon(code)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list(&self, creator_id: Uuid) -> Result<Vec<CouponEntity>, AppError> {
        Ok(self.coupons.find_all_by_creator_id(creator_id).await?)
    }

    pub async fn update(
        &self,
        coupon_id: Uuid,
        creator_id: Uuid,
        changes: UpdateCouponEntity,
    ) -> Result<CouponEntity, AppError> {
        let coupon = self.owned_coupon(coupon_id, creator_id).await?;

        if changes.max_uses.is_some_and(|max_uses| max_uses < 0) {
            return Err(AppError::BadRequest("max_uses cannot be negative".into()));
        }
        if changes.is_active.is_none() && changes.max_uses.is_none() && changes.expires_at.is_none()
        {
            return Ok(coupon);
        }

        Ok(self.coupons.update(coupon_id, changes).await?)
    }

    /// Soft delete: the coupon stays for order history but stops validating.
    pub async fn deactivate(&self, coupon_id: Uuid, creator_id: Uuid) -> Result<CouponEntity, AppError> {
        self.owned_coupon(coupon_id, creator_id).await?;
        let changes = UpdateCouponEntity {
            is_active: Some(false),
            ..Default::default()
        };
        Ok(self.coupons.update(coupon_id, changes).await?)
    }

    async fn owned_coupon(&self, coupon_id: Uuid, creator_id: Uuid) -> Result<CouponEntity, AppError> {
        let coupon = self
            .coupons
            .find_by_id(coupon_id)
            .await?
            .ok_or_else(|| AppError::NotFound("coupon".into()))?;
        if coupon.creator_id != creator_id {
            return Err(AppError::ForbiddenResource(
                "coupon belongs to another creator".into(),
            ));
        }
        Ok(coupon)
    }
}
