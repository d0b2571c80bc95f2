//! Caller identity as asserted by the identity proxy in front of this service.
//!
//! The proxy verifies the session and forwards the caller as plain headers; these layers only
//! parse them and reject requests that arrive without one. Buyer emails are lower-cased here so
//! they match what checkout stored.

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use crate::{app_error::AppError, services::normalize_email};

pub const CREATOR_ID_HEADER: &str = "x-creator-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Authenticated creator, inserted as a request extension by [`creators_authorization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatorId(pub Uuid);

/// Authenticated buyer, inserted as a request extension by [`buyers_authorization`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerEmail(pub String);

fn header<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub async fn creators_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let creator_id = header(&req, CREATOR_ID_HEADER)
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or(AppError::Unauthenticated(CREATOR_ID_HEADER))?;

    req.extensions_mut().insert(CreatorId(creator_id));
    Ok(next.run(req).await)
}

pub async fn buyers_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let email = header(&req, USER_EMAIL_HEADER)
        .filter(|value| value.contains('@'))
        .map(normalize_email)
        .ok_or(AppError::Unauthenticated(USER_EMAIL_HEADER))?;

    req.extensions_mut().insert(BuyerEmail(email));
    Ok(next.run(req).await)
}
