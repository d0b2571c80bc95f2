pub mod catalog;
pub mod notifications;
pub mod razorpay;
pub mod uploads;

use std::time::Duration;

/// Upper bound for calls to sibling services.
pub const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ApiUrls {
    pub catalog_service_url: String,
    pub upload_service_url: String,
    pub notification_service_url: String,
}

impl ApiUrls {
    pub fn init() -> Self {
        Self {
            catalog_service_url: Self::get_catalog_service_url(),
            upload_service_url: Self::get_upload_service_url(),
            notification_service_url: Self::get_notification_service_url(),
        }
    }

    pub fn get_catalog_service_url() -> String {
        std::env::var("CATALOG_SERVICE_URL")
            .unwrap_or("http://localhost:3000/catalog-service".to_string())
    }

    pub fn get_upload_service_url() -> String {
        std::env::var("UPLOAD_SERVICE_URL")
            .unwrap_or("http://localhost:3000/upload-service".to_string())
    }

    pub fn get_notification_service_url() -> String {
        std::env::var("NOTIFICATION_SERVICE_URL")
            .unwrap_or("http://localhost:3000/notification-service".to_string())
    }
}

/// Failure talking to a sibling service (catalog, uploads, notifications).
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{service} is unreachable: {reason}")]
    Unreachable {
        service: &'static str,
        reason: String,
    },

    #[error("{service} responded with status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned an unexpected body: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },
}

impl CollaboratorError {
    pub(crate) fn unreachable(service: &'static str, err: reqwest::Error) -> Self {
        Self::Unreachable {
            service,
            reason: err.to_string(),
        }
    }

    pub(crate) fn decode(service: &'static str, err: reqwest::Error) -> Self {
        Self::Decode {
            service,
            reason: err.to_string(),
        }
    }
}
