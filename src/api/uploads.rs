use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    api::{ApiUrls, COLLABORATOR_TIMEOUT, CollaboratorError},
    app_error::StdResponse,
};

const SERVICE: &str = "UploadService";

/// How long a minted download link stays valid.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Object storage behind the upload service. Keys are opaque to this service.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, CollaboratorError>;
}

#[derive(Serialize)]
struct PresignReq<'a> {
    key: &'a str,
    ttl_seconds: u64,
}

#[derive(Deserialize)]
struct PresignRes {
    url: String,
}

#[derive(Clone)]
pub struct UploadClient {
    client: Client,
    base_url: String,
}

impl UploadClient {
    pub fn new(client: Client, urls: &ApiUrls) -> Self {
        Self {
            client,
            base_url: urls.upload_service_url.clone(),
        }
    }
}

#[async_trait]
impl FileStorage for UploadClient {
    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, CollaboratorError> {
        let res = self
            .client
            .post(format!("{}/presign/download", self.base_url))
            .timeout(COLLABORATOR_TIMEOUT)
            .json(&PresignReq {
                key,
                ttl_seconds: ttl.as_secs(),
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

        let body: StdResponse<PresignRes, String> = res
            .json()
            .await
            .map_err(|err| CollaboratorError::decode(SERVICE, err))?;

        body.data
            .map(|presigned| presigned.url)
            .ok_or(CollaboratorError::Decode {
                service: SERVICE,
                reason: "missing presigned url".into(),
            })
    }
}
