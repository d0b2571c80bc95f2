use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use crate::{
    api::{ApiUrls, COLLABORATOR_TIMEOUT, CollaboratorError},
    app_error::StdResponse,
    models::Product,
};

const SERVICE: &str = "CatalogService";

/// Read-only view of the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, CollaboratorError>;
}

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(client: Client, urls: &ApiUrls) -> Self {
        Self {
            client,
            base_url: urls.catalog_service_url.clone(),
        }
    }
}

#[async_trait]
impl ProductCatalog for CatalogClient {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, CollaboratorError> {
        let res = self
            .client
            .get(format!("{}/products/{}", self.base_url, id))
            .timeout(COLLABORATOR_TIMEOUT)
            .send()
            .await
            .map_err(|err| CollaboratorError::unreachable(SERVICE, err))?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: res.status().as_u16(),
            });
        }

        let body: StdResponse<Product, String> = res
            .json()
            .await
            .map_err(|err| CollaboratorError::decode(SERVICE, err))?;

        Ok(body.data)
    }
}
