//! Item store over the budget REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use sitebook_core::budget::{BudgetLineItem, NewBudgetLineItem};
use sitebook_shared::StoreConfig;
use sitebook_shared::types::{LineItemId, LocationId};
use tracing::debug;

use crate::error::StoreError;
use crate::store::ItemStore;

/// REST-backed item store.
///
/// - `GET    {base}/locations/{location}/budget-items`
/// - `POST   {base}/locations/{location}/budget-items`
/// - `PUT    {base}/budget-items/{item}`
/// - `DELETE {base}/budget-items/{item}`
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpStore {
    /// Creates a store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn location_items_url(&self, location_id: LocationId) -> String {
        format!("{}/locations/{location_id}/budget-items", self.base_url)
    }

    fn item_url(&self, item_id: LineItemId) -> String {
        format!("{}/budget-items/{item_id}", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(%method, url, "Item store request");
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(url));
        }
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ItemStore for HttpStore {
    async fn read(&self, location_id: LocationId) -> Result<Vec<BudgetLineItem>, StoreError> {
        let url = self.location_items_url(location_id);
        let response = self.request(Method::GET, &url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn write(
        &self,
        item_id: LineItemId,
        item: &BudgetLineItem,
    ) -> Result<BudgetLineItem, StoreError> {
        let url = self.item_url(item_id);
        let response = self.request(Method::PUT, &url).json(item).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create(
        &self,
        location_id: LocationId,
        item: NewBudgetLineItem,
    ) -> Result<BudgetLineItem, StoreError> {
        let url = self.location_items_url(location_id);
        let response = self.request(Method::POST, &url).json(&item).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, item_id: LineItemId) -> Result<(), StoreError> {
        let url = self.item_url(item_id);
        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check(response).await.map(|_| ())
    }
}
