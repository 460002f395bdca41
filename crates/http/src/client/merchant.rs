//! Merchant API client methods

use super::{ApiClient, ClientError, RequestDescriptor};
use crate::types::{CreateMerchantRequest, Merchant, MerchantPage};

/// `/merchant/:id` with `id` encoded as a single path segment
pub(crate) fn merchant_path(id: &str) -> Result<String, ClientError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(ClientError::BadRequest(format!("invalid merchant id '{id}'")));
    }
    Ok(format!("/merchant/{}", urlencoding::encode(id)))
}

impl ApiClient {
    /// List merchants visible to the current session, one page at a time
    pub async fn list_merchants(&self, page: u32, limit: u32) -> Result<MerchantPage, ClientError> {
        let request = RequestDescriptor::get("/merchant")
            .query("page", page)
            .query("limit", limit);
        self.request(request).await
    }

    /// Get a single merchant
    pub async fn merchant(&self, id: &str) -> Result<Merchant, ClientError> {
        self.request(RequestDescriptor::get(merchant_path(id)?))
            .await
    }

    /// Create a merchant
    pub async fn create_merchant(
        &self,
        name: impl Into<String>,
        webhook_url: Option<String>,
    ) -> Result<Merchant, ClientError> {
        let body = serde_json::to_value(CreateMerchantRequest {
            name: name.into(),
            webhook_url: webhook_url.filter(|url| !url.is_empty()),
        })?;
        self.request(RequestDescriptor::post("/merchant").body(body))
            .await
    }
}
