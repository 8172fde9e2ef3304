//! Feeds API 2021-06-30: feed creation, status reads and result documents.

use crate::feed::types::FeedJob;
use crate::spapi::ApiFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const FEEDS_API_VERSION: &str = "2021-06-30";

/// Body of `POST /feeds/2021-06-30/feeds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedSpecification {
    pub feed_type: String,
    pub marketplace_ids: Vec<String>,
    pub input_feed_document_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFeedResponse {
    pub feed_id: String,
}

/// Response of `GET /feeds/2021-06-30/documents/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocumentInfo {
    #[serde(default)]
    pub feed_document_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub compression_algorithm: Option<String>,
}

#[async_trait]
pub trait FeedsApi: Send + Sync {
    /// Returns the service-assigned feed id.
    async fn create_feed(
        &self,
        access_token: &str,
        spec: &CreateFeedSpecification,
    ) -> Result<String, ApiFailure>;

    async fn get_feed(&self, access_token: &str, feed_id: &str) -> Result<FeedJob, ApiFailure>;

    async fn get_feed_document(
        &self,
        access_token: &str,
        feed_document_id: &str,
    ) -> Result<FeedDocumentInfo, ApiFailure>;

    /// Unauthenticated GET of a pre-signed document URL.
    async fn download_document(&self, url: &str) -> Result<Vec<u8>, ApiFailure>;
}
