use crate::feed::config::FeedConfig;
use crate::feed::error::FeedError;
use crate::feed::listing_images::ListingImageRequest;
use crate::feed::types::FeedSubmission;
use crate::spapi::listings::ImageSlot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFeedRequest {
    pub feed_document_id: String,
    #[serde(default)]
    pub feed_type: Option<String>,
    #[serde(default)]
    pub marketplace_ids: Option<Vec<String>>,
}

impl SubmitFeedRequest {
    pub fn into_submission(self, config: &FeedConfig) -> Result<FeedSubmission, FeedError> {
        config.submission(
            &self.feed_document_id,
            self.feed_type.as_deref(),
            self.marketplace_ids,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingImageUpdateRequest {
    pub seller_id: String,
    pub sku: String,
    pub image_url: String,
    #[serde(default)]
    pub position: Option<ImagePosition>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub marketplace_id: Option<String>,
}

/// Accepts either a 1-based position or a slot name such as `"PT03"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImagePosition {
    Index(u8),
    Slot(ImageSlot),
}

impl ImagePosition {
    pub fn slot(&self) -> ImageSlot {
        match self {
            ImagePosition::Index(i) => ImageSlot::from_position(*i),
            ImagePosition::Slot(slot) => *slot,
        }
    }
}

impl ListingImageUpdateRequest {
    pub fn into_request(self, config: &FeedConfig) -> ListingImageRequest {
        let marketplace_id = self
            .marketplace_id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| config.marketplace_ids.first().cloned())
            .unwrap_or_default();
        ListingImageRequest {
            seller_id: self.seller_id,
            sku: self.sku,
            image_url: self.image_url,
            slot: self.position.map(|p| p.slot()).unwrap_or_default(),
            marketplace_id,
            product_type: self.product_type,
            operation: self.operation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
