#![allow(dead_code)]

use crate::spapi::ApiFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const LISTINGS_API_VERSION: &str = "2021-08-01";
pub const DEFAULT_OPERATION: &str = "PARTIAL_UPDATE";

#[async_trait]
pub trait ListingsApi: Send + Sync {
    async fn get_product_type(
        &self,
        access_token: &str,
        seller_id: &str,
        sku: &str,
        marketplace_id: &str,
    ) -> Result<String, ApiFailure>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListingItemResponse {
    #[serde(default)]
    pub summaries: Vec<ListingSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListingSummary {
    #[serde(default)]
    pub product_type: Option<String>,
}

impl ListingItemResponse {
    pub fn product_type(&self) -> Option<&str> {
        self.summaries
            .first()
            .and_then(|s| s.product_type.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Image variant slot on a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageSlot {
    #[default]
    Main,
    Pt01,
    Pt02,
    Pt03,
    Pt04,
    Pt05,
    Pt06,
    Pt07,
}

impl ImageSlot {
    /// Position 1 is MAIN, 2..=8 map to PT01..PT07. Anything else is MAIN.
    pub fn from_position(position: u8) -> Self {
        match position {
            2 => ImageSlot::Pt01,
            3 => ImageSlot::Pt02,
            4 => ImageSlot::Pt03,
            5 => ImageSlot::Pt04,
            6 => ImageSlot::Pt05,
            7 => ImageSlot::Pt06,
            8 => ImageSlot::Pt07,
            _ => ImageSlot::Main,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ImageSlot::Main => "MAIN",
            ImageSlot::Pt01 => "PT01",
            ImageSlot::Pt02 => "PT02",
            ImageSlot::Pt03 => "PT03",
            ImageSlot::Pt04 => "PT04",
            ImageSlot::Pt05 => "PT05",
            ImageSlot::Pt06 => "PT06",
            ImageSlot::Pt07 => "PT07",
        }
    }
}

/// `JSON_LISTINGS_FEED` document replacing one image slot on one SKU.
#[derive(Debug, Clone, Serialize)]
pub struct ListingImageFeed {
    pub header: FeedHeader,
    pub messages: Vec<ListingImageMessage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedHeader {
    pub version: &'static str,
    pub seller_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingImageMessage {
    pub message_id: u32,
    pub sku: String,
    pub operation_type: String,
    pub product_type: String,
    pub images: Vec<MarketplaceImages>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceImages {
    pub marketplace_id: String,
    pub images: Vec<ImageLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageLink {
    pub variant: ImageSlot,
    pub link: String,
}

#[derive(Debug, Clone)]
pub struct ListingImageUpdate {
    pub seller_id: String,
    pub sku: String,
    pub product_type: String,
    pub operation: Option<String>,
    pub marketplace_id: String,
    pub slot: ImageSlot,
    pub image_url: String,
}

impl ListingImageFeed {
    pub fn build(update: &ListingImageUpdate) -> Self {
        let operation = update
            .operation
            .as_deref()
            .filter(|op| !op.trim().is_empty())
            .unwrap_or(DEFAULT_OPERATION)
            .to_uppercase();
        Self {
            header: FeedHeader {
                version: "2.0",
                seller_id: update.seller_id.clone(),
            },
            messages: vec![ListingImageMessage {
                message_id: 1,
                sku: update.sku.clone(),
                operation_type: operation,
                product_type: update.product_type.clone(),
                images: vec![MarketplaceImages {
                    marketplace_id: update.marketplace_id.clone(),
                    images: vec![ImageLink {
                        variant: update.slot,
                        link: update.image_url.clone(),
                    }],
                }],
            }],
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
