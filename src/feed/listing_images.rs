use crate::feed::config::PollPolicy;
use crate::feed::error::FeedError;
use crate::feed::orchestrator::{FeedOrchestrator, ensure_active};
use crate::feed::types::{FeedOutcome, FeedSubmission, JSON_LISTINGS_FEED};
use crate::spapi::documents::JSON_FEED_CONTENT_TYPE;
use crate::spapi::listings::{ImageSlot, ListingImageFeed, ListingImageUpdate, ListingsApi};
use crate::spapi::TokenSource;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ListingImageRequest {
    pub seller_id: String,
    pub sku: String,
    pub image_url: String,
    pub slot: ImageSlot,
    pub marketplace_id: String,
    pub product_type: Option<String>,
    pub operation: Option<String>,
}

/// Replaces one image slot on a listing through a `JSON_LISTINGS_FEED`.
#[derive(Clone)]
pub struct ListingImageWorkflow {
    orchestrator: FeedOrchestrator,
    listings: Arc<dyn ListingsApi>,
    tokens: Arc<dyn TokenSource>,
}

impl ListingImageWorkflow {
    pub fn new(
        orchestrator: FeedOrchestrator,
        listings: Arc<dyn ListingsApi>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            orchestrator,
            listings,
            tokens,
        }
    }

    pub fn with_orchestrator(&self, orchestrator: FeedOrchestrator) -> Self {
        Self {
            orchestrator,
            ..self.clone()
        }
    }

    async fn resolve_product_type(&self, request: &ListingImageRequest) -> Result<String, FeedError> {
        if let Some(product_type) = request
            .product_type
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            return Ok(product_type.to_string());
        }
        let token = self.tokens.access_token().await?;
        let product_type = self
            .listings
            .get_product_type(&token, &request.seller_id, &request.sku, &request.marketplace_id)
            .await
            .map_err(FeedError::ListingLookup)?;
        info!(
            target = "spapi.listings",
            sku = %request.sku,
            product_type = %product_type,
            "resolved listing product type"
        );
        Ok(product_type)
    }

    pub fn validate(request: &ListingImageRequest) -> Result<(), FeedError> {
        for (name, value) in [
            ("seller_id", &request.seller_id),
            ("sku", &request.sku),
            ("marketplace_id", &request.marketplace_id),
        ] {
            if value.trim().is_empty() {
                return Err(FeedError::invalid_input(format!("{name} must not be empty")));
            }
        }
        if !(request.image_url.starts_with("https://") || request.image_url.starts_with("http://")) {
            return Err(FeedError::invalid_input("image_url must be an http(s) url"));
        }
        Ok(())
    }

    /// Nothing is uploaded or submitted once `cancel` has fired.
    pub async fn run(
        &self,
        request: &ListingImageRequest,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<FeedOutcome, FeedError> {
        Self::validate(request)?;
        policy.validate()?;
        ensure_active(cancel, "listing lookup")?;
        let product_type = self.resolve_product_type(request).await?;
        let feed = ListingImageFeed::build(&ListingImageUpdate {
            seller_id: request.seller_id.clone(),
            sku: request.sku.clone(),
            product_type,
            operation: request.operation.clone(),
            marketplace_id: request.marketplace_id.clone(),
            slot: request.slot,
            image_url: request.image_url.clone(),
        });
        let bytes = feed
            .to_bytes()
            .map_err(|err| FeedError::invalid_input(format!("feed serialization: {err}")))?;
        ensure_active(cancel, "document upload")?;
        let document_id = self
            .orchestrator
            .upload_feed_document(JSON_FEED_CONTENT_TYPE, bytes)
            .await?;
        let submission = FeedSubmission::new(
            document_id,
            JSON_LISTINGS_FEED,
            vec![request.marketplace_id.clone()],
        )?;
        self.orchestrator.run(&submission, policy, cancel).await
    }
}
