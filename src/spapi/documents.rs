use crate::spapi::ApiFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const JSON_FEED_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFeedDocumentSpecification<'a> {
    pub content_type: &'a str,
}

/// A staged feed document: its id plus the pre-signed upload URL (valid ~5 minutes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocumentUpload {
    pub feed_document_id: String,
    pub url: String,
}

#[async_trait]
pub trait DocumentUploader: Send + Sync {
    async fn create_feed_document(
        &self,
        access_token: &str,
        content_type: &str,
    ) -> Result<FeedDocumentUpload, ApiFailure>;

    async fn upload_document(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiFailure>;
}
