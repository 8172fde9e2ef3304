use crate::feed::types::FeedJob;
use crate::http::build_client;
use crate::spapi::ApiFailure;
use crate::spapi::config::SpApiConfig;
use crate::spapi::documents::{CreateFeedDocumentSpecification, DocumentUploader, FeedDocumentUpload};
use crate::spapi::feeds::{
    CreateFeedResponse, CreateFeedSpecification, FEEDS_API_VERSION, FeedDocumentInfo, FeedsApi,
};
use crate::spapi::listings::{LISTINGS_API_VERSION, ListingItemResponse, ListingsApi};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use urlencoding::encode;

const ACCESS_TOKEN_HEADER: &str = "x-amz-access-token";

#[derive(Debug, Clone)]
pub struct SpApiClient {
    endpoint: String,
    http: Client,
}

impl SpApiClient {
    pub fn new(config: &SpApiConfig) -> Self {
        Self::with_endpoint(config.endpoint.clone())
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http: build_client(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn feeds_url(&self, path: &str) -> String {
        format!("{}/feeds/{FEEDS_API_VERSION}/{path}", self.endpoint)
    }

    fn authed(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .header(ACCESS_TOKEN_HEADER, access_token)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
    }
}

/// Sends the request and returns the response only when its status is 2xx.
async fn send(builder: RequestBuilder) -> Result<Response, ApiFailure> {
    let response = builder.send().await.map_err(ApiFailure::transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|err| format!("<unreadable body: {err}>"));
    Err(ApiFailure::http(status.as_u16(), body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiFailure> {
    let status = response.status().as_u16();
    let bytes = response.bytes().await.map_err(ApiFailure::transport)?;
    serde_json::from_slice(&bytes).map_err(|err| {
        ApiFailure::http(
            status,
            format!("invalid response ({err}): {}", String::from_utf8_lossy(&bytes)),
        )
    })
}

#[async_trait]
impl FeedsApi for SpApiClient {
    async fn create_feed(
        &self,
        access_token: &str,
        spec: &CreateFeedSpecification,
    ) -> Result<String, ApiFailure> {
        let request = self.authed(self.http.post(self.feeds_url("feeds")), access_token);
        let response = send(request.json(spec)).await?;
        let payload: CreateFeedResponse = read_json(response).await?;
        Ok(payload.feed_id)
    }

    async fn get_feed(&self, access_token: &str, feed_id: &str) -> Result<FeedJob, ApiFailure> {
        let url = self.feeds_url(&format!("feeds/{}", encode(feed_id)));
        let response = send(self.authed(self.http.get(url), access_token)).await?;
        read_json(response).await
    }

    async fn get_feed_document(
        &self,
        access_token: &str,
        feed_document_id: &str,
    ) -> Result<FeedDocumentInfo, ApiFailure> {
        let url = self.feeds_url(&format!("documents/{}", encode(feed_document_id)));
        let response = send(self.authed(self.http.get(url), access_token)).await?;
        read_json(response).await
    }

    async fn download_document(&self, url: &str) -> Result<Vec<u8>, ApiFailure> {
        let response = send(self.http.get(url)).await?;
        let bytes = response.bytes().await.map_err(ApiFailure::transport)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DocumentUploader for SpApiClient {
    async fn create_feed_document(
        &self,
        access_token: &str,
        content_type: &str,
    ) -> Result<FeedDocumentUpload, ApiFailure> {
        let request = self
            .authed(self.http.post(self.feeds_url("documents")), access_token)
            .json(&CreateFeedDocumentSpecification { content_type });
        let response = send(request).await?;
        read_json(response).await
    }

    async fn upload_document(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiFailure> {
        let request = self
            .http
            .put(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl ListingsApi for SpApiClient {
    async fn get_product_type(
        &self,
        access_token: &str,
        seller_id: &str,
        sku: &str,
        marketplace_id: &str,
    ) -> Result<String, ApiFailure> {
        let url = format!(
            "{}/listings/{LISTINGS_API_VERSION}/items/{}/{}",
            self.endpoint,
            encode(seller_id),
            encode(sku)
        );
        let request = self
            .authed(self.http.get(url), access_token)
            .query(&[("marketplaceIds", marketplace_id)]);
        let response = send(request).await?;
        let status = response.status().as_u16();
        let payload: ListingItemResponse = read_json(response).await?;
        payload
            .product_type()
            .map(str::to_string)
            .ok_or_else(|| ApiFailure::http(status, "productType missing from listing summaries"))
    }
}
