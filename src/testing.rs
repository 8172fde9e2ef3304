//! Scripted in-memory SP-API for tests.

use crate::feed::types::{FeedJob, ProcessingStatus};
use crate::spapi::documents::{DocumentUploader, FeedDocumentUpload};
use crate::spapi::feeds::{CreateFeedSpecification, FeedDocumentInfo, FeedsApi};
use crate::spapi::listings::ListingsApi;
use crate::spapi::ApiFailure;
use async_trait::async_trait;
use flate2::{Compression, write::GzEncoder};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Mutex;

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

pub fn job_with(feed_id: &str, status: &str, result_document: Option<&str>) -> FeedJob {
    let job = FeedJob::new(feed_id, ProcessingStatus::parse(status));
    match result_document {
        Some(id) => job.with_result_document(id),
        None => job,
    }
}

pub fn in_progress(feed_id: &str) -> FeedJob {
    FeedJob::new(feed_id, ProcessingStatus::InProgress)
}

#[derive(Default)]
struct State {
    feed_id: Option<String>,
    create_error: Option<ApiFailure>,
    created: Vec<CreateFeedSpecification>,
    tokens: Vec<String>,
    statuses: VecDeque<Result<FeedJob, ApiFailure>>,
    repeat: Option<FeedJob>,
    status_reads: usize,
    documents: HashMap<String, (FeedDocumentInfo, Vec<u8>)>,
    document_lookups: usize,
    download_error: Option<ApiFailure>,
    downloaded: Vec<String>,
    uploads: Vec<(String, String, Vec<u8>)>,
    staged: usize,
    upload_error: Option<ApiFailure>,
    product_types: HashMap<(String, String), String>,
}

/// Mock implementation of the SP-API traits.
///
/// Status reads pop scripted responses in order; once the script is empty the
/// `repeat_status` job (if any) is returned forever.
#[derive(Default)]
pub struct MockSpApi {
    state: Mutex<State>,
}

impl MockSpApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_feed_id(&self, feed_id: &str) {
        self.state().feed_id = Some(feed_id.to_string());
    }

    pub fn fail_create_feed(&self, failure: ApiFailure) {
        self.state().create_error = Some(failure);
    }

    pub fn push_status(&self, status: Result<FeedJob, ApiFailure>) {
        self.state().statuses.push_back(status);
    }

    pub fn repeat_status(&self, job: FeedJob) {
        self.state().repeat = Some(job);
    }

    pub fn set_document(&self, id: &str, info: FeedDocumentInfo, bytes: Vec<u8>) {
        self.state().documents.insert(id.to_string(), (info, bytes));
    }

    pub fn fail_download(&self, failure: ApiFailure) {
        self.state().download_error = Some(failure);
    }

    pub fn fail_upload(&self, failure: ApiFailure) {
        self.state().upload_error = Some(failure);
    }

    pub fn set_product_type(&self, seller_id: &str, sku: &str, product_type: &str) {
        self.state().product_types.insert(
            (seller_id.to_string(), sku.to_string()),
            product_type.to_string(),
        );
    }

    pub fn created_feeds(&self) -> Vec<CreateFeedSpecification> {
        self.state().created.clone()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.state().tokens.clone()
    }

    pub fn status_reads(&self) -> usize {
        self.state().status_reads
    }

    pub fn document_lookups(&self) -> usize {
        self.state().document_lookups
    }

    pub fn downloads(&self) -> usize {
        self.state().downloaded.len()
    }

    pub fn downloaded_urls(&self) -> Vec<String> {
        self.state().downloaded.clone()
    }

    pub fn uploads(&self) -> Vec<(String, String, Vec<u8>)> {
        self.state().uploads.clone()
    }
}

#[async_trait]
impl FeedsApi for MockSpApi {
    async fn create_feed(
        &self,
        access_token: &str,
        spec: &CreateFeedSpecification,
    ) -> Result<String, ApiFailure> {
        let mut state = self.state();
        state.tokens.push(access_token.to_string());
        if let Some(failure) = state.create_error.clone() {
            return Err(failure);
        }
        state.created.push(spec.clone());
        Ok(state
            .feed_id
            .clone()
            .unwrap_or_else(|| format!("feed-{}", state.created.len())))
    }

    async fn get_feed(&self, access_token: &str, feed_id: &str) -> Result<FeedJob, ApiFailure> {
        let mut state = self.state();
        state.tokens.push(access_token.to_string());
        state.status_reads += 1;
        if let Some(next) = state.statuses.pop_front() {
            return next;
        }
        state
            .repeat
            .clone()
            .ok_or_else(|| ApiFailure::http(404, format!("feed {feed_id} not found")))
    }

    async fn get_feed_document(
        &self,
        access_token: &str,
        feed_document_id: &str,
    ) -> Result<FeedDocumentInfo, ApiFailure> {
        let mut state = self.state();
        state.tokens.push(access_token.to_string());
        state.document_lookups += 1;
        state
            .documents
            .get(feed_document_id)
            .map(|(info, _)| info.clone())
            .ok_or_else(|| ApiFailure::http(404, format!("document {feed_document_id} not found")))
    }

    async fn download_document(&self, url: &str) -> Result<Vec<u8>, ApiFailure> {
        let mut state = self.state();
        state.downloaded.push(url.to_string());
        if let Some(failure) = state.download_error.clone() {
            return Err(failure);
        }
        state
            .documents
            .values()
            .find(|(info, _)| info.url.as_deref() == Some(url))
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| ApiFailure::http(403, "AccessDenied"))
    }
}

#[async_trait]
impl DocumentUploader for MockSpApi {
    async fn create_feed_document(
        &self,
        access_token: &str,
        _content_type: &str,
    ) -> Result<FeedDocumentUpload, ApiFailure> {
        let mut state = self.state();
        state.tokens.push(access_token.to_string());
        state.staged += 1;
        let n = state.staged;
        Ok(FeedDocumentUpload {
            feed_document_id: format!("amzn1.tortuga.doc-{n}"),
            url: format!("https://tortuga.example/upload/doc-{n}"),
        })
    }

    async fn upload_document(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiFailure> {
        let mut state = self.state();
        if let Some(failure) = state.upload_error.clone() {
            return Err(failure);
        }
        state
            .uploads
            .push((url.to_string(), content_type.to_string(), bytes));
        Ok(())
    }
}

#[async_trait]
impl ListingsApi for MockSpApi {
    async fn get_product_type(
        &self,
        access_token: &str,
        seller_id: &str,
        sku: &str,
        _marketplace_id: &str,
    ) -> Result<String, ApiFailure> {
        let mut state = self.state();
        state.tokens.push(access_token.to_string());
        state
            .product_types
            .get(&(seller_id.to_string(), sku.to_string()))
            .cloned()
            .ok_or_else(|| ApiFailure::http(404, format!("sku {sku} not found")))
    }
}
