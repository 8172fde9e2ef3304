#![allow(unused_imports)]

pub mod auth;
pub mod client;
pub mod config;
pub mod documents;
pub mod feeds;
pub mod listings;

use std::fmt;

pub use auth::{LwaTokenProvider, StaticToken, TokenError, TokenSource};
pub use client::SpApiClient;
pub use config::SpApiConfig;
pub use documents::{DocumentUploader, FeedDocumentUpload};
pub use feeds::{CreateFeedSpecification, FeedDocumentInfo, FeedsApi};
pub use listings::{ImageSlot, ListingImageFeed, ListingsApi};

/// A failed SP-API call. `status` is `None` when no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub body: String,
}

impl ApiFailure {
    pub fn transport(err: impl ToString) -> Self {
        Self {
            status: None,
            body: err.to_string(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.body),
            None => write!(f, "transport error: {}", self.body),
        }
    }
}

impl std::error::Error for ApiFailure {}
