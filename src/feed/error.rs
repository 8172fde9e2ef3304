#![allow(dead_code)]

use crate::spapi::{ApiFailure, TokenError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("could not obtain access token: {0}")]
    Credentials(#[from] TokenError),
    #[error("feed document upload failed: {0}")]
    DocumentUpload(ApiFailure),
    #[error("listing lookup failed: {0}")]
    ListingLookup(ApiFailure),
    #[error("feed submission failed: {0}")]
    Submission(ApiFailure),
    #[error("status read for feed {feed_id} failed on attempt {attempt}: {failure}")]
    StatusRead {
        feed_id: String,
        attempt: u32,
        failure: ApiFailure,
    },
    #[error("feed {feed_id} not terminal after {attempts} reads (last status {last_status})")]
    Timeout {
        feed_id: String,
        attempts: u32,
        last_status: String,
    },
    #[error("polling of feed {feed_id} cancelled after {attempts} reads")]
    Cancelled { feed_id: String, attempts: u32 },
    #[error("cancelled before {stage}")]
    CancelledBefore { stage: &'static str },
    #[error("could not resolve report document {document_id}: {failure}")]
    DocumentResolution {
        document_id: String,
        failure: ApiFailure,
    },
    #[error("report download failed: {0}")]
    Download(ApiFailure),
    #[error("report decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    InvalidInput,
    Credentials,
    DocumentUpload,
    ListingLookup,
    Submission,
    StatusRead,
    Timeout,
    Cancelled,
    DocumentResolution,
    Download,
    Decode,
}

impl FeedErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedErrorKind::InvalidInput => "invalid_input",
            FeedErrorKind::Credentials => "credentials",
            FeedErrorKind::DocumentUpload => "document_upload",
            FeedErrorKind::ListingLookup => "listing_lookup",
            FeedErrorKind::Submission => "submission",
            FeedErrorKind::StatusRead => "status_read",
            FeedErrorKind::Timeout => "timeout",
            FeedErrorKind::Cancelled => "cancelled",
            FeedErrorKind::DocumentResolution => "document_resolution",
            FeedErrorKind::Download => "download",
            FeedErrorKind::Decode => "decode",
        }
    }
}

impl FeedError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn kind(&self) -> FeedErrorKind {
        match self {
            FeedError::InvalidInput(_) => FeedErrorKind::InvalidInput,
            FeedError::Credentials(_) => FeedErrorKind::Credentials,
            FeedError::DocumentUpload(_) => FeedErrorKind::DocumentUpload,
            FeedError::ListingLookup(_) => FeedErrorKind::ListingLookup,
            FeedError::Submission(_) => FeedErrorKind::Submission,
            FeedError::StatusRead { .. } => FeedErrorKind::StatusRead,
            FeedError::Timeout { .. } => FeedErrorKind::Timeout,
            FeedError::Cancelled { .. } | FeedError::CancelledBefore { .. } => {
                FeedErrorKind::Cancelled
            }
            FeedError::DocumentResolution { .. } => FeedErrorKind::DocumentResolution,
            FeedError::Download(_) => FeedErrorKind::Download,
            FeedError::Decode(_) => FeedErrorKind::Decode,
        }
    }

    /// The remote failure behind this error, when there was one.
    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            FeedError::DocumentUpload(failure)
            | FeedError::ListingLookup(failure)
            | FeedError::Submission(failure)
            | FeedError::Download(failure)
            | FeedError::StatusRead { failure, .. }
            | FeedError::DocumentResolution { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_error_keeps_remote_payload() {
        let body = r#"{"errors":[{"code":"InvalidInput","message":"Invalid feedType"}]}"#;
        let err = FeedError::Submission(ApiFailure::http(400, body));
        assert_eq!(err.kind(), FeedErrorKind::Submission);
        let failure = err.api_failure().expect("failure");
        assert_eq!(failure.status, Some(400));
        assert_eq!(failure.body, body);
        assert!(err.to_string().contains("Invalid feedType"));
    }

    #[test]
    fn timeout_has_no_remote_payload() {
        let err = FeedError::Timeout {
            feed_id: "feed-1".into(),
            attempts: 20,
            last_status: "IN_PROGRESS".into(),
        };
        assert!(err.api_failure().is_none());
        assert_eq!(err.kind().as_str(), "timeout");
    }

    #[test]
    fn early_cancellation_shares_the_cancelled_kind() {
        let err = FeedError::CancelledBefore { stage: "submission" };
        assert_eq!(err.kind(), FeedErrorKind::Cancelled);
        assert_eq!(err.to_string(), "cancelled before submission");
    }
}
