#![allow(dead_code)]

use crate::feed::error::FeedError;
use crate::spapi::feeds::CreateFeedSpecification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const JSON_LISTINGS_FEED: &str = "JSON_LISTINGS_FEED";

/// Processing status as reported by the Feeds service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProcessingStatus {
    InQueue,
    InProgress,
    Done,
    DoneNoData,
    Cancelled,
    Fatal,
    /// A value this client does not know. Treated as non-terminal.
    Other(String),
}

impl ProcessingStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "IN_QUEUE" => Self::InQueue,
            "IN_PROGRESS" => Self::InProgress,
            "DONE" => Self::Done,
            "DONE_NO_DATA" => Self::DoneNoData,
            "CANCELLED" => Self::Cancelled,
            "FATAL" => Self::Fatal,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InQueue => "IN_QUEUE",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::DoneNoData => "DONE_NO_DATA",
            Self::Cancelled => "CANCELLED",
            Self::Fatal => "FATAL",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::DoneNoData | Self::Cancelled | Self::Fatal
        )
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProcessingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProcessingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A request to process one previously uploaded feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSubmission {
    feed_document_id: String,
    feed_type: String,
    marketplace_ids: Vec<String>,
}

impl FeedSubmission {
    pub fn new(
        feed_document_id: impl Into<String>,
        feed_type: impl Into<String>,
        marketplace_ids: Vec<String>,
    ) -> Result<Self, FeedError> {
        let feed_document_id = feed_document_id.into().trim().to_string();
        let feed_type = feed_type.into().trim().to_string();
        let mut ids: Vec<String> = Vec::with_capacity(marketplace_ids.len());
        for id in marketplace_ids {
            let id = id.trim().to_string();
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }

        if feed_document_id.is_empty() {
            return Err(FeedError::invalid_input("feedDocumentId must not be empty"));
        }
        if feed_type.is_empty() {
            return Err(FeedError::invalid_input("feedType must not be empty"));
        }
        if ids.is_empty() {
            return Err(FeedError::invalid_input(
                "marketplaceIds must contain at least one id",
            ));
        }

        Ok(Self {
            feed_document_id,
            feed_type,
            marketplace_ids: ids,
        })
    }

    pub fn feed_document_id(&self) -> &str {
        &self.feed_document_id
    }

    pub fn feed_type(&self) -> &str {
        &self.feed_type
    }

    pub fn marketplace_ids(&self) -> &[String] {
        &self.marketplace_ids
    }

    pub(crate) fn to_specification(&self) -> CreateFeedSpecification {
        CreateFeedSpecification {
            feed_type: self.feed_type.clone(),
            marketplace_ids: self.marketplace_ids.clone(),
            input_feed_document_id: self.feed_document_id.clone(),
        }
    }
}

/// Read-only snapshot of the service's record for one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedJob {
    pub feed_id: String,
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_feed_document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_end_time: Option<DateTime<Utc>>,
}

impl FeedJob {
    pub fn new(feed_id: impl Into<String>, processing_status: ProcessingStatus) -> Self {
        Self {
            feed_id: feed_id.into(),
            processing_status,
            result_feed_document_id: None,
            feed_type: None,
            created_time: None,
            processing_end_time: None,
        }
    }

    pub fn with_result_document(mut self, document_id: impl Into<String>) -> Self {
        self.result_feed_document_id = Some(document_id.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.processing_status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    Gzip,
}

/// The decoded processing report of a completed feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingReport {
    pub document_id: String,
    pub compression: Option<CompressionAlgorithm>,
    pub raw_bytes: Vec<u8>,
    pub text: String,
}

/// Result of a full submit → await → fetch run.
#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub feed_id: String,
    pub job: FeedJob,
    pub report: Option<ProcessingReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::error::FeedErrorKind;

    #[test]
    fn terminal_statuses() {
        for raw in ["DONE", "DONE_NO_DATA", "CANCELLED", "FATAL"] {
            assert!(ProcessingStatus::parse(raw).is_terminal(), "{raw}");
        }
        for raw in ["IN_QUEUE", "IN_PROGRESS", "PAUSED", ""] {
            assert!(!ProcessingStatus::parse(raw).is_terminal(), "{raw}");
        }
    }

    #[test]
    fn unknown_status_round_trips_verbatim() {
        let status: ProcessingStatus = serde_json::from_str("\"PAUSED\"").unwrap();
        assert_eq!(status, ProcessingStatus::Other("PAUSED".into()));
        assert!(!status.is_recognized());
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"PAUSED\"");
    }

    #[test]
    fn submission_trims_and_dedups_marketplaces() {
        let submission = FeedSubmission::new(
            " doc-123 ",
            JSON_LISTINGS_FEED,
            vec!["A21TJRUUN4KGV".into(), " A21TJRUUN4KGV".into(), "".into()],
        )
        .unwrap();
        assert_eq!(submission.feed_document_id(), "doc-123");
        assert_eq!(submission.marketplace_ids(), ["A21TJRUUN4KGV".to_string()]);
    }

    #[test]
    fn submission_rejects_empty_inputs() {
        let err = FeedSubmission::new("", JSON_LISTINGS_FEED, vec!["A1".into()]).unwrap_err();
        assert_eq!(err.kind(), FeedErrorKind::InvalidInput);

        let err = FeedSubmission::new("doc-1", JSON_LISTINGS_FEED, vec![" ".into()]).unwrap_err();
        assert_eq!(err.kind(), FeedErrorKind::InvalidInput);

        let err = FeedSubmission::new("doc-1", "", vec!["A1".into()]).unwrap_err();
        assert_eq!(err.kind(), FeedErrorKind::InvalidInput);
    }

    #[test]
    fn feed_job_without_report_reference() {
        let job: FeedJob =
            serde_json::from_str(r#"{"feedId":"feed-1","processingStatus":"DONE_NO_DATA"}"#)
                .unwrap();
        assert!(job.is_terminal());
        assert!(job.result_feed_document_id.is_none());
    }
}
