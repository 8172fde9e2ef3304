use crate::feed::types::ProcessingStatus;
use std::time::Duration;
use tracing::{info, warn};

/// Progress notifications emitted while a feed workflow runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    DocumentUploaded {
        feed_document_id: String,
        bytes: usize,
    },
    Submitted {
        feed_id: String,
        feed_document_id: String,
    },
    Polled {
        feed_id: String,
        attempt: u32,
        status: ProcessingStatus,
    },
    Waiting {
        feed_id: String,
        attempt: u32,
        delay: Duration,
    },
    Completed {
        feed_id: String,
        status: ProcessingStatus,
        result_feed_document_id: Option<String>,
    },
    ReportFetched {
        feed_id: String,
        document_id: String,
        bytes: usize,
        compressed: bool,
    },
}

pub trait FeedObserver: Send + Sync {
    fn on_event(&self, event: &FeedEvent);
}

impl<F> FeedObserver for F
where
    F: Fn(&FeedEvent) + Send + Sync,
{
    fn on_event(&self, event: &FeedEvent) {
        self(event)
    }
}

/// Default observer: one structured log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FeedObserver for TracingObserver {
    fn on_event(&self, event: &FeedEvent) {
        match event {
            FeedEvent::DocumentUploaded {
                feed_document_id,
                bytes,
            } => info!(
                target = "spapi.feeds",
                feed_document_id = %feed_document_id,
                bytes = *bytes as u64,
                "feed document uploaded"
            ),
            FeedEvent::Submitted {
                feed_id,
                feed_document_id,
            } => info!(
                target = "spapi.feeds",
                feed_id = %feed_id,
                feed_document_id = %feed_document_id,
                "feed created"
            ),
            FeedEvent::Polled {
                feed_id,
                attempt,
                status,
            } => {
                if status.is_recognized() {
                    info!(target = "spapi.feeds", feed_id = %feed_id, attempt, status = %status, "feed status");
                } else {
                    warn!(target = "spapi.feeds", feed_id = %feed_id, attempt, status = %status, "unrecognized feed status; continuing to poll");
                }
            }
            FeedEvent::Waiting {
                feed_id,
                attempt,
                delay,
            } => info!(
                target = "spapi.feeds",
                feed_id = %feed_id,
                attempt,
                delay_secs = delay.as_secs_f64(),
                "waiting before next poll"
            ),
            FeedEvent::Completed {
                feed_id,
                status,
                result_feed_document_id,
            } => info!(
                target = "spapi.feeds",
                feed_id = %feed_id,
                status = %status,
                result_feed_document_id = result_feed_document_id.as_deref().unwrap_or("-"),
                "feed reached terminal status"
            ),
            FeedEvent::ReportFetched {
                feed_id,
                document_id,
                bytes,
                compressed,
            } => info!(
                target = "spapi.feeds",
                feed_id = %feed_id,
                document_id = %document_id,
                bytes = *bytes as u64,
                compressed,
                "processing report fetched"
            ),
        }
    }
}
