//! Feed submission orchestrator.
//!
//! Drives one feed through its lifecycle: create the feed for an uploaded
//! document, poll the job until the service reports a terminal status, then
//! resolve and decode the processing report. Transport and HTTP failures are
//! surfaced immediately; the only loop is the bounded status poll.

use crate::feed::config::PollPolicy;
use crate::feed::error::FeedError;
use crate::feed::events::{FeedEvent, FeedObserver, TracingObserver};
use crate::feed::report::{decode_report, parse_compression};
use crate::feed::types::{FeedJob, FeedOutcome, FeedSubmission, ProcessingReport};
use crate::spapi::{ApiFailure, DocumentUploader, FeedsApi, TokenSource};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Fails with `CancelledBefore` once `cancel` has fired. Used ahead of each
/// call that changes remote state.
pub(crate) fn ensure_active(cancel: &CancellationToken, stage: &'static str) -> Result<(), FeedError> {
    if cancel.is_cancelled() {
        return Err(FeedError::CancelledBefore { stage });
    }
    Ok(())
}

#[derive(Clone)]
pub struct FeedOrchestrator {
    api: Arc<dyn FeedsApi>,
    uploader: Arc<dyn DocumentUploader>,
    tokens: Arc<dyn TokenSource>,
    observer: Arc<dyn FeedObserver>,
}

impl FeedOrchestrator {
    pub fn new(
        api: Arc<dyn FeedsApi>,
        uploader: Arc<dyn DocumentUploader>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            api,
            uploader,
            tokens,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Same collaborators, different observer.
    pub fn with_observer(&self, observer: Arc<dyn FeedObserver>) -> Self {
        Self {
            observer,
            ..self.clone()
        }
    }

    async fn token(&self) -> Result<String, FeedError> {
        Ok(self.tokens.access_token().await?)
    }

    /// Creates a feed document and uploads `bytes` to its pre-signed URL.
    pub async fn upload_feed_document(
        &self,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, FeedError> {
        if bytes.is_empty() {
            return Err(FeedError::invalid_input("feed document is empty"));
        }
        let token = self.token().await?;
        let staged = self
            .uploader
            .create_feed_document(&token, content_type)
            .await
            .map_err(FeedError::DocumentUpload)?;
        let size = bytes.len();
        self.uploader
            .upload_document(&staged.url, content_type, bytes)
            .await
            .map_err(FeedError::DocumentUpload)?;
        self.observer.on_event(&FeedEvent::DocumentUploaded {
            feed_document_id: staged.feed_document_id.clone(),
            bytes: size,
        });
        Ok(staged.feed_document_id)
    }

    pub async fn submit(&self, submission: &FeedSubmission) -> Result<String, FeedError> {
        let token = self.token().await?;
        let feed_id = self
            .api
            .create_feed(&token, &submission.to_specification())
            .await
            .map_err(FeedError::Submission)?;
        if feed_id.trim().is_empty() {
            return Err(FeedError::Submission(ApiFailure::http(
                200,
                "create feed response carried an empty feedId",
            )));
        }
        self.observer.on_event(&FeedEvent::Submitted {
            feed_id: feed_id.clone(),
            feed_document_id: submission.feed_document_id().to_string(),
        });
        Ok(feed_id)
    }

    /// Polls until the feed is terminal, at most `policy.max_attempts` reads.
    ///
    /// A token that cannot be obtained before a read fails the poll as
    /// `Credentials`, not `StatusRead`: no request was sent for that attempt.
    pub async fn await_completion(
        &self,
        feed_id: &str,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<FeedJob, FeedError> {
        policy.validate()?;
        if feed_id.trim().is_empty() {
            return Err(FeedError::invalid_input("feedId must not be empty"));
        }

        let mut last_status = String::from("<none>");
        for attempt in 1..=policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(FeedError::Cancelled {
                    feed_id: feed_id.to_string(),
                    attempts: attempt - 1,
                });
            }

            let token = self.token().await.inspect_err(|err| {
                warn!(
                    target = "spapi.feeds",
                    feed_id = %feed_id,
                    attempt,
                    error = %err,
                    "no access token for status read"
                );
            })?;
            let job = self
                .api
                .get_feed(&token, feed_id)
                .await
                .map_err(|failure| FeedError::StatusRead {
                    feed_id: feed_id.to_string(),
                    attempt,
                    failure,
                })?;
            crate::metrics::poll_attempt(job.processing_status.as_str());
            self.observer.on_event(&FeedEvent::Polled {
                feed_id: feed_id.to_string(),
                attempt,
                status: job.processing_status.clone(),
            });

            if job.is_terminal() {
                self.observer.on_event(&FeedEvent::Completed {
                    feed_id: feed_id.to_string(),
                    status: job.processing_status.clone(),
                    result_feed_document_id: job.result_feed_document_id.clone(),
                });
                return Ok(job);
            }
            last_status = job.processing_status.to_string();

            if attempt == policy.max_attempts {
                break;
            }
            self.observer.on_event(&FeedEvent::Waiting {
                feed_id: feed_id.to_string(),
                attempt,
                delay: policy.interval,
            });
            tokio::select! {
                _ = sleep(policy.interval) => {}
                _ = cancel.cancelled() => {
                    return Err(FeedError::Cancelled {
                        feed_id: feed_id.to_string(),
                        attempts: attempt,
                    });
                }
            }
        }

        Err(FeedError::Timeout {
            feed_id: feed_id.to_string(),
            attempts: policy.max_attempts,
            last_status,
        })
    }

    /// Resolves and decodes the job's report. `Ok(None)` when the job has none.
    pub async fn fetch_report(&self, job: &FeedJob) -> Result<Option<ProcessingReport>, FeedError> {
        if !job.is_terminal() {
            return Err(FeedError::invalid_input(format!(
                "feed {} is not terminal ({})",
                job.feed_id, job.processing_status
            )));
        }
        let Some(document_id) = job
            .result_feed_document_id
            .as_deref()
            .filter(|id| !id.is_empty())
        else {
            return Ok(None);
        };

        let token = self.token().await?;
        let info = self
            .api
            .get_feed_document(&token, document_id)
            .await
            .map_err(|failure| FeedError::DocumentResolution {
                document_id: document_id.to_string(),
                failure,
            })?;
        let url = info
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| FeedError::DocumentResolution {
                document_id: document_id.to_string(),
                failure: ApiFailure::http(200, "document response carried no url"),
            })?;
        let compression = parse_compression(info.compression_algorithm.as_deref())?;

        let raw = self
            .api
            .download_document(url)
            .await
            .map_err(FeedError::Download)?;
        let report = decode_report(document_id, compression, raw)?;
        self.observer.on_event(&FeedEvent::ReportFetched {
            feed_id: job.feed_id.clone(),
            document_id: document_id.to_string(),
            bytes: report.raw_bytes.len(),
            compressed: report.compression.is_some(),
        });
        Ok(Some(report))
    }

    /// Submit, wait for a terminal status, then fetch the report once.
    pub async fn run(
        &self,
        submission: &FeedSubmission,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<FeedOutcome, FeedError> {
        policy.validate()?;
        ensure_active(cancel, "submission")?;
        let feed_id = self.submit(submission).await?;
        let job = self.await_completion(&feed_id, policy, cancel).await?;
        let report = self.fetch_report(&job).await?;
        Ok(FeedOutcome {
            feed_id,
            job,
            report,
        })
    }
}
