#![allow(unused_imports)]

pub mod config;
pub mod error;
pub mod events;
pub mod listing_images;
pub mod orchestrator;
pub mod report;
pub mod types;

pub use config::{FeedConfig, PollPolicy};
pub use error::{FeedError, FeedErrorKind};
pub use events::{FeedEvent, FeedObserver, TracingObserver};
pub use listing_images::{ListingImageRequest, ListingImageWorkflow};
pub use orchestrator::FeedOrchestrator;
pub use types::{FeedJob, FeedOutcome, FeedSubmission, ProcessingReport, ProcessingStatus};
