use crate::feed::error::FeedError;
use crate::feed::types::{FeedSubmission, JSON_LISTINGS_FEED};
use std::{env, time::Duration};
use tracing::warn;

pub const DEFAULT_MARKETPLACE_ID: &str = "A21TJRUUN4KGV";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Feed workflow options, injected into every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub feed_type: String,
    pub marketplace_ids: Vec<String>,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_type: JSON_LISTINGS_FEED.to_string(),
            marketplace_ids: vec![DEFAULT_MARKETPLACE_ID.to_string()],
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let marketplace_ids = var("SPAPI_MARKETPLACE_IDS")
            .map(|raw| parse_list(&raw))
            .filter(|ids| !ids.is_empty())
            .unwrap_or(defaults.marketplace_ids);

        Self {
            feed_type: var("SPAPI_FEED_TYPE").unwrap_or(defaults.feed_type),
            marketplace_ids,
            poll_interval: var("SPAPI_POLL_INTERVAL_SECS")
                .and_then(|raw| positive::<u64>("SPAPI_POLL_INTERVAL_SECS", &raw))
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            max_attempts: var("SPAPI_MAX_POLL_ATTEMPTS")
                .and_then(|raw| positive::<u32>("SPAPI_MAX_POLL_ATTEMPTS", &raw))
                .unwrap_or(defaults.max_attempts),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            max_attempts: self.max_attempts,
        }
    }

    /// Builds a submission, falling back to the configured feed type and marketplaces.
    pub fn submission(
        &self,
        feed_document_id: &str,
        feed_type: Option<&str>,
        marketplace_ids: Option<Vec<String>>,
    ) -> Result<FeedSubmission, FeedError> {
        let marketplace_ids = marketplace_ids
            .filter(|ids| !ids.is_empty())
            .unwrap_or_else(|| self.marketplace_ids.clone());
        FeedSubmission::new(
            feed_document_id,
            feed_type.unwrap_or(&self.feed_type),
            marketplace_ids,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.interval.is_zero() {
            return Err(FeedError::invalid_input("poll interval must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(FeedError::invalid_input("max attempts must be at least 1"));
        }
        Ok(())
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn positive<T>(key: &str, raw: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            warn!(target = "spapi.config", key, value = raw, "ignoring non-positive or invalid value");
            None
        }
    }
}
