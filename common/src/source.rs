//! Feed source capability.
//!
//! Anything that consumes race feed data depends on the [`FeedSource`]
//! trait rather than a concrete base URL, so the recorder (and the display
//! collaborators) cannot tell a live feed from a replay server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{ReplayError, Result};

pub const NASCAR_API_BASE: &str = "https://cf.nascar.com";

pub const LIVE_FEED_PATH: &str = "/live/feeds/live-feed.json";
pub const FLAG_DATA_PATH: &str = "/live/feeds/live-flag-data.json";
pub const PIT_DATA_PATH: &str = "/live/feeds/live-pit-data.json";
pub const POINTS_DATA_PATH: &str = "/live/feeds/live-points.json";
pub const STAGE_POINTS_PATH: &str = "/live/feeds/live-stage-points.json";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "race-feed-recorder/1.0";

/// Everything the feed publishes at one instant. The live feed is the
/// primary payload; the auxiliary feeds are best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub live_feed: Value,
    pub flag_data: Option<Value>,
    pub pit_data: Option<Value>,
    pub points_data: Option<Value>,
    pub stage_points: Option<Value>,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the feed payloads as they stand right now.
    async fn fetch_current_frame(&self) -> Result<FeedSnapshot>;
}

/// HTTP implementation of [`FeedSource`]. The live feed and a replay
/// server expose the same paths, so the two variants differ only in base
/// URL.
pub struct HttpFeedSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeedSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The live NASCAR feed.
    pub fn live() -> Self {
        Self::new(NASCAR_API_BASE)
    }

    /// A replay server standing in for the live feed.
    pub fn replay(base_url: impl Into<String>) -> Self {
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| ReplayError::SourceFetch(format!("{url}: {e}")))?
            .error_for_status()
            .map_err(|e| ReplayError::SourceFetch(format!("{url}: {e}")))?;

        response
            .json()
            .await
            .map_err(|e| ReplayError::SourceFetch(format!("{url}: {e}")))
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_current_frame(&self) -> Result<FeedSnapshot> {
        // The live feed is required; a missing auxiliary feed degrades to
        // None rather than failing the whole capture.
        let live_feed = self.get_json(LIVE_FEED_PATH).await?;

        Ok(FeedSnapshot {
            live_feed,
            flag_data: self.get_json(FLAG_DATA_PATH).await.ok(),
            pit_data: self.get_json(PIT_DATA_PATH).await.ok(),
            points_data: self.get_json(POINTS_DATA_PATH).await.ok(),
            stage_points: self.get_json(STAGE_POINTS_PATH).await.ok(),
        })
    }
}
