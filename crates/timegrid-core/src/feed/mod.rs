//! External calendar feeds: read-only event sources merged into the grid.
//!
//! Feeds are subscribed in configuration and fetched per display window.
//! Nothing here ever writes back to a feed.

mod http;

pub use http::HttpFeed;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::model::ExternalEvent;

#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Stable identifier of this feed, matched against the enabled set.
    fn id(&self) -> &str;

    /// Events overlapping `[start, end)`.
    async fn events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, ApiError>;
}
