//! JSON feed client.
//!
//! Expects the feed URL to answer a ranged GET with a JSON array of events:
//! `[{"id": ..., "title": ..., "start": rfc3339, "end": rfc3339, ...}, ...]`.
//! Items that cannot be interpreted are skipped rather than failing the
//! whole fetch, so one bad upstream event cannot blank a subscribed
//! calendar.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::ApiError;
use crate::feed::EventFeed;
use crate::model::ExternalEvent;

pub struct HttpFeed {
    client: reqwest::Client,
    feed_id: String,
    url: String,
    /// Fallback display color for items that carry none.
    color: Option<String>,
}

impl HttpFeed {
    pub fn new(feed_id: impl Into<String>, url: impl Into<String>, color: Option<String>) -> Self {
        HttpFeed {
            client: reqwest::Client::new(),
            feed_id: feed_id.into(),
            url: url.into(),
            color,
        }
    }

    fn parse_item(&self, item: &Value) -> Option<ExternalEvent> {
        let start = DateTime::parse_from_rfc3339(item["start"].as_str()?)
            .ok()?
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(item["end"].as_str()?)
            .ok()?
            .with_timezone(&Utc);
        if end <= start {
            return None;
        }

        Some(ExternalEvent {
            id: item["id"].as_str()?.to_string(),
            start,
            end,
            title: item["title"].as_str().unwrap_or("(untitled)").to_string(),
            url: item["url"].as_str().map(|s| s.to_string()),
            location: item["location"].as_str().map(|s| s.to_string()),
            color: item["color"]
                .as_str()
                .map(|s| s.to_string())
                .or_else(|| self.color.clone()),
            feed_id: Some(self.feed_id.clone()),
        })
    }
}

#[async_trait]
impl EventFeed for HttpFeed {
    fn id(&self) -> &str {
        &self.feed_id
    }

    async fn events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, ApiError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("start", start.to_rfc3339()), ("end", end.to_rfc3339())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = resp.json().await?;
        let items = body
            .as_array()
            .ok_or_else(|| ApiError::InvalidResponse("feed body is not an array".to_string()))?;

        let mut events = Vec::new();
        for item in items {
            match self.parse_item(item) {
                Some(event) => events.push(event),
                None => {
                    tracing::debug!("Skipping malformed feed item from {}: {}", self.feed_id, item)
                }
            }
        }
        Ok(events)
    }
}
