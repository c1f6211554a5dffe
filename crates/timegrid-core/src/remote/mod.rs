//! Remote persistence boundary.
//!
//! The server owns canonical state; this module defines the calls the
//! offline queue replays against it, one method per entity and mutation
//! kind. `add_*` returns the server-assigned record id; updates send a
//! partial JSON patch. Implementations live behind the trait so the queue
//! can be driven by the HTTP client in production and by scripted fakes in
//! tests.

mod http;

pub use http::HttpRemoteStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::model::{Client, Project, Tag, TimeEntry};

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn add_entry(&self, entry: &TimeEntry) -> Result<String, ApiError>;
    async fn update_entry(&self, id: &str, patch: &Value) -> Result<(), ApiError>;
    async fn delete_entry(&self, id: &str) -> Result<(), ApiError>;

    async fn add_project(&self, project: &Project) -> Result<String, ApiError>;
    async fn update_project(&self, id: &str, patch: &Value) -> Result<(), ApiError>;
    async fn delete_project(&self, id: &str) -> Result<(), ApiError>;

    async fn add_tag(&self, tag: &Tag) -> Result<String, ApiError>;
    async fn delete_tag(&self, name: &str) -> Result<(), ApiError>;

    async fn add_client(&self, client: &Client) -> Result<String, ApiError>;
    async fn update_client(&self, id: &str, patch: &Value) -> Result<(), ApiError>;
    async fn delete_client(&self, id: &str) -> Result<(), ApiError>;
}
