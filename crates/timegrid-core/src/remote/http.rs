//! HTTP implementation of the remote persistence boundary.
//!
//! Talks JSON REST to the sync server: `POST /api/{entity}` creates,
//! `PATCH /api/{entity}/{id}` applies a partial payload, `DELETE` removes.
//! A bearer token is attached when one is configured; authorization
//! decisions stay on the server.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::model::{Client, Project, Tag, TimeEntry};
use crate::remote::RemoteStore;

#[derive(Debug)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpRemoteStore {
    /// # Errors
    ///
    /// Returns `ApiError::InvalidResponse` when `base_url` is not a valid
    /// absolute URL.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidResponse(format!("invalid base URL {base_url:?}: {e}")))?;
        Ok(HttpRemoteStore {
            client: reqwest::Client::new(),
            base,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// POST a record, returning the server-assigned id from the response.
    async fn create<T: serde::Serialize + Sync>(
        &self,
        entity: &str,
        record: &T,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(&format!("api/{entity}"));
        let resp = self
            .authorize(self.client.post(&url).json(record))
            .send()
            .await?;
        let body: Value = check_status(resp).await?.json().await?;
        body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::InvalidResponse(format!("create {entity}: response has no id")))
    }

    async fn patch(&self, entity: &str, id: &str, patch: &Value) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/{entity}/{id}"));
        let resp = self
            .authorize(self.client.patch(&url).json(patch))
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }

    async fn remove(&self, entity: &str, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/{entity}/{id}"));
        let resp = self.authorize(self.client.delete(&url)).send().await?;
        check_status(resp).await.map(|_| ())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        let message = resp.text().await.unwrap_or_default();
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn add_entry(&self, entry: &TimeEntry) -> Result<String, ApiError> {
        self.create("entries", entry).await
    }

    async fn update_entry(&self, id: &str, patch: &Value) -> Result<(), ApiError> {
        self.patch("entries", id, patch).await
    }

    async fn delete_entry(&self, id: &str) -> Result<(), ApiError> {
        self.remove("entries", id).await
    }

    async fn add_project(&self, project: &Project) -> Result<String, ApiError> {
        self.create("projects", project).await
    }

    async fn update_project(&self, id: &str, patch: &Value) -> Result<(), ApiError> {
        self.patch("projects", id, patch).await
    }

    async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        self.remove("projects", id).await
    }

    async fn add_tag(&self, tag: &Tag) -> Result<String, ApiError> {
        self.create("tags", tag).await
    }

    async fn delete_tag(&self, name: &str) -> Result<(), ApiError> {
        self.remove("tags", name).await
    }

    async fn add_client(&self, client: &Client) -> Result<String, ApiError> {
        self.create("clients", client).await
    }

    async fn update_client(&self, id: &str, patch: &Value) -> Result<(), ApiError> {
        self.patch("clients", id, patch).await
    }

    async fn delete_client(&self, id: &str) -> Result<(), ApiError> {
        self.remove("clients", id).await
    }
}
