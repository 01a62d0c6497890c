// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document store client.
//!
//! Workspace documents live at a remote store as labeled blocks attached to
//! the commissioning caller. The store offers optimistic concurrency: a
//! stale write comes back as 409 and surfaces here as
//! [`StoreError::Conflict`] for the workspace manager to retry.
//!
//! The same service carries best-effort completion notifications to the
//! caller. Delivery is at-least-once — caller-side consumers must be
//! idempotent on notification content.

use crate::http::{self, HttpError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Errors from document store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Remote optimistic concurrency rejected a stale write
    #[error("stale write rejected by the document store")]
    Conflict,
    #[error("block not found: {0}")]
    NotFound(String),
    #[error("store request failed: {0}")]
    Request(String),
    #[error("malformed store response: {0}")]
    Malformed(String),
}

impl From<HttpError> for StoreError {
    fn from(e: HttpError) -> Self {
        match e.status() {
            Some(409) => StoreError::Conflict,
            Some(404) => StoreError::NotFound(e.to_string()),
            _ => StoreError::Request(e.to_string()),
        }
    }
}

/// A labeled block as listed for a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub id: String,
    pub label: String,
}

/// Capability trait for the remote document store.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Create a labeled block. Returns the store-minted block id.
    async fn create_block(
        &self,
        label: &str,
        value: &str,
        description: &str,
        limit: usize,
    ) -> Result<String, StoreError>;

    /// Associate a block with a caller so it appears in the caller's
    /// memory view.
    async fn attach_block(&self, caller_id: &str, block_id: &str) -> Result<(), StoreError>;

    /// Fetch a block's current value.
    async fn read_block(&self, caller_id: &str, block_id: &str) -> Result<String, StoreError>;

    /// Overwrite a block's value. Fails with [`StoreError::Conflict`] when
    /// the remote copy changed since the last read.
    async fn write_block(
        &self,
        caller_id: &str,
        block_id: &str,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Dissociate a block from the caller; the content remains at the store.
    async fn detach_block(&self, caller_id: &str, block_id: &str) -> Result<(), StoreError>;

    /// List the caller's attached blocks.
    async fn list_blocks(&self, caller_id: &str) -> Result<Vec<BlockRef>, StoreError>;

    /// Best-effort notification message to the caller.
    async fn notify(&self, caller_id: &str, message: &str) -> Result<(), StoreError>;
}

/// HTTP client for the document store service.
pub struct HttpDocumentStore {
    addr: String,
    token: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(addr: impl Into<String>, token: Option<String>) -> Self {
        Self { addr: addr.into(), token }
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn create_block(
        &self,
        label: &str,
        value: &str,
        description: &str,
        limit: usize,
    ) -> Result<String, StoreError> {
        let body = json!({
            "label": label,
            "value": value,
            "description": description,
            "limit": limit,
        })
        .to_string();
        let response = http::post(&self.addr, "/v1/blocks", self.token(), &body).await?;
        serde_json::from_str::<serde_json::Value>(&response)
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
            .ok_or(StoreError::Malformed(response))
    }

    async fn attach_block(&self, caller_id: &str, block_id: &str) -> Result<(), StoreError> {
        let path = format!("/v1/agents/{caller_id}/blocks/{block_id}/attach");
        http::post(&self.addr, &path, self.token(), "{}").await?;
        Ok(())
    }

    async fn read_block(&self, caller_id: &str, block_id: &str) -> Result<String, StoreError> {
        let path = format!("/v1/agents/{caller_id}/blocks/{block_id}");
        let response = http::get(&self.addr, &path, self.token()).await?;
        serde_json::from_str::<serde_json::Value>(&response)
            .ok()
            .and_then(|v| v.get("value").and_then(|val| val.as_str()).map(str::to_string))
            .ok_or(StoreError::Malformed(response))
    }

    async fn write_block(
        &self,
        caller_id: &str,
        block_id: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let path = format!("/v1/agents/{caller_id}/blocks/{block_id}");
        let body = json!({"value": value}).to_string();
        http::patch(&self.addr, &path, self.token(), &body).await?;
        Ok(())
    }

    async fn detach_block(&self, caller_id: &str, block_id: &str) -> Result<(), StoreError> {
        let path = format!("/v1/agents/{caller_id}/blocks/{block_id}/detach");
        http::post(&self.addr, &path, self.token(), "{}").await?;
        Ok(())
    }

    async fn list_blocks(&self, caller_id: &str) -> Result<Vec<BlockRef>, StoreError> {
        let path = format!("/v1/agents/{caller_id}/blocks");
        let response = http::get(&self.addr, &path, self.token()).await?;
        serde_json::from_str::<Vec<BlockRef>>(&response)
            .map_err(|_| StoreError::Malformed(response))
    }

    async fn notify(&self, caller_id: &str, message: &str) -> Result<(), StoreError> {
        let path = format!("/v1/agents/{caller_id}/messages");
        let body = json!({"role": "system", "content": message}).to_string();
        http::post(&self.addr, &path, self.token(), &body).await?;
        Ok(())
    }
}
