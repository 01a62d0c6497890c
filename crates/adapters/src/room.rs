// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat-room client.
//!
//! Thin outbound-only adapter mirroring task progress into a room where
//! human operators can watch and intervene. Every call here is best-effort
//! from the orchestrator's point of view — a room outage never affects the
//! task lifecycle.

use crate::http::{self, HttpError};
use async_trait::async_trait;
use lw_core::TaskId;
use serde_json::json;
use thiserror::Error;

/// Errors from room backend operations
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room request failed: {0}")]
    Request(String),
    #[error("room server rejected the message: {0}")]
    Rejected(String),
}

impl From<HttpError> for RoomError {
    fn from(e: HttpError) -> Self {
        match e.status() {
            Some(status) if (400..500).contains(&status) => RoomError::Rejected(e.to_string()),
            _ => RoomError::Request(e.to_string()),
        }
    }
}

/// Capability trait for the chat-room backend.
#[async_trait]
pub trait RoomBackend: Send + Sync + 'static {
    /// Create a room with the given name, topic, and invitees. Returns the
    /// server-minted room handle.
    async fn create_room(
        &self,
        name: &str,
        topic: &str,
        invitees: &[String],
    ) -> Result<String, RoomError>;

    /// Send a plain text message.
    async fn send_text(&self, room: &str, body: &str) -> Result<(), RoomError>;

    /// Send an HTML message, falling back to the plaintext rendering when
    /// the server rejects HTML.
    async fn send_html(&self, room: &str, html: &str, fallback: &str) -> Result<(), RoomError>;

    /// Mirror a control signal as a structured message.
    async fn send_control(
        &self,
        room: &str,
        task_id: &TaskId,
        control: &str,
        reason: Option<&str>,
    ) -> Result<(), RoomError>;

    async fn invite(&self, room: &str, user: &str) -> Result<(), RoomError>;

    async fn kick(&self, room: &str, user: &str, reason: Option<&str>) -> Result<(), RoomError>;

    async fn set_topic(&self, room: &str, topic: &str) -> Result<(), RoomError>;

    /// Leave the room so finished tasks don't accumulate dead members.
    async fn leave(&self, room: &str) -> Result<(), RoomError>;

    /// Archive the room once the task reaches a terminal status.
    async fn archive(&self, room: &str) -> Result<(), RoomError>;
}

/// HTTP client for the room service.
pub struct HttpRoomBackend {
    addr: String,
    token: Option<String>,
}

impl HttpRoomBackend {
    pub fn new(addr: impl Into<String>, token: Option<String>) -> Self {
        Self { addr: addr.into(), token }
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<String, RoomError> {
        Ok(http::post(&self.addr, path, self.token(), &body.to_string()).await?)
    }
}

#[async_trait]
impl RoomBackend for HttpRoomBackend {
    async fn create_room(
        &self,
        name: &str,
        topic: &str,
        invitees: &[String],
    ) -> Result<String, RoomError> {
        let response = self
            .post("/v1/rooms", json!({"name": name, "topic": topic, "invite": invitees}))
            .await?;
        serde_json::from_str::<serde_json::Value>(&response)
            .ok()
            .and_then(|v| v.get("room_id").and_then(|id| id.as_str()).map(str::to_string))
            .ok_or_else(|| RoomError::Request(format!("malformed room create response: {response}")))
    }

    async fn send_text(&self, room: &str, body: &str) -> Result<(), RoomError> {
        self.post(&format!("/v1/rooms/{room}/send"), json!({"msgtype": "text", "body": body}))
            .await?;
        Ok(())
    }

    async fn send_html(&self, room: &str, html: &str, fallback: &str) -> Result<(), RoomError> {
        let result = self
            .post(
                &format!("/v1/rooms/{room}/send"),
                json!({"msgtype": "html", "formatted_body": html, "body": fallback}),
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(RoomError::Rejected(reason)) => {
                tracing::debug!(%room, %reason, "HTML message rejected, falling back to text");
                self.send_text(room, fallback).await
            }
            Err(e) => Err(e),
        }
    }

    async fn send_control(
        &self,
        room: &str,
        task_id: &TaskId,
        control: &str,
        reason: Option<&str>,
    ) -> Result<(), RoomError> {
        self.post(
            &format!("/v1/rooms/{room}/send"),
            json!({
                "msgtype": "control",
                "task_id": task_id,
                "control": control,
                "reason": reason,
            }),
        )
        .await?;
        Ok(())
    }

    async fn invite(&self, room: &str, user: &str) -> Result<(), RoomError> {
        self.post(&format!("/v1/rooms/{room}/invite"), json!({"user_id": user})).await?;
        Ok(())
    }

    async fn kick(&self, room: &str, user: &str, reason: Option<&str>) -> Result<(), RoomError> {
        self.post(&format!("/v1/rooms/{room}/kick"), json!({"user_id": user, "reason": reason}))
            .await?;
        Ok(())
    }

    async fn set_topic(&self, room: &str, topic: &str) -> Result<(), RoomError> {
        self.post(&format!("/v1/rooms/{room}/topic"), json!({"topic": topic})).await?;
        Ok(())
    }

    async fn leave(&self, room: &str) -> Result<(), RoomError> {
        self.post(&format!("/v1/rooms/{room}/leave"), json!({})).await?;
        Ok(())
    }

    async fn archive(&self, room: &str) -> Result<(), RoomError> {
        self.post(&format!("/v1/rooms/{room}/archive"), json!({})).await?;
        Ok(())
    }
}
