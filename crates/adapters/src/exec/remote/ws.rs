// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket event bridge for remote sessions.
//!
//! Subscribes to the worker server's per-session event stream and pumps
//! normalized events onto the task's channel until a terminal event
//! arrives, the stream closes, or the bridge is cancelled by the timeout
//! timer. The pump resolves exactly once, reporting how it ended.

use crate::exec::local::tail::TailBuffer;
use crate::exec::normalize::{self, RawEvent};
use futures_util::StreamExt;
use lw_core::{EventKind, TaskEvent};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// How the event pump wound down.
#[derive(Debug, Default)]
pub(crate) struct PumpEnd {
    /// A completion event was observed
    pub completed: bool,
    /// Stream failure or abort detail, when not completed
    pub error: Option<String>,
    /// Output text accumulated from the stream (trailing window)
    pub output: String,
}

/// Connect a WebSocket to the session's event subscription endpoint.
///
/// Retries briefly while the server registers the session.
pub(crate) async fn connect(
    addr: &str,
    session_id: &str,
    token: Option<&str>,
) -> Option<WebSocketStream<TcpStream>> {
    let stream = {
        let mut stream = None;
        for i in 0..10 {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            if let Ok(s) = TcpStream::connect(addr).await {
                stream = Some(s);
                break;
            }
        }
        if stream.is_none() {
            tracing::warn!(%addr, "session ws connect: failed after 10 attempts");
        }
        stream?
    };

    let token_query =
        token.map(|t| format!("&token={t}")).unwrap_or_default();
    let uri = format!("ws://{addr}/ws?session={session_id}{token_query}");
    match tokio_tungstenite::client_async(&uri, stream).await {
        Ok((ws, _)) => Some(ws),
        Err(e) => {
            tracing::warn!(%addr, error = %e, "session ws connect: handshake failed");
            None
        }
    }
}

/// Consume the session's event stream until it terminates.
///
/// Foreign-session events are discarded before normalization; everything
/// else is forwarded in arrival order. Breaks on the first terminal event,
/// on stream close/error, or on cancellation.
pub(crate) async fn event_pump(
    ws: WebSocketStream<TcpStream>,
    session_id: String,
    events: mpsc::Sender<TaskEvent>,
    cancel: CancellationToken,
) -> PumpEnd {
    let (_, mut read) = ws.split();
    let mut output = TailBuffer::default();
    let mut completed = false;
    let mut error: Option<String> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(%session_id, "session ws pump cancelled");
                break;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Ok(value) = serde_json::from_str::<serde_json::Value>(text.as_str()) else {
                        tracing::debug!(%session_id, "session ws pump: non-JSON frame ignored");
                        continue;
                    };
                    let Some(raw) = RawEvent::from_json(&value) else {
                        continue;
                    };
                    if !normalize::matches_session(&raw, &session_id) {
                        continue;
                    }
                    let event = normalize::normalize(&raw, epoch_ms());
                    if let Some(text) = event.data.get("text").and_then(|v| v.as_str()) {
                        output.push(text.as_bytes());
                        output.push(b"\n");
                    }
                    let kind = event.kind;
                    let _ = events.send(event).await;
                    match kind {
                        EventKind::Complete => {
                            completed = true;
                            break;
                        }
                        EventKind::Abort => {
                            error = Some("session aborted".to_string());
                            break;
                        }
                        _ => {}
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(%session_id, ?frame, "session ws pump: close frame");
                    error = Some("event stream closed before completion".to_string());
                    break;
                }
                None => {
                    error = Some("event stream ended before completion".to_string());
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(%session_id, %e, "session ws pump: stream error");
                    error = Some(format!("event stream failed: {e}"));
                    break;
                }
                _ => {} // Ping/Pong/Binary — ignore
            }
        }
    }

    PumpEnd { completed, error: if completed { None } else { error }, output: output.into_string() }
}
