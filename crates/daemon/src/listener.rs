// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP listener for the tool surface.
//!
//! Accepts connections until shutdown, serving each on a spawned task.
//! `POST /rpc` carries the JSON-RPC tool protocol (bearer-token gated when
//! a token is configured); `GET /health` answers without auth so probes
//! stay cheap.

use crate::http::{self, HttpServeError};
use crate::rpc::ToolRouter;
use lw_core::Clock;
use lw_wire::{RpcError, RpcRequest, RpcResponse, ERR_PARSE, ERR_UNAUTHORIZED};
use std::sync::Arc;
use tokio::io::{AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Serve the tool surface until the shutdown token fires.
pub async fn serve<C: Clock>(
    listener: TcpListener,
    router: Arc<ToolRouter<C>>,
    auth_token: Option<String>,
    shutdown: CancellationToken,
) {
    let auth_token = Arc::new(auth_token);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("listener shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "connection accepted");
                    let router = Arc::clone(&router);
                    let auth_token = Arc::clone(&auth_token);
                    tokio::spawn(async move {
                        let (reader, mut writer) = stream.into_split();
                        let mut reader = BufReader::new(reader);
                        match http::read_request(&mut reader).await {
                            Ok(request) => {
                                handle_request(request, &router, auth_token.as_deref(), &mut writer)
                                    .await;
                            }
                            Err(HttpServeError::ConnectionClosed) => {
                                debug!("client disconnected before sending a request");
                            }
                            Err(e) => {
                                warn!(error = %e, "request read failed");
                                let _ = http::write_response(
                                    &mut writer,
                                    400,
                                    &error_body(ERR_PARSE, &e.to_string()),
                                )
                                .await;
                            }
                        }
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }
}

async fn handle_request<C: Clock, W: AsyncWrite + Unpin>(
    request: crate::http::HttpRequest,
    router: &ToolRouter<C>,
    auth_token: Option<&str>,
    writer: &mut W,
) {
    match (request.method.as_str(), request.path.as_str()) {
        // Liveness probe: no auth, no JSON-RPC envelope
        ("GET", "/health") => {
            let body = serde_json::to_string(&router.health_view()).unwrap_or_default();
            let _ = http::write_response(writer, 200, &body).await;
        }
        ("POST", "/rpc") => {
            if let Some(expected) = auth_token {
                if request.bearer_token() != Some(expected) {
                    warn!("rpc request with missing or bad bearer token");
                    let _ = http::write_response(
                        writer,
                        401,
                        &error_body(ERR_UNAUTHORIZED, "unauthorized"),
                    )
                    .await;
                    return;
                }
            }
            let rpc_request: RpcRequest = match serde_json::from_str(&request.body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    let _ = http::write_response(
                        writer,
                        200,
                        &error_body(ERR_PARSE, &format!("malformed JSON-RPC request: {e}")),
                    )
                    .await;
                    return;
                }
            };
            let response = router.dispatch(rpc_request).await;
            let body = serde_json::to_string(&response).unwrap_or_default();
            let _ = http::write_response(writer, 200, &body).await;
        }
        (method, path) => {
            debug!(%method, %path, "unknown route");
            let _ = http::write_response(writer, 404, r#"{"error":"not found"}"#).await;
        }
    }
}

fn error_body(code: i64, message: &str) -> String {
    serde_json::to_string(&RpcResponse::error(None, RpcError::new(code, message)))
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
