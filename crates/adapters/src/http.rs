// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 client over TCP.
//!
//! Sends one request per connection and reads the response using
//! Content-Length framing (does not depend on connection close for EOF).
//! Shared by the document store client, the room client, and the remote
//! execution backend.

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Per-request timeout covering connect + write + read.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Io(String),
    #[error("request timed out")]
    Timeout,
    /// Non-2xx response with its status code and body.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl HttpError {
    /// Status code of a `Status` error, if that's what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub async fn get(addr: &str, path: &str, token: Option<&str>) -> Result<String, HttpError> {
    request(addr, "GET", path, token, None).await
}

pub async fn post(
    addr: &str,
    path: &str,
    token: Option<&str>,
    body: &str,
) -> Result<String, HttpError> {
    request(addr, "POST", path, token, Some(body)).await
}

pub async fn patch(
    addr: &str,
    path: &str,
    token: Option<&str>,
    body: &str,
) -> Result<String, HttpError> {
    request(addr, "PATCH", path, token, Some(body)).await
}

/// Send one request and read the response, bounded by [`REQUEST_TIMEOUT`].
pub async fn request(
    addr: &str,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> Result<String, HttpError> {
    let raw = encode_request(method, path, addr, token, body);
    tokio::time::timeout(REQUEST_TIMEOUT, send_request(addr, &raw))
        .await
        .map_err(|_| HttpError::Timeout)?
}

fn encode_request(
    method: &str,
    path: &str,
    host: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> String {
    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n");
    if let Some(token) = token {
        request.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    match body {
        Some(body) => {
            request.push_str(&format!(
                "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            ));
        }
        None => request.push_str("\r\n"),
    }
    request
}

async fn send_request(addr: &str, request: &str) -> Result<String, HttpError> {
    let mut stream =
        TcpStream::connect(addr).await.map_err(|e| HttpError::Connect(e.to_string()))?;
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| HttpError::Io(format!("write failed: {e}")))?;

    let mut reader = BufReader::new(&mut stream);
    read_response(&mut reader).await
}

/// Read and parse an HTTP/1.1 response from a buffered stream.
pub(crate) async fn read_response<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<String, HttpError> {
    // Status line
    let mut status_line = String::new();
    reader
        .read_line(&mut status_line)
        .await
        .map_err(|e| HttpError::Io(format!("read status failed: {e}")))?;
    let status_code =
        status_line.split_whitespace().nth(1).and_then(|s| s.parse::<u16>().ok()).unwrap_or(0);

    // Headers — extract Content-Length (case-insensitive)
    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| HttpError::Io(format!("read header failed: {e}")))?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let line_lower = line.to_ascii_lowercase();
        if let Some(val) = line_lower.strip_prefix("content-length:") {
            content_length = val.trim().parse().unwrap_or(0);
        }
    }

    // Body
    let body = if content_length > 0 {
        let mut buf = vec![0u8; content_length];
        reader
            .read_exact(&mut buf)
            .await
            .map_err(|e| HttpError::Io(format!("read body failed: {e}")))?;
        String::from_utf8_lossy(&buf).into_owned()
    } else {
        String::new()
    };

    if status_code >= 400 {
        return Err(HttpError::Status { status: status_code, body: body.trim().to_string() });
    }

    Ok(body)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
