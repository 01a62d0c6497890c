// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

async fn parse(raw: &str) -> Result<HttpRequest, HttpServeError> {
    let mut reader = BufReader::new(raw.as_bytes());
    read_request(&mut reader).await
}

#[tokio::test]
async fn parses_post_with_body() {
    let raw = "POST /rpc HTTP/1.1\r\nHost: x\r\nContent-Length: 7\r\n\r\n{\"a\":1}";
    let req = parse(raw).await.unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/rpc");
    assert_eq!(req.body, "{\"a\":1}");
}

#[tokio::test]
async fn parses_get_without_body() {
    let req = parse("GET /health HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/health");
    assert!(req.body.is_empty());
}

#[tokio::test]
async fn header_lookup_is_case_insensitive() {
    let raw = "POST /rpc HTTP/1.1\r\nAuthorization: Bearer tok-1\r\nContent-Length: 0\r\n\r\n";
    let req = parse(raw).await.unwrap();
    assert_eq!(req.header("AUTHORIZATION"), Some("Bearer tok-1"));
    assert_eq!(req.bearer_token(), Some("tok-1"));
}

#[tokio::test]
async fn missing_bearer_prefix_yields_none() {
    let raw = "POST /rpc HTTP/1.1\r\nAuthorization: Basic abc\r\nContent-Length: 0\r\n\r\n";
    let req = parse(raw).await.unwrap();
    assert!(req.bearer_token().is_none());
}

#[tokio::test]
async fn empty_stream_is_connection_closed() {
    assert!(matches!(parse("").await, Err(HttpServeError::ConnectionClosed)));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let raw = "POST /rpc HTTP/1.1\r\nContent-Length: 9999999\r\n\r\n";
    assert!(matches!(parse(raw).await, Err(HttpServeError::BodyTooLarge(_))));
}

#[tokio::test]
async fn write_response_frames_with_content_length() {
    let mut out = Vec::new();
    write_response(&mut out, 200, "{\"ok\":true}").await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Length: 11\r\n"));
    assert!(text.ends_with("{\"ok\":true}"));
}
