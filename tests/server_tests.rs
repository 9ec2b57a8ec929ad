// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! In-process tests for the HTTP surface.
//!
//! The router is exercised directly with `tower::ServiceExt::oneshot` and a
//! mock download engine, so no network listener or yt-dlp binary is needed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use webgrab::engine::{DownloadEngine, ProgressEvent, ProgressSink};
use webgrab::server::Server;

const TOKEN: &str = "test-token";

/// Engine double: emits one progress event, then completes or fails.
struct MockEngine {
    event: Option<ProgressEvent>,
    outcome: Result<String, String>,
}

impl DownloadEngine for MockEngine {
    fn download(
        &self,
        _url: &str,
        dest_dir: &Path,
        sink: ProgressSink,
    ) -> BoxFuture<'static, anyhow::Result<PathBuf>> {
        let event = self.event.clone();
        let outcome = self.outcome.clone();
        let dest = dest_dir.to_path_buf();
        async move {
            if let Some(event) = event {
                sink(event);
            }
            match outcome {
                Ok(filename) => Ok(dest.join(filename)),
                Err(message) => anyhow::bail!("{}", message),
            }
        }
        .boxed()
    }
}

fn completing_router(dir: &Path) -> Router {
    let engine = MockEngine {
        event: Some(ProgressEvent {
            downloaded_bytes: 500_000,
            total_bytes: Some(1_000_000),
            speed: Some("1.00MiB/s".to_string()),
            eta: Some("00:01".to_string()),
        }),
        outcome: Ok("video1.mp4".to_string()),
    };
    Server::new(0)
        .with_api_token(TOKEN)
        .with_download_dir(dir)
        .with_engine(Arc::new(engine))
        .build_router()
}

fn failing_router() -> Router {
    let engine = MockEngine {
        event: None,
        outcome: Err("Unsupported URL: not-a-real-url".to_string()),
    };
    Server::new(0)
        .with_api_token(TOKEN)
        .with_engine(Arc::new(engine))
        .build_router()
}

/// Request builder with auth and a client IP for the rate limiter.
fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", TOKEN)
        .header("x-forwarded-for", "127.0.0.1")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn create_job(router: &Router, url: &str) -> String {
    let response = router
        .clone()
        .oneshot(
            request("POST", "/api/downloads")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "url": url }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn poll(router: &Router, id: &str) -> Value {
    let response = router
        .clone()
        .oneshot(request("GET", &format!("/api/downloads/{}", id)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn poll_until_terminal(router: &Router, id: &str) -> Value {
    for _ in 0..200 {
        let data = poll(router, id).await;
        let status = data["status"].as_str().unwrap();
        if status == "completed" || status == "error" {
            return data;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never reached a terminal state", id);
}

// =============================================================================
// Health and auth
// =============================================================================

#[tokio::test]
async fn test_health_needs_no_auth() {
    let router = failing_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-forwarded-for", "127.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn test_api_rejects_missing_token() {
    let router = failing_router();
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/downloads/abc123")
                .header("x-forwarded-for", "127.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_rejects_wrong_token() {
    let router = failing_router();
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/downloads/abc123")
                .header("x-api-key", "wrong")
                .header("x-forwarded-for", "127.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Job lifecycle over HTTP
// =============================================================================

#[tokio::test]
async fn test_download_lifecycle_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let router = completing_router(dir.path());

    let id = create_job(&router, "https://example.com/video1").await;
    assert_eq!(id.len(), 8);

    // Immediately queryable: pending or already further along, never unknown
    let first = poll(&router, &id).await;
    assert_ne!(first["status"], "unknown");

    let done = poll_until_terminal(&router, &id).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["filename"], "video1.mp4");
    assert!(done.get("error").is_none());
}

#[tokio::test]
async fn test_failed_download_reports_error() {
    let router = failing_router();
    let id = create_job(&router, "https://example.com/broken").await;

    let done = poll_until_terminal(&router, &id).await;
    assert_eq!(done["status"], "error");
    assert!(done["error"].as_str().unwrap().contains("Unsupported URL"));
    assert!(done.get("filename").is_none());
}

#[tokio::test]
async fn test_unknown_id_is_sentinel_not_error() {
    let router = failing_router();
    let data = poll(&router, "deadbeef").await;
    assert_eq!(data, json!({ "status": "unknown" }));
}

#[tokio::test]
async fn test_create_rejects_bad_urls() {
    let router = failing_router();
    for bad in ["", "   ", "ftp://example.com/v", "not-a-real-url"] {
        let response = router
            .clone()
            .oneshot(
                request("POST", "/api/downloads")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "url": bad }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "url {:?}", bad);
    }
}

// =============================================================================
// File retrieval
// =============================================================================

#[tokio::test]
async fn test_file_fetch_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("video1.mp4"), b"fake media bytes").unwrap();

    let router = completing_router(dir.path());
    let response = router
        .oneshot(request("GET", "/api/files/video1.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("video1.mp4"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"fake media bytes");
}

#[tokio::test]
async fn test_file_fetch_streams_large_file() {
    let dir = tempfile::tempdir().unwrap();
    // Several MB, well past anything an in-memory JSON response would carry
    let payload = vec![0xabu8; 4 * 1024 * 1024];
    std::fs::write(dir.path().join("big.mp4"), &payload).unwrap();

    let router = completing_router(dir.path());
    let response = router
        .oneshot(request("GET", "/api/files/big.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The length is known up front from file metadata, not from buffering
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok()),
        Some("4194304")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.len(), payload.len());
    assert!(bytes.iter().all(|b| *b == 0xab));
}

#[tokio::test]
async fn test_file_fetch_missing_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = completing_router(dir.path());
    let response = router
        .oneshot(request("GET", "/api/files/nope.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_fetch_rejects_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let router = completing_router(dir.path());
    for name in ["..%2F..%2Fetc%2Fpasswd", "..", "a%5Cb"] {
        let response = router
            .clone()
            .oneshot(
                request("GET", &format!("/api/files/{}", name))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "name {:?}", name);
    }
}
