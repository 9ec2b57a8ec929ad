// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! API server
//!
//! HTTP surface for the download service and the embedded front end.
//!
//! # Endpoints
//!
//! - `GET /` - Static front end
//! - `GET /health` - Health check (no auth)
//! - `POST /api/downloads` - Start a background download, returns `{id}`
//! - `GET /api/downloads/:id` - Poll job progress; unknown ids return
//!   `{"status": "unknown"}` with 200
//! - `GET /api/files/:filename` - Retrieve a finished download
//!
//! All endpoints except `/health` require the configured API token.
//!
//! # Example
//!
//! ```no_run
//! use webgrab::server::Server;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = Server::new(8642).with_api_token("sekrit");
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::timeout::TimeoutLayer;
use tokio_util::io::ReaderStream;

use crate::auth::{self, TokenDigest};
use crate::engine::{DownloadEngine, YtDlpEngine};
use crate::jobs::{Job, JobManager, JobStatus};

// Request bodies only ever carry a URL
const MAX_BODY_SIZE: usize = 16 * 1024;
const MAX_URL_LENGTH: usize = 2048;
// Handlers do no long-running work; downloads happen in background jobs
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server state shared across handlers.
pub struct AppState {
    /// Job lifecycle façade.
    pub manager: JobManager,
    /// Directory finished files are served from.
    pub download_dir: PathBuf,
    /// Digest of the configured API token.
    token_digest: TokenDigest,
}

/// API server configuration.
pub struct Server {
    /// Port to listen on.
    port: u16,
    /// Address to bind to (defaults to 127.0.0.1 for security).
    bind_address: String,
    /// Directory downloads are saved into.
    download_dir: PathBuf,
    /// API token required on every request except /health.
    api_token: String,
    /// Download engine; yt-dlp unless overridden (tests swap in a mock).
    engine: Arc<dyn DownloadEngine>,
}

impl Server {
    /// Create a new server with the specified port.
    /// By default, binds to 127.0.0.1 (localhost only) for security.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            bind_address: "127.0.0.1".to_string(),
            download_dir: PathBuf::from("downloads"),
            api_token: String::new(),
            engine: Arc::new(YtDlpEngine::default()),
        }
    }

    /// Set the bind address.
    /// Use "0.0.0.0" to allow network access, "127.0.0.1" (default) for localhost only.
    pub fn with_bind_address(mut self, addr: impl Into<String>) -> Self {
        self.bind_address = addr.into();
        self
    }

    /// Set the directory downloads are saved into and served from.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set the API token clients must present.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = token.into();
        self
    }

    /// Replace the download engine.
    pub fn with_engine(mut self, engine: Arc<dyn DownloadEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Build the router with all routes.
    pub fn build_router(&self) -> Router {
        let state = Arc::new(AppState {
            manager: JobManager::new(Arc::clone(&self.engine), self.download_dir.clone()),
            download_dir: self.download_dir.clone(),
            token_digest: auth::token_digest(&self.api_token),
        });

        // Rate limiting: 60 requests per minute per IP, with room for a
        // polling front end to burst
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(1)
                .burst_size(60)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .expect("Failed to build governor config"),
        );

        let protected = Router::new()
            .route("/", get(index_handler))
            .route("/api/downloads", post(create_download_handler))
            .route("/api/downloads/:id", get(progress_handler))
            .route("/api/files/:filename", get(file_handler))
            .layer(middleware::from_fn_with_state(state.clone(), require_auth));

        Router::new()
            .route("/health", get(health_handler))
            .merge(protected)
            .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
            .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
            .layer(GovernorLayer { config: governor_conf })
            .with_state(state)
    }

    /// Start the server with graceful shutdown.
    pub async fn start(&self) -> Result<()> {
        std::fs::create_dir_all(&self.download_dir).map_err(|e| {
            anyhow::anyhow!(
                "failed to create download directory {:?}: {}",
                self.download_dir,
                e
            )
        })?;

        let router = self.build_router();
        let addr = format!("{}:{}", self.bind_address, self.port);

        tracing::info!("Starting server on {}", addr);

        // Security warning if binding to all interfaces
        if self.bind_address == "0.0.0.0" {
            tracing::warn!(
                "Server is binding to 0.0.0.0 which exposes the API to the network. \
                Use 127.0.0.1 (default) for local-only access."
            );
        }

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                anyhow::anyhow!(
                    "Port {} is already in use. This usually means another webgrab \
                    instance is running. Stop it or pick a different port with --port.",
                    self.port
                )
            } else {
                anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
            }
        })?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }

    /// Get the port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    jobs: usize,
}

/// Download creation request.
#[derive(Deserialize)]
struct CreateDownloadRequest {
    url: String,
}

/// Download creation response.
#[derive(Serialize)]
struct CreateDownloadResponse {
    id: String,
}

/// Progress poll response. Fields beyond `status` appear only in the states
/// where they are meaningful.
#[derive(Serialize)]
struct ProgressResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    downloaded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ProgressResponse {
    fn status_only(status: &'static str) -> Self {
        Self {
            status,
            progress: None,
            downloaded: None,
            remaining: None,
            speed: None,
            eta: None,
            filename: None,
            error: None,
        }
    }

    fn from_job(job: Option<Job>) -> Self {
        let Some(job) = job else {
            return Self::status_only("unknown");
        };
        let label = job.status.label();
        match job.status {
            JobStatus::Pending => Self::status_only(label),
            JobStatus::Downloading(snap) => Self {
                progress: Some(snap.percent_string()),
                downloaded: Some(snap.downloaded_string()),
                remaining: Some(snap.remaining_string()),
                speed: Some(snap.speed_string()),
                eta: Some(snap.eta_string()),
                ..Self::status_only(label)
            },
            JobStatus::Completed { filename } => Self {
                filename: Some(filename),
                ..Self::status_only(label)
            },
            JobStatus::Error { message } => Self {
                error: Some(message),
                ..Self::status_only(label)
            },
        }
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Reject any request that does not carry the configured API token.
async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match auth::extract_token(request.headers()) {
        Some(token) if auth::verify_token(token, &state.token_digest) => {
            next.run(request).await
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "missing or invalid API token" })),
        )
            .into_response(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        jobs: state.manager.job_count(),
    })
}

/// Embedded front end.
async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// Start a background download job.
///
/// Validation happens here, before the job tracker is touched; a rejected
/// URL never creates a job.
async fn create_download_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDownloadRequest>,
) -> Result<Json<CreateDownloadResponse>, (StatusCode, String)> {
    let url = request.url.trim();

    if url.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "url must not be empty".to_string()));
    }
    if url.len() > MAX_URL_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("url exceeds maximum length of {} characters", MAX_URL_LENGTH),
        ));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err((
            StatusCode::BAD_REQUEST,
            "url must start with http:// or https://".to_string(),
        ));
    }

    let id = state.manager.create_job(url);
    tracing::info!("created download job {}", id);

    Ok(Json(CreateDownloadResponse { id }))
}

/// Poll job progress.
///
/// Always 200: an unknown or garbage id is normal traffic and maps to the
/// `unknown` sentinel, never to an HTTP error.
async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ProgressResponse> {
    Json(ProgressResponse::from_job(state.manager.get_progress(&id)))
}

/// Stream a finished download as an attachment.
///
/// Media files can run to gigabytes, so the body is streamed from disk
/// rather than buffered into memory.
async fn file_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    // The download directory is flat; anything that could walk out of it is
    // rejected outright.
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err((StatusCode::BAD_REQUEST, "invalid filename".to_string()));
    }

    let path = state.download_dir.join(&filename);
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            (StatusCode::NOT_FOUND, "file not found".to_string())
        } else {
            tracing::error!("failed to open {:?}: {}", path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to read file".to_string())
        }
    })?;

    let metadata = file.metadata().await.map_err(|e| {
        tracing::error!("failed to stat {:?}: {}", path, e);
        (StatusCode::INTERNAL_SERVER_ERROR, "failed to read file".to_string())
    })?;
    if !metadata.is_file() {
        return Err((StatusCode::NOT_FOUND, "file not found".to_string()));
    }

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', "_"));
    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            tracing::error!("failed to build file response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to read file".to_string())
        })
}

// =============================================================================
// Utilities
// =============================================================================

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    // On Unix, listen for SIGINT and SIGTERM
    // On Windows, fall back to Ctrl+C only
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
    }

    tracing::info!("Running jobs are abandoned at shutdown; their state is in-memory only");
}
