// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! webgrab - self-hosted media download service
//!
//! Submit a media URL over HTTP, let the service pull it down in the
//! background with yt-dlp, and poll for live progress until the file is
//! ready to retrieve.
//!
//! # Core Modules
//!
//! - [`jobs`] - Concurrent job tracking: store, runner, and manager
//! - [`engine`] - Download engine abstraction and the yt-dlp implementation
//! - [`server`] - HTTP API and embedded front end
//! - [`auth`] - Token verification for the API surface
//! - [`config`] - On-disk configuration

pub mod auth;
pub mod config;
pub mod engine;
pub mod jobs;
pub mod locks;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use engine::{DownloadEngine, ProgressEvent, ProgressSink, YtDlpEngine};
pub use jobs::{Job, JobManager, JobStatus, ProgressSnapshot, ProgressStore};
pub use server::Server;
