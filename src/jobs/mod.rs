// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! Concurrent job tracking for background downloads.
//!
//! This module is the core of webgrab: it creates download jobs, runs each
//! one in its own tokio task, records live progress safely under concurrent
//! reads and writes, and answers progress queries.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  create_job   ┌───────────────┐
//! │ HTTP layer  │──────────────▶│  JobManager   │
//! │  (server)   │◀──────────────│               │
//! └─────────────┘  get_progress └───────┬───────┘
//!                                       │ spawn (one task per job)
//!                                       ▼
//!                               ┌───────────────┐     ┌────────────────┐
//!                               │   JobRunner   │────▶│ DownloadEngine │
//!                               └───────┬───────┘     │   (yt-dlp)     │
//!                                       │ update      └────────────────┘
//!                                       ▼
//!                               ┌───────────────┐
//!                               │ ProgressStore │
//!                               └───────────────┘
//! ```
//!
//! Jobs never cross-talk: each job is mutated only by the runner task that
//! owns it, and a failure in one job leaves every other job untouched. Job
//! state is in-memory only and lives for the lifetime of the process.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webgrab::jobs::JobManager;
//! use webgrab::engine::YtDlpEngine;
//!
//! let manager = JobManager::new(Arc::new(YtDlpEngine::default()), "/tmp/downloads".into());
//! let id = manager.create_job("https://example.com/video1");
//! let job = manager.get_progress(&id); // Some(Job) with status pending
//! ```

pub mod manager;
pub mod runner;
pub mod store;
pub mod types;

// Re-export commonly used items
pub use manager::JobManager;
pub use store::ProgressStore;
pub use types::{Job, JobStatus, ProgressSnapshot};
