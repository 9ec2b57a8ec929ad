// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! Download engine abstraction.
//!
//! The job tracker does not assume any particular extractor's API, only that
//! an engine can report byte counters while it works and resolve exactly once
//! with the final file path or an error. [`YtDlpEngine`] is the production
//! implementation; tests substitute their own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use futures_util::future::BoxFuture;

pub mod ytdlp;

pub use ytdlp::YtDlpEngine;

/// One progress event from a running download.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Bytes transferred so far
    pub downloaded_bytes: u64,
    /// Total transfer size, when the engine knows it
    pub total_bytes: Option<u64>,
    /// Human-readable transfer speed, e.g. `"1.23MiB/s"`
    pub speed: Option<String>,
    /// Human-readable time remaining, e.g. `"00:35"`
    pub eta: Option<String>,
}

/// Capability handed to an engine for reporting progress.
///
/// Must be callable from the engine's task; events for one download are
/// delivered in the order the engine produces them.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A media extraction/download engine.
///
/// Implementations save the output into `dest_dir` using the source's own
/// title and extension, invoke `sink` on every progress event, and resolve
/// with the final output path. The returned future is boxed so the service
/// can hold engines behind `Arc<dyn DownloadEngine>`.
pub trait DownloadEngine: Send + Sync {
    /// Run one download to completion or failure. Single attempt; the
    /// caller performs no retry.
    fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        sink: ProgressSink,
    ) -> BoxFuture<'static, Result<PathBuf>>;
}
