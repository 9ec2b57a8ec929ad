// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! Per-job download execution.
//!
//! Each job gets its own supervised tokio task that drives the download
//! engine and feeds progress into the [`ProgressStore`]. Every failure mode,
//! including a panic inside the engine, ends as a terminal `error` state on
//! the owning job; nothing escapes into the service layer or other jobs.

use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{DownloadEngine, ProgressSink};
use super::store::ProgressStore;
use super::types::{JobStatus, ProgressSnapshot};

/// Spawn the supervised task for one job. Fire-and-forget: the caller never
/// awaits the download itself.
pub(crate) fn spawn(
    store: Arc<ProgressStore>,
    engine: Arc<dyn DownloadEngine>,
    id: String,
    url: String,
    dest_dir: PathBuf,
) {
    let task = tokio::spawn(run_job(
        Arc::clone(&store),
        engine,
        id.clone(),
        url,
        dest_dir,
    ));

    // Supervisor: a panicking engine must surface as a failed job, not a
    // crashed process or a job stuck in `downloading` forever.
    tokio::spawn(async move {
        if let Err(err) = task.await {
            if err.is_panic() {
                tracing::error!("download task for job {} panicked", id);
                store.update(
                    &id,
                    JobStatus::Error {
                        message: "download task panicked".to_string(),
                    },
                );
            }
        }
    });
}

/// Run one download to a terminal state.
async fn run_job(
    store: Arc<ProgressStore>,
    engine: Arc<dyn DownloadEngine>,
    id: String,
    url: String,
    dest_dir: PathBuf,
) {
    let sink: ProgressSink = {
        let store = Arc::clone(&store);
        let id = id.clone();
        Arc::new(move |event| {
            store.update(&id, JobStatus::Downloading(ProgressSnapshot::from_event(&event)));
        })
    };

    // Single attempt, fail-fast: no retry on engine errors.
    match engine.download(&url, &dest_dir, sink).await {
        Ok(path) => {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            tracing::info!("job {} completed: {}", id, filename);
            store.update(&id, JobStatus::Completed { filename });
        }
        Err(e) => {
            tracing::warn!("job {} failed: {:#}", id, e);
            store.update(&id, JobStatus::Error { message: format!("{:#}", e) });
        }
    }
}
