// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! Job lifecycle façade consumed by the HTTP layer.

use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;

use crate::engine::DownloadEngine;
use super::runner;
use super::store::ProgressStore;
use super::types::Job;

/// Entry point for job lifecycle operations.
///
/// Creates jobs (id generation, registration, runner spawn) and answers
/// progress queries. Cloning is cheap; all clones share one store.
#[derive(Clone)]
pub struct JobManager {
    store: Arc<ProgressStore>,
    engine: Arc<dyn DownloadEngine>,
    download_dir: PathBuf,
}

impl JobManager {
    /// Create a manager that saves downloads under `download_dir`.
    pub fn new(engine: Arc<dyn DownloadEngine>, download_dir: PathBuf) -> Self {
        Self {
            store: Arc::new(ProgressStore::new()),
            engine,
            download_dir,
        }
    }

    /// Start a new download job and return its id immediately.
    ///
    /// The job runs unsupervised by the caller: this never blocks on the
    /// download, and there is deliberately no cap on how many jobs run at
    /// once (unbounded fan-out, a documented resource-exhaustion risk).
    pub fn create_job(&self, url: &str) -> String {
        let id = loop {
            let candidate = new_job_id();
            match self.store.create(&candidate, url) {
                Ok(()) => break candidate,
                // 32-bit ids can collide; regenerate instead of clobbering
                Err(_) => tracing::warn!("job id collision on {}, regenerating", candidate),
            }
        };

        runner::spawn(
            Arc::clone(&self.store),
            Arc::clone(&self.engine),
            id.clone(),
            url.to_string(),
            self.download_dir.clone(),
        );

        id
    }

    /// Latest snapshot for a job, or `None` for an id that was never
    /// created. Garbage ids are normal traffic, not errors.
    pub fn get_progress(&self, id: &str) -> Option<Job> {
        self.store.get(id)
    }

    /// Number of jobs tracked since startup.
    pub fn job_count(&self) -> usize {
        self.store.len()
    }
}

/// Generate a random 4-byte hex job id.
///
/// 32 bits of entropy is collision-resistant enough at this scale; widen it
/// before adopting this service anywhere job volume is large enough to risk
/// birthday-bound collisions.
fn new_job_id() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
