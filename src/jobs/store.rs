// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! Thread-safe store for job state.
//!
//! The store is the only shared mutable resource in the job tracker. Every
//! `update` call is applied as a unit under the write lock, so a concurrent
//! `get` always observes a consistent snapshot from a single update, never a
//! half-applied one.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};

use crate::locks::{resilient_read, resilient_write};
use super::types::{Job, JobStatus};

/// Concurrency-safe mapping from job id to job state.
#[derive(Debug, Default)]
pub struct ProgressStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl ProgressStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending job.
    ///
    /// A duplicate id means the generation scheme produced a collision; that
    /// is an internal invariant violation, reported as an error so the caller
    /// can regenerate rather than clobber a live job.
    pub fn create(&self, id: &str, url: &str) -> Result<()> {
        let mut jobs = resilient_write(&self.jobs);
        if jobs.contains_key(id) {
            bail!("job id {} already exists", id);
        }
        jobs.insert(id.to_string(), Job::new(id, url));
        Ok(())
    }

    /// Apply one status update atomically.
    ///
    /// An unknown id should not occur under correct operation; it is logged
    /// and ignored because there is no actionable recovery.
    pub fn update(&self, id: &str, status: JobStatus) {
        let mut jobs = resilient_write(&self.jobs);
        match jobs.get_mut(id) {
            Some(job) => job.set_status(status),
            None => {
                tracing::warn!("dropping status update for unknown job {}", id);
            }
        }
    }

    /// Cloned snapshot of the current state, or `None` for an unknown id.
    ///
    /// `None` is a normal outcome, not an error; the service layer maps it
    /// to the `unknown` sentinel.
    pub fn get(&self, id: &str) -> Option<Job> {
        resilient_read(&self.jobs).get(id).cloned()
    }

    /// Number of tracked jobs.
    pub fn len(&self) -> usize {
        resilient_read(&self.jobs).len()
    }

    /// True when no jobs are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::ProgressSnapshot;
    use std::sync::Arc;

    #[test]
    fn test_create_and_get() {
        let store = ProgressStore::new();
        store.create("abc123", "https://example.com/v").unwrap();

        let job = store.get("abc123").expect("job should exist");
        assert_eq!(job.id, "abc123");
        assert_eq!(job.url, "https://example.com/v");
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_create_duplicate_id_fails() {
        let store = ProgressStore::new();
        store.create("abc123", "https://example.com/a").unwrap();
        assert!(store.create("abc123", "https://example.com/b").is_err());

        // The original job is untouched
        assert_eq!(store.get("abc123").unwrap().url, "https://example.com/a");
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let store = ProgressStore::new();
        assert!(store.get("never-created").is_none());
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let store = ProgressStore::new();
        store.update("ghost", JobStatus::Error { message: "x".into() });
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_replaces_status_as_a_unit() {
        let store = ProgressStore::new();
        store.create("abc123", "https://example.com/v").unwrap();

        let snap = ProgressSnapshot {
            percent: 50.0,
            downloaded_bytes: 500_000,
            remaining_bytes: 500_000,
            speed: Some("1.00MiB/s".into()),
            eta: Some("00:05".into()),
        };
        store.update("abc123", JobStatus::Downloading(snap.clone()));

        match store.get("abc123").unwrap().status {
            JobStatus::Downloading(got) => assert_eq!(got, snap),
            other => panic!("unexpected status {:?}", other),
        }

        store.update("abc123", JobStatus::Completed { filename: "v.mp4".into() });
        assert!(store.get("abc123").unwrap().status.is_terminal());
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let store = Arc::new(ProgressStore::new());
        let writers = 8;
        let updates_per_writer = 200;

        let mut handles = Vec::new();
        for w in 0..writers {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let id = format!("job-{}", w);
                store.create(&id, "https://example.com/v").unwrap();
                for i in 0..updates_per_writer {
                    let snap = ProgressSnapshot {
                        percent: i as f64,
                        downloaded_bytes: i,
                        remaining_bytes: updates_per_writer as i64 - i as i64,
                        speed: None,
                        eta: None,
                    };
                    store.update(&id, JobStatus::Downloading(snap));
                }
                store.update(&id, JobStatus::Completed { filename: format!("{}.mp4", id) });
            }));
        }

        // Concurrent readers hammering all ids, known and unknown
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    let _ = store.get(&format!("job-{}", i % 10));
                }
            }));
        }

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(store.len(), writers as usize);
        for w in 0..writers {
            let job = store.get(&format!("job-{}", w)).unwrap();
            assert_eq!(
                job.status,
                JobStatus::Completed { filename: format!("job-{}.mp4", w) }
            );
        }
    }
}
