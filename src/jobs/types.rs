// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! Job state types for background downloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ProgressEvent;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Status of a download job.
///
/// Terminal payloads are carried by the variant itself, so a job can never
/// hold both a result filename and an error message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum JobStatus {
    /// Registered, waiting for the first progress event
    Pending,
    /// Transfer in flight, with the latest progress snapshot
    Downloading(ProgressSnapshot),
    /// Finished; the named file is ready to retrieve
    Completed { filename: String },
    /// Failed with a human-readable cause
    Error { message: String },
}

impl JobStatus {
    /// Returns true once the job reached `completed` or `error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Error { .. })
    }

    /// Wire-level status label.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading(_) => "downloading",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Error { .. } => "error",
        }
    }
}

/// Latest transfer counters for a job in the `downloading` state.
///
/// Only meaningful while the job is downloading; readers must not assume the
/// snapshot persists into terminal states.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressSnapshot {
    /// Percent complete. Not clamped to [0, 100]: when the engine does not
    /// know the total size the denominator falls back to 1 and this value
    /// is nonsensical by design. Callers must tolerate it.
    pub percent: f64,
    /// Bytes transferred so far
    pub downloaded_bytes: u64,
    /// Bytes left, `total - downloaded`. May go negative when the engine's
    /// total is inaccurate; passed through as-is.
    pub remaining_bytes: i64,
    /// Engine-reported transfer speed, if any
    pub speed: Option<String>,
    /// Engine-reported time remaining, if any
    pub eta: Option<String>,
}

impl ProgressSnapshot {
    /// Build a snapshot from a raw engine event.
    ///
    /// An unknown or zero total is replaced by 1 to avoid a division fault,
    /// which deliberately leaves `percent` and `remaining_bytes` nonsensical
    /// in that case.
    pub fn from_event(event: &ProgressEvent) -> Self {
        let total = event.total_bytes.filter(|t| *t > 0).unwrap_or(1);
        Self {
            percent: event.downloaded_bytes as f64 / total as f64 * 100.0,
            downloaded_bytes: event.downloaded_bytes,
            remaining_bytes: total as i64 - event.downloaded_bytes as i64,
            speed: event.speed.clone(),
            eta: event.eta.clone(),
        }
    }

    /// Percent formatted for display, e.g. `"50.00%"`.
    pub fn percent_string(&self) -> String {
        format!("{:.2}%", self.percent)
    }

    /// Downloaded bytes formatted as megabytes, e.g. `"0.48 MB"`.
    pub fn downloaded_string(&self) -> String {
        format!("{:.2} MB", self.downloaded_bytes as f64 / BYTES_PER_MB)
    }

    /// Remaining bytes formatted as megabytes.
    pub fn remaining_string(&self) -> String {
        format!("{:.2} MB", self.remaining_bytes as f64 / BYTES_PER_MB)
    }

    /// Transfer speed for display, `"unknown"` when the engine gave none.
    pub fn speed_string(&self) -> String {
        self.speed.clone().unwrap_or_else(|| "unknown".to_string())
    }

    /// Time remaining for display, `"unknown"` when the engine gave none.
    pub fn eta_string(&self) -> String {
        self.eta.clone().unwrap_or_else(|| "unknown".to_string())
    }
}

/// One tracked download attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque unique handle, immutable after creation
    pub id: String,
    /// Source URL, immutable after creation
    pub url: String,
    /// Current status
    pub status: JobStatus,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            url: url.into(),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the status and bump the timestamp.
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
