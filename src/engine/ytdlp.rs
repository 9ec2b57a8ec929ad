// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! yt-dlp subprocess engine.
//!
//! Drives a `yt-dlp` child process and turns its machine-readable progress
//! lines into [`ProgressEvent`]s. Output lands in the destination directory
//! under the source's own title and extension.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::{DownloadEngine, ProgressEvent, ProgressSink};

/// Sentinel prefixing each progress line so it can be told apart from the
/// final filepath print on stdout.
const PROGRESS_PREFIX: &str = "webgrab-progress|";

/// Progress template handed to yt-dlp: downloaded, total, speed, eta.
const PROGRESS_TEMPLATE: &str = "download:webgrab-progress|\
%(progress.downloaded_bytes)s|\
%(progress.total_bytes)s|\
%(progress._speed_str)s|\
%(progress._eta_str)s";

/// How much stderr to keep for the error message of a failed download.
const STDERR_TAIL_BYTES: usize = 2048;

/// Engine backed by the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    program: String,
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self { program: "yt-dlp".to_string() }
    }
}

impl YtDlpEngine {
    /// Use a specific executable instead of `yt-dlp` from PATH.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl DownloadEngine for YtDlpEngine {
    fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        sink: ProgressSink,
    ) -> BoxFuture<'static, Result<PathBuf>> {
        let program = self.program.clone();
        let url = url.to_string();
        let dest_dir = dest_dir.to_path_buf();

        async move { run_ytdlp(&program, &url, &dest_dir, sink).await }.boxed()
    }
}

async fn run_ytdlp(
    program: &str,
    url: &str,
    dest_dir: &Path,
    sink: ProgressSink,
) -> Result<PathBuf> {
    let mut child = Command::new(program)
        .args(ytdlp_args(url, dest_dir))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to launch {}", program))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("child stderr was not captured"))?;

    // Drain stderr concurrently so a chatty child can't deadlock on a full pipe.
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let mut reader = BufReader::new(stderr);
        let _ = reader.read_to_string(&mut buf).await;
        buf
    });

    let mut final_path: Option<PathBuf> = None;
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await.context("reading yt-dlp output")? {
        if let Some(event) = parse_progress_line(&line) {
            sink(event);
        } else if !line.trim().is_empty() {
            // The only non-progress stdout line is the final filepath print.
            final_path = Some(PathBuf::from(line.trim()));
        }
    }

    let status = child.wait().await.context("waiting for yt-dlp")?;
    let stderr_output = stderr_task.await.unwrap_or_default();

    if !status.success() {
        bail!(
            "yt-dlp exited with {}: {}",
            status,
            stderr_tail(&stderr_output)
        );
    }

    final_path.ok_or_else(|| anyhow!("yt-dlp did not report an output file for {}", url))
}

/// Full argument list for one download.
///
/// `--print` implies `--quiet`, and quiet mode suppresses the progress
/// display including `--progress-template` lines; `--progress` turns the
/// display back on so the template lines actually reach stdout.
fn ytdlp_args(url: &str, dest_dir: &Path) -> Vec<OsString> {
    vec![
        "--progress".into(),
        "--newline".into(),
        "--no-playlist".into(),
        "--no-simulate".into(),
        "--progress-template".into(),
        PROGRESS_TEMPLATE.into(),
        // Printed to stdout once the file reaches its final location
        "--print".into(),
        "after_move:filepath".into(),
        "--output".into(),
        dest_dir.join("%(title)s.%(ext)s").into_os_string(),
        url.into(),
    ]
}

/// Parse one `PROGRESS_TEMPLATE` line into an event. Returns `None` for
/// anything that is not a progress line.
fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split('|');

    let downloaded_bytes = parse_bytes(fields.next()?)?;
    let total_bytes = parse_bytes(fields.next()?);
    let speed = parse_display_field(fields.next()?);
    let eta = parse_display_field(fields.next()?);

    Some(ProgressEvent { downloaded_bytes, total_bytes, speed, eta })
}

/// yt-dlp renders missing numeric fields as "NA"; byte counters can also be
/// rendered as floats.
fn parse_bytes(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() || field == "NA" {
        return None;
    }
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().map(|f| f as u64))
}

/// Human-readable fields come through as "Unknown", "NA", or padded strings.
fn parse_display_field(field: &str) -> Option<String> {
    let field = field.trim();
    if field.is_empty() || field == "NA" || field.eq_ignore_ascii_case("unknown") {
        return None;
    }
    Some(field.to_string())
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_TAIL_BYTES {
        return trimmed.to_string();
    }
    let start = trimmed.len() - STDERR_TAIL_BYTES;
    // Stay on a char boundary
    let start = (start..trimmed.len())
        .find(|i| trimmed.is_char_boundary(*i))
        .unwrap_or(start);
    format!("...{}", &trimmed[start..])
}
