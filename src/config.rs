// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! On-disk configuration.
//!
//! Settings live at `~/.webgrab/config.json`. The first run generates an API
//! token and writes the file; later runs read it back, with CLI flags taking
//! precedence. Saves go through a temp file and an atomic rename so a crash
//! mid-write cannot corrupt the config.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth;

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 8642;

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Address to bind to; 127.0.0.1 unless explicitly opened up
    pub bind_address: String,
    /// Directory downloads are saved into
    pub download_dir: PathBuf,
    /// API token required on every request except /health
    pub api_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: "127.0.0.1".to_string(),
            download_dir: default_download_dir(),
            api_token: String::new(),
        }
    }
}

impl Config {
    /// Config file path under the home directory.
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".webgrab").join("config.json"))
            .unwrap_or_else(|| PathBuf::from(".webgrab/config.json"))
    }

    /// Load the config, creating it with a fresh API token on first run.
    pub fn load_or_init() -> Result<Self> {
        let path = Self::path();
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config at {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse config at {:?}", path))?;
            return Ok(config);
        }

        let config = Config {
            api_token: auth::generate_token(),
            ..Config::default()
        };
        config.save()?;
        tracing::info!("wrote initial config to {:?}", path);
        Ok(config)
    }

    /// Persist the config with an atomic temp-file rename.
    pub fn save(&self) -> Result<()> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(self).context("failed to serialize config")?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)
            .with_context(|| format!("failed to write {:?}", temp_path))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("failed to move config into place at {:?}", path))?;
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("webgrab"))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}
