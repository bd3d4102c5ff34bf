// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Session-level identity: host alias, output location, waterline.
    pub session: SessionConfig,
    /// Selection-loop knobs (reset budget, directory worker pool).
    pub selection: SelectionConfig,
    /// Store retry/backoff policy.
    pub retry: RetryConfig,
    /// Optional YAML seeds for the in-memory stores used by the binary.
    #[serde(default)]
    pub stores: StoreSeeds,
}

/// Parameters describing the recurring session itself.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SessionConfig {
    #[serde(rename = "Host")]
    /// Alias injected when the attendance count is odd.
    pub host: String,

    #[serde(rename = "MatchFileDir", default = "default_match_dir")]
    /// Directory the match CSV files are written into.
    pub match_file_dir: PathBuf,

    #[serde(rename = "RepeatWaterlineMonths", default = "default_waterline")]
    /// How far back a repeated pairing must lie to be admissible when no
    /// fresh partner exists.
    pub repeat_waterline_months: u32,
}

/// Knobs for the selection loop.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SelectionConfig {
    #[serde(rename = "MaxResets", default = "default_max_resets")]
    /// Reset budget before a run is declared infeasible.
    pub max_resets: u32,

    #[serde(rename = "DirectoryWorkers", default = "default_workers")]
    /// Upper bound on concurrent directory lookups during bulk resolution.
    pub directory_workers: usize,
}

/// Retry/backoff policy applied to every store operation.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RetryConfig {
    #[serde(rename = "MaxAttempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "BaseDelayMs", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(rename = "BackoffFactor", default = "default_backoff_factor")]
    pub backoff_factor: u32,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Seed files for the binary's in-memory stores. The library itself never
/// reads these; callers embedding the engine bring their own store handles.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct StoreSeeds {
    #[serde(rename = "Directory", default)]
    pub directory: Option<PathBuf>,
    #[serde(rename = "History", default)]
    pub history: Option<PathBuf>,
}

fn default_match_dir() -> PathBuf {
    PathBuf::from("./match_files")
}

fn default_waterline() -> u32 {
    12
}

fn default_max_resets() -> u32 {
    5
}

fn default_workers() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> u32 {
    2
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        self.session.host = self.session.host.trim().to_string();
        ensure!(!self.session.host.is_empty(), "Host must not be empty");

        ensure!(
            self.session.repeat_waterline_months >= 1,
            "RepeatWaterlineMonths must be >= 1"
        );
        ensure!(
            self.selection.directory_workers >= 1,
            "DirectoryWorkers must be >= 1"
        );
        ensure!(self.retry.max_attempts >= 1, "MaxAttempts must be >= 1");
        ensure!(self.retry.backoff_factor >= 1, "BackoffFactor must be >= 1");

        Ok(())
    }
}
