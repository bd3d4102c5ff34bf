// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};

/// Environment variable that overrides the config path argument.
pub const CONFIG_ENV: &str = "FUSE_PAIRING_CONFIG";

/// Resolves the configuration file path: the `FUSE_PAIRING_CONFIG`
/// environment variable wins over the given argument, relative paths are
/// anchored at the working directory, and the result must be an existing
/// file.
pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let raw = std::env::var(CONFIG_ENV).unwrap_or_else(|_| rel.to_string());
    let p = PathBuf::from(&raw);

    let abs = if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;
    ensure!(canon.is_file(), "config path {canon:?} is not a file");

    Ok(canon)
}
