// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use fuse_pairing_rs::{
    cfg::{
        cli::resolve_config_path,
        config::Config,
        enums::RunMode,
        logger::init_logger,
    },
    engine::{EngineSettings, PairingEngine},
    handlers::session::run_session,
    store::{
        attendance::MemoryAttendance,
        directory::MemoryDirectory,
        history::MemoryHistory,
        retry::RetryPolicy,
    },
    utils::parse_session_date,
};
use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

fn usage() -> ! {
    eprintln!("usage: fuse-pairing-rs <config.yaml> <roster.csv> <session-date> [--test]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        usage();
    }
    let mode = if args.iter().any(|a| a == "--test") {
        RunMode::Test
    } else {
        RunMode::Live
    };

    let config_path = resolve_config_path(&args[0])?;
    let config_path_str = config_path
        .to_str()
        .context("config path is not valid UTF-8")?;
    let _logger_guard = init_logger(config_path_str)?;

    let cfg = Config::load_from_file(&config_path)
        .context("failed to resolve or load config")?;

    let date = parse_session_date(&args[2])?;
    let roster = std::fs::read_to_string(&args[1])
        .with_context(|| format!("failed to read roster {}", args[1]))?;

    // Seed the in-memory stores; a real deployment plugs database-backed
    // handles in here instead.
    let directory = Arc::new(match &cfg.stores.directory {
        Some(path) => MemoryDirectory::load_from_file(path)
            .with_context(|| format!("failed to load directory seed {path:?}"))?,
        None => bail!("config must name a Directory seed under stores:"),
    });
    let history = Arc::new(match &cfg.stores.history {
        Some(path) if path.exists() => MemoryHistory::load_from_file(path)
            .with_context(|| format!("failed to load history seed {path:?}"))?,
        _ => MemoryHistory::new(),
    });
    let attendance = MemoryAttendance::new();

    let retry = RetryPolicy {
        max_attempts: cfg.retry.max_attempts,
        base_delay: cfg.retry.base_delay(),
        backoff_factor: cfg.retry.backoff_factor,
    };
    let mut engine = PairingEngine::new(
        Arc::clone(&directory),
        Arc::clone(&history),
        EngineSettings::from_config(&cfg),
        retry,
        StdRng::from_rng(&mut rand::rng()),
    );

    let outcome = run_session(&mut engine, &attendance, date, &roster, mode).await?;
    info!(outcome = %outcome, "session complete");
    println!("{outcome}");

    // Fold the new pairings back into the seed file so the next session
    // sees them.
    if !mode.is_test()
        && let Some(path) = &cfg.stores.history
    {
        let dump = serde_yaml::to_string(&history.dump())?;
        std::fs::write(path, dump)
            .with_context(|| format!("failed to write history seed {path:?}"))?;
        info!(path = %path.display(), "history seed updated");
    }

    Ok(())
}
