// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::APP_NAME;

const LOG_ENV: &str = "STOREDESK_LOG";
const VERBOSE_LEVEL: &str = "debug";

/// Environment wins over flags, flags over the config file.
pub fn filter_directive(
    app_env: Option<String>,
    rust_log: Option<String>,
    config_level: &str,
    verbose: bool,
) -> String {
    let from_env = app_env
        .into_iter()
        .chain(rust_log)
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty());
    match from_env {
        Some(directive) => directive,
        None if verbose => VERBOSE_LEVEL.to_owned(),
        None => config_level.to_owned(),
    }
}

/// Installs the global subscriber writing to a daily file under `dir`.
/// Keep the guard alive until exit or buffered lines are lost.
pub fn init(dir: &Path, config_level: &str, verbose: bool) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let directive = filter_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        config_level,
        verbose,
    );
    let filter = EnvFilter::try_new(&directive).with_context(|| {
        format!("invalid log filter {directive:?} -- check [log].level or {LOG_ENV}")
    })?;

    let file_appender = tracing_appender::rolling::daily(dir, APP_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;

    Ok(guard)
}
