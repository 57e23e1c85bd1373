// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide reporter behind the crate-level `post_*` functions.
//!
//! The default reporter is created once, explicitly, by [`init_default`] or
//! [`init_default_with`] from inside the tokio runtime, and is never reconfigured. Until then the
//! free functions return [`ReporterError::NotInitialized`].

use crate::config::ReporterConfig;
use crate::errors::ReporterError;
use crate::reporter::Reporter;
use crate::transport::Transport;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

static DEFAULT_REPORTER: OnceLock<Reporter> = OnceLock::new();

/// Initializes the default reporter with the default configuration (a queue of 100000 stats and
/// 10 workers posting over HTTP).
pub fn init_default() -> Result<&'static Reporter, ReporterError> {
    init_default_with(&ReporterConfig::default(), None)
}

/// Initializes the default reporter from `config`, optionally with a custom transport.
///
/// Fails with [`ReporterError::AlreadyInitialized`] on every call after the first successful one.
pub fn init_default_with(
    config: &ReporterConfig,
    transport: Option<Arc<dyn Transport>>,
) -> Result<&'static Reporter, ReporterError> {
    if DEFAULT_REPORTER.get().is_some() {
        return Err(ReporterError::AlreadyInitialized);
    }
    let reporter = Reporter::from_config(config, transport)?;
    // Two racing initializations both build a reporter; the loser's is dropped here.
    DEFAULT_REPORTER
        .set(reporter)
        .map_err(|_| ReporterError::AlreadyInitialized)?;
    debug!("Default StatHat reporter initialized");
    default_reporter()
}

/// The default reporter, if it has been initialized.
pub fn default_reporter() -> Result<&'static Reporter, ReporterError> {
    DEFAULT_REPORTER.get().ok_or(ReporterError::NotInitialized)
}

/// Posts a count of 1 to a stat using the default reporter.
pub async fn post_count_one(stat_key: &str, user_key: &str) -> Result<(), ReporterError> {
    default_reporter()?.post_count_one(stat_key, user_key).await
}

/// Posts a count to a stat using the default reporter.
pub async fn post_count(stat_key: &str, user_key: &str, count: i64) -> Result<(), ReporterError> {
    default_reporter()?.post_count(stat_key, user_key, count).await
}

/// Posts a count to a stat at a specific time using the default reporter.
pub async fn post_count_time(
    stat_key: &str,
    user_key: &str,
    count: i64,
    timestamp: i64,
) -> Result<(), ReporterError> {
    default_reporter()?
        .post_count_time(stat_key, user_key, count, timestamp)
        .await
}

/// Posts a value to a stat using the default reporter.
pub async fn post_value(stat_key: &str, user_key: &str, value: f64) -> Result<(), ReporterError> {
    default_reporter()?.post_value(stat_key, user_key, value).await
}

/// Posts a value to a stat at a specific time using the default reporter.
pub async fn post_value_time(
    stat_key: &str,
    user_key: &str,
    value: f64,
    timestamp: i64,
) -> Result<(), ReporterError> {
    default_reporter()?
        .post_value_time(stat_key, user_key, value, timestamp)
        .await
}

/// Waits for the default reporter to send every queued stat, or until `timeout`.
///
/// Meant to be awaited at the end of `main` in short-lived programs. Returns `true` if nothing
/// was left to send, including when the default reporter was never initialized.
pub async fn wait_until_finished(timeout: Duration) -> bool {
    match DEFAULT_REPORTER.get() {
        Some(reporter) => reporter.wait_until_finished(timeout).await,
        None => true,
    }
}
