// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use clap::{Parser, Subcommand};
use std::{env, process::ExitCode, time::Duration};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use stathat::{Observation, ReporterConfig};

/// Post a single count or value to StatHat.
#[derive(Debug, Parser)]
#[command(name = "stathat-post", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Seconds to wait for the stat to be sent before giving up
    #[arg(long, default_value_t = 5)]
    wait_secs: u64,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add to a counter stat
    Count {
        stat: String,
        ezkey: String,
        #[arg(long, default_value_t = 1)]
        count: i64,
        /// Seconds since the epoch; the server time is used when omitted
        #[arg(long)]
        time: Option<i64>,
    },
    /// Record a value stat
    Value {
        stat: String,
        ezkey: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
        /// Seconds since the epoch; the server time is used when omitted
        #[arg(long)]
        time: Option<i64>,
    },
}

impl Command {
    fn into_observation(self) -> Observation {
        let (observation, time) = match self {
            Command::Count {
                stat,
                ezkey,
                count,
                time,
            } => (Observation::count(stat, ezkey, count), time),
            Command::Value {
                stat,
                ezkey,
                value,
                time,
            } => (Observation::value(stat, ezkey, value), time),
        };
        match time {
            Some(timestamp) => observation.with_timestamp(timestamp),
            None => observation,
        }
    }
}

/// Installs a fmt subscriber filtered by `STATHAT_LOG_LEVEL` (default `info`), with the HTTP
/// stack's own chatter switched off.
fn init_logging() -> Result<(), String> {
    let level = env::var("STATHAT_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(format!("h2=off,hyper=off,rustls=off,{level}"))
        .map_err(|e| format!("invalid STATHAT_LOG_LEVEL '{level}': {e}"))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("could not install log subscriber: {e}"))
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("stathat-post: {e}");
        return ExitCode::FAILURE;
    }
    debug!("Logging subsystem enabled");

    let config = match ReporterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading StatHat configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let reporter = match stathat::init_default_with(&config, None) {
        Ok(reporter) => reporter,
        Err(e) => {
            error!("Error starting StatHat reporter: {e}");
            return ExitCode::FAILURE;
        }
    };

    let observation = cli.command.into_observation();
    let stat_key = observation.stat_key.clone();
    if let Err(e) = reporter.post(observation).await {
        error!("Error queueing stat {stat_key}: {e}");
        return ExitCode::FAILURE;
    }

    if stathat::wait_until_finished(Duration::from_secs(cli.wait_secs)).await {
        info!("Stat {stat_key} processed");
        ExitCode::SUCCESS
    } else {
        error!(
            "Timed out after {}s waiting for stat {stat_key} to be sent",
            cli.wait_secs
        );
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stathat::StatKind;

    #[test]
    fn test_parse_count_defaults_to_one() {
        let cli = Cli::try_parse_from(["stathat-post", "count", "logins", "me@example.com"])
            .expect("valid args");
        let observation = cli.command.into_observation();
        assert_eq!(observation.kind, StatKind::Counter);
        assert_eq!(observation.value, 1.0);
        assert_eq!(observation.timestamp, None);
        assert_eq!(cli.wait_secs, 5);
    }

    #[test]
    fn test_parse_value_with_time() {
        let cli = Cli::try_parse_from([
            "stathat-post",
            "--wait-secs",
            "2",
            "value",
            "temperature",
            "me@example.com",
            "-3.5",
            "--time",
            "400000",
        ])
        .expect("valid args");
        assert_eq!(cli.wait_secs, 2);
        let observation = cli.command.into_observation();
        assert_eq!(observation.kind, StatKind::Gauge);
        assert_eq!(observation.value, -3.5);
        assert_eq!(observation.timestamp, Some(400000));
    }

    #[test]
    fn test_value_is_required() {
        assert!(Cli::try_parse_from(["stathat-post", "value", "temperature", "me@example.com"])
            .is_err());
    }
}
