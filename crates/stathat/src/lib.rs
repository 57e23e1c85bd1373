// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Best-effort asynchronous client for posting counts and values to StatHat.
//!
//! Stats are queued and posted by a pool of background workers, so submitting never waits on
//! the network. Before exiting, await [`wait_until_finished`] (or
//! [`Reporter::wait_until_finished`]) to give queued stats a chance to go out.
//!
//! ```no_run
//! # async fn run() -> Result<(), stathat::ReporterError> {
//! use std::time::Duration;
//!
//! stathat::init_default()?;
//! stathat::post_count_one("messages sent", "user@example.com").await?;
//! stathat::post_value("queue depth", "user@example.com", 12.5).await?;
//! stathat::wait_until_finished(Duration::from_secs(5)).await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::atomic::{AtomicBool, Ordering};

pub mod config;
pub mod default_reporter;
pub mod errors;
pub mod observation;
pub mod reporter;
pub mod transport;

pub use config::ReporterConfig;
pub use default_reporter::{
    default_reporter, init_default, init_default_with, post_count, post_count_one,
    post_count_time, post_value, post_value_time, wait_until_finished,
};
pub use errors::{ReporterError, TransportError};
pub use observation::{Observation, StatKind};
pub use reporter::{Reporter, ReporterState};
pub use transport::{HttpTransport, InterceptTransport, InterceptedPost, Transport};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// When enabled, every request and response body is logged at `info`.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}
