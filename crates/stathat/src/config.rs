// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::ReporterError;
use crate::transport::ez_url;
use std::env;
use std::time::Duration;

pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;
pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`crate::Reporter`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterConfig {
    /// Number of stats that can wait in the queue before submitters have to wait
    pub queue_capacity: usize,
    /// Number of workers posting stats concurrently
    pub pool_size: usize,
    /// URL every stat is posted to
    pub endpoint: String,
    /// HTTP request timeout of the default transport
    pub timeout: Duration,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Echo every request and response body to the logs
    pub verbose: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            pool_size: DEFAULT_POOL_SIZE,
            endpoint: ez_url(),
            timeout: DEFAULT_TIMEOUT,
            https_proxy: None,
            verbose: false,
        }
    }
}

impl ReporterConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ReporterError> {
        let defaults = Self::default();
        let queue_capacity = env::var("STATHAT_QUEUE_CAPACITY")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.queue_capacity);
        let pool_size = env::var("STATHAT_POOL_SIZE")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.pool_size);
        let endpoint = env::var("STATHAT_ENDPOINT").unwrap_or(defaults.endpoint);
        let timeout = env::var("STATHAT_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let https_proxy = env::var("STATHAT_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();
        let verbose = env::var("STATHAT_VERBOSE")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.verbose);

        let config = Self {
            queue_capacity,
            pool_size,
            endpoint,
            timeout,
            https_proxy,
            verbose,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ReporterError> {
        if self.endpoint.trim().is_empty() {
            return Err(ReporterError::InvalidConfig(
                "endpoint cannot be empty".to_string(),
            ));
        }

        if let Err(e) = reqwest::Url::parse(&self.endpoint) {
            return Err(ReporterError::InvalidConfig(format!(
                "invalid endpoint '{}': {e}",
                self.endpoint
            )));
        }

        if self.timeout.is_zero() {
            return Err(ReporterError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
