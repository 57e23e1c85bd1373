// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors returned by the transport that performs a single form post.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Interception channel closed")]
    InterceptClosed,
}

/// Errors surfaced to callers of the reporter.
///
/// Nothing that happens inside a worker ends up here: failed posts are logged
/// and dropped.
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("Reporter is closed and no longer accepts stats")]
    Closed,

    #[error("Default reporter has not been initialized")]
    NotInitialized,

    #[error("Default reporter already initialized")]
    AlreadyInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
