// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transports that deliver one encoded stat to the collection endpoint.

use crate::errors::TransportError;
use crate::observation::FormFields;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

pub const HOSTNAME: &str = "api.stathat.com";

/// URL every stat is posted to unless configured otherwise.
pub fn ez_url() -> String {
    format!("http://{HOSTNAME}/ez")
}

/// Outcome of a post that reached the server. The body is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    pub status: StatusCode,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `fields` as an `application/x-www-form-urlencoded` POST to `url`.
    /// Only failures to complete the exchange are errors; any status is returned as is.
    async fn post_form(&self, url: &str, fields: &FormFields)
        -> Result<PostResponse, TransportError>;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, https_proxy: Option<&str>) -> Result<Self, TransportError> {
        let client = create_reqwest_client(timeout, https_proxy)?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(
        &self,
        url: &str,
        fields: &FormFields,
    ) -> Result<PostResponse, TransportError> {
        let response = self.client.post(url).form(fields).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(PostResponse { status, body })
    }
}

fn create_reqwest_client(
    timeout: Duration,
    https_proxy: Option<&str>,
) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(proxy) = https_proxy {
        debug!("Using HTTPS proxy {proxy}");
        let proxy = reqwest::Proxy::https(proxy)
            .map_err(|e| TransportError::Client(format!("invalid proxy: {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| TransportError::Client(e.to_string()))
}

/// A post captured by [`InterceptTransport`] instead of being sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedPost {
    pub url: String,
    pub fields: FormFields,
}

/// Transport that hands every post to a channel and never touches the network.
///
/// Meant for tests: inject it into a reporter and read the receiver to see exactly what would
/// have been sent.
#[derive(Debug, Clone)]
pub struct InterceptTransport {
    tx: mpsc::UnboundedSender<InterceptedPost>,
}

impl InterceptTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<InterceptedPost>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for InterceptTransport {
    async fn post_form(
        &self,
        url: &str,
        fields: &FormFields,
    ) -> Result<PostResponse, TransportError> {
        debug!("Intercepting post to {url}");
        self.tx
            .send(InterceptedPost {
                url: url.to_string(),
                fields: fields.clone(),
            })
            .map_err(|_| TransportError::InterceptClosed)?;
        Ok(PostResponse {
            status: StatusCode::OK,
            body: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;

    #[test]
    fn test_ez_url() {
        assert_eq!(ez_url(), "http://api.stathat.com/ez");
    }

    #[tokio::test]
    async fn test_intercept_transport_captures_post() {
        let (transport, mut rx) = InterceptTransport::new();
        let fields = Observation::count("a stat", "key", 3).to_form_fields();

        let response = transport
            .post_form(&ez_url(), &fields)
            .await
            .expect("intercepted post failed");
        assert_eq!(response.status, StatusCode::OK);

        let post = rx.recv().await.expect("no post intercepted");
        assert_eq!(post.url, "http://api.stathat.com/ez");
        assert_eq!(post.fields, fields);
    }

    #[tokio::test]
    async fn test_intercept_transport_errors_when_receiver_dropped() {
        let (transport, rx) = InterceptTransport::new();
        drop(rx);
        let fields = Observation::value("a stat", "key", 1.5).to_form_fields();
        let result = transport.post_form(&ez_url(), &fields).await;
        assert!(matches!(result, Err(TransportError::InterceptClosed)));
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let result = HttpTransport::new(Duration::from_secs(1), Some("not a url"));
        assert!(matches!(result, Err(TransportError::Client(_))));
    }
}
