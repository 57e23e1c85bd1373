// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The default reporter is process-wide, so everything touching it lives in this one test.

use stathat::{InterceptTransport, ReporterConfig, ReporterError};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
#[tokio::test]
async fn default_reporter_posts() {
    assert!(matches!(
        stathat::post_count_one("a stat", "pc@pc.com").await,
        Err(ReporterError::NotInitialized)
    ));

    let (transport, mut rx) = InterceptTransport::new();
    let config = ReporterConfig {
        pool_size: 1,
        verbose: true,
        ..Default::default()
    };
    let reporter =
        stathat::init_default_with(&config, Some(Arc::new(transport))).expect("init default");
    assert_eq!(reporter.pool_size(), 1);
    assert!(stathat::is_verbose());
    assert!(matches!(
        stathat::init_default(),
        Err(ReporterError::AlreadyInitialized)
    ));

    stathat::post_count_one("a stat", "pc@pc.com")
        .await
        .expect("post");
    let post = rx.recv().await.expect("post intercepted");
    assert_eq!(post.url, "http://api.stathat.com/ez");
    assert_eq!(post.fields.get("stat").map(String::as_str), Some("a stat"));
    assert_eq!(
        post.fields.get("ezkey").map(String::as_str),
        Some("pc@pc.com")
    );
    assert_eq!(post.fields.get("count").map(String::as_str), Some("1"));

    stathat::post_count("a stat", "pc@pc.com", 213)
        .await
        .expect("post");
    let post = rx.recv().await.expect("post intercepted");
    assert_eq!(post.fields.get("count").map(String::as_str), Some("213"));

    stathat::post_value("a stat", "pc@pc.com", 2.13)
        .await
        .expect("post");
    let post = rx.recv().await.expect("post intercepted");
    assert_eq!(post.fields.get("value").map(String::as_str), Some("2.13"));

    stathat::post_count_time("a stat", "pc@pc.com", 213, 300000)
        .await
        .expect("post");
    let post = rx.recv().await.expect("post intercepted");
    assert_eq!(post.fields.get("t").map(String::as_str), Some("300000"));

    stathat::post_value_time("a stat", "pc@pc.com", 2.13, 400000)
        .await
        .expect("post");
    let post = rx.recv().await.expect("post intercepted");
    assert_eq!(post.fields.get("t").map(String::as_str), Some("400000"));

    assert!(stathat::wait_until_finished(Duration::from_secs(1)).await);
    assert!(matches!(
        stathat::post_value("a stat", "pc@pc.com", 1.0).await,
        Err(ReporterError::Closed)
    ));
}
