// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Queue-backed reporter that posts stats from a fixed pool of worker tasks.
//!
//! Submissions push an [`Observation`] onto a bounded queue and return as soon as it is queued.
//! Workers take observations off the queue one at a time, encode them and hand them to the
//! [`Transport`]. A failed post is logged and dropped. [`Reporter::wait_until_finished`] closes
//! the queue and waits, up to a deadline, for the workers to drain it.

use crate::config::{ReporterConfig, DEFAULT_TIMEOUT};
use crate::errors::ReporterError;
use crate::is_verbose;
use crate::observation::Observation;
use crate::transport::{ez_url, HttpTransport, Transport};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_util::task::TaskTracker;
use tracing::{debug, debug_span, error, info, warn, Instrument};

/// Lifecycle of a reporter. It only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    /// Accepting stats, workers active.
    Running,
    /// Queue closed, workers finishing what was already queued.
    Draining,
    /// Every worker has exited.
    Drained,
}

pub struct Reporter {
    // `None` once the drain has started.
    tx: Mutex<Option<mpsc::Sender<Observation>>>,
    // Held here too so the queue stays open when no worker owns it.
    _rx: Arc<TokioMutex<mpsc::Receiver<Observation>>>,
    workers: TaskTracker,
    pool_size: usize,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("pool_size", &self.pool_size)
            .field("state", &self.state())
            .finish()
    }
}

impl Reporter {
    /// Creates a reporter with room for `queue_capacity` pending stats and starts `pool_size`
    /// workers on the current tokio runtime. Passing `None` for the transport posts over HTTP
    /// to `http://api.stathat.com/ez`.
    ///
    /// A capacity of zero is treated as one. With a pool size of zero nothing ever drains the
    /// queue.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(
        queue_capacity: usize,
        pool_size: usize,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, ReporterError> {
        let transport = match transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(DEFAULT_TIMEOUT, None)?),
        };
        Ok(Self::start(queue_capacity, pool_size, transport, ez_url()))
    }

    /// Creates a reporter from `config`. A `None` transport builds the default HTTP transport
    /// with the configured timeout and proxy.
    ///
    /// The verbose flag is process-wide: it is set to `config.verbose`, so the most recently
    /// built reporter decides whether requests and responses are echoed.
    pub fn from_config(
        config: &ReporterConfig,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, ReporterError> {
        config.validate()?;
        crate::set_verbose(config.verbose);
        let transport = match transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                config.timeout,
                config.https_proxy.as_deref(),
            )?),
        };
        Ok(Self::start(
            config.queue_capacity,
            config.pool_size,
            transport,
            config.endpoint.clone(),
        ))
    }

    fn start(
        queue_capacity: usize,
        pool_size: usize,
        transport: Arc<dyn Transport>,
        endpoint: String,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let rx = Arc::new(TokioMutex::new(rx));
        let endpoint: Arc<str> = Arc::from(endpoint);
        let workers = TaskTracker::new();

        for id in 0..pool_size {
            let worker = process_reports(
                id,
                Arc::clone(&rx),
                Arc::clone(&transport),
                Arc::clone(&endpoint),
            );
            workers.spawn(worker.instrument(debug_span!("stathat_worker", id)));
        }
        debug!("Started {pool_size} StatHat workers with queue capacity {queue_capacity}");

        Self {
            tx: Mutex::new(Some(tx)),
            _rx: rx,
            workers,
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn state(&self) -> ReporterState {
        if !self.workers.is_closed() {
            ReporterState::Running
        } else if self.workers.is_empty() {
            ReporterState::Drained
        } else {
            ReporterState::Draining
        }
    }

    /// Posts a count of 1 to a stat.
    pub async fn post_count_one(
        &self,
        stat_key: &str,
        user_key: &str,
    ) -> Result<(), ReporterError> {
        self.post_count(stat_key, user_key, 1).await
    }

    /// Posts a count to a stat.
    pub async fn post_count(
        &self,
        stat_key: &str,
        user_key: &str,
        count: i64,
    ) -> Result<(), ReporterError> {
        self.post(Observation::count(stat_key, user_key, count)).await
    }

    /// Posts a count to a stat at a specific time.
    pub async fn post_count_time(
        &self,
        stat_key: &str,
        user_key: &str,
        count: i64,
        timestamp: i64,
    ) -> Result<(), ReporterError> {
        self.post(Observation::count(stat_key, user_key, count).with_timestamp(timestamp))
            .await
    }

    /// Posts a value to a stat.
    pub async fn post_value(
        &self,
        stat_key: &str,
        user_key: &str,
        value: f64,
    ) -> Result<(), ReporterError> {
        self.post(Observation::value(stat_key, user_key, value)).await
    }

    /// Posts a value to a stat at a specific time.
    pub async fn post_value_time(
        &self,
        stat_key: &str,
        user_key: &str,
        value: f64,
        timestamp: i64,
    ) -> Result<(), ReporterError> {
        self.post(Observation::value(stat_key, user_key, value).with_timestamp(timestamp))
            .await
    }

    /// Queues an observation for delivery, waiting for a free slot if the queue is full.
    ///
    /// Returns `Ok` once the observation is queued; delivery happens later and its outcome is
    /// only logged. Fails with [`ReporterError::Closed`] after [`Reporter::wait_until_finished`]
    /// has been called.
    pub async fn post(&self, observation: Observation) -> Result<(), ReporterError> {
        let tx = {
            #[allow(clippy::expect_used)]
            let guard = self.tx.lock().expect("lock poisoned");
            guard.clone().ok_or(ReporterError::Closed)?
        };
        tx.send(observation).await.map_err(|_| ReporterError::Closed)
    }

    /// Stops accepting stats and waits until every queued stat has been processed or
    /// `timeout` elapses, whichever comes first.
    ///
    /// Returns `true` if the workers finished in time. On `false` nothing is cancelled: the
    /// workers keep draining in the background. Calling this again is allowed and simply waits
    /// again.
    pub async fn wait_until_finished(&self, timeout: Duration) -> bool {
        {
            #[allow(clippy::expect_used)]
            let mut guard = self.tx.lock().expect("lock poisoned");
            if guard.take().is_some() {
                debug!("StatHat queue closed, waiting for workers to finish");
            }
        }
        self.workers.close();

        match tokio::time::timeout(timeout, self.workers.wait()).await {
            Ok(()) => {
                debug!("All StatHat workers finished");
                true
            }
            Err(_) => {
                warn!(
                    "Timed out after {timeout:?} waiting for {} StatHat workers",
                    self.workers.len()
                );
                false
            }
        }
    }
}

async fn process_reports(
    id: usize,
    rx: Arc<TokioMutex<mpsc::Receiver<Observation>>>,
    transport: Arc<dyn Transport>,
    endpoint: Arc<str>,
) {
    loop {
        // The lock is only held while waiting for the next observation, never during a post.
        let next = rx.lock().await.recv().await;
        let Some(observation) = next else {
            debug!("Queue closed, stopping StatHat worker {id}");
            break;
        };

        let fields = observation.to_form_fields();
        if is_verbose() {
            info!("Posting stat to StatHat: {endpoint}, {fields:?}");
        }

        match transport.post_form(&endpoint, &fields).await {
            Ok(response) => {
                if !response.status.is_success() {
                    warn!(
                        "{}: StatHat rejected stat {}",
                        response.status, observation.stat_key
                    );
                }
                if is_verbose() {
                    info!("StatHat post result: {}", response.body);
                }
            }
            Err(e) => {
                error!("Error posting stat to StatHat: {e}");
            }
        }
    }
}
