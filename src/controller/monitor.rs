//! ClusterOperator monitor loop
//!
//! The monitor is the single consumer of the notification channel. It moves
//! through these states:
//!
//! - `ProbingApi`: poll for the ClusterOperator API until it is served or
//!   we are told to stop. Clusters without the API are skipped quietly.
//! - `EnsuringSeeds`: make sure every configured ClusterOperator exists
//!   (seeded with "expecting a CSV"), then wait for the CSV cache to sync.
//!   Any failure here ends the run and is reported on the run handle.
//! - `Running`: apply notifications one at a time, in send order. A failed
//!   write is logged and not retried; the next event or resync covers it.
//! - `Draining` / `Stopped`: on stop, queued notifications are dropped.

use crate::controller::notification::{
    notification_channel, NotificationContext, NotificationReceiver, NotificationSender,
};
use crate::controller::watch::CacheSync;
use crate::controller::writer::{StatusWriter, WriterError};
use crate::server::ShutdownSignal;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

/// Wait between two probes for the ClusterOperator API
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// How long to wait for the CSV cache before giving up on the run
pub const DEFAULT_CACHE_SYNC_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to write initial clusteroperator {name}: {source}")]
    SeedFailed {
        name: String,
        #[source]
        source: WriterError,
    },

    #[error("timed out after {0:?} waiting for CSV cache to sync")]
    CacheSyncTimeout(Duration),

    #[error("CSV watch stopped before its cache synced")]
    CacheSyncAborted,

    #[error("monitor task exited without reporting startup result")]
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    ProbingApi,
    EnsuringSeeds,
    Running,
    Draining,
    Stopped,
}

pub struct Monitor {
    writer: StatusWriter,
    receiver: NotificationReceiver,
    names: Vec<String>,
    probe_interval: Duration,
    cache_sync: Option<CacheSync>,
    cache_sync_timeout: Duration,
    state: watch::Sender<MonitorState>,
}

/// Create a monitor for `names` and the sender that feeds it
pub fn new_monitor(
    names: Vec<String>,
    writer: StatusWriter,
    channel_size: usize,
) -> (Monitor, NotificationSender) {
    info!(names = ?names, "monitoring the following components");

    let (sender, receiver) = notification_channel(channel_size);
    let (state, _) = watch::channel(MonitorState::ProbingApi);

    let monitor = Monitor {
        writer,
        receiver,
        names,
        probe_interval: DEFAULT_PROBE_INTERVAL,
        cache_sync: None,
        cache_sync_timeout: DEFAULT_CACHE_SYNC_TIMEOUT,
        state,
    };
    (monitor, sender)
}

impl Monitor {
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Hold back processing until the CSV watch reports its cache synced
    pub fn with_cache_sync(mut self, cache_sync: CacheSync, timeout: Duration) -> Self {
        self.cache_sync = Some(cache_sync);
        self.cache_sync_timeout = timeout;
        self
    }

    /// Spawn the monitor loop; it runs until `shutdown` fires
    pub fn run(self, shutdown: ShutdownSignal) -> RunHandle {
        let (error_tx, error_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let state = self.state.subscribe();

        tokio::spawn(async move {
            self.run_loop(shutdown, error_tx, ready_tx).await;
            let _ = done_tx.send(true);
        });

        RunHandle {
            error: Some(error_rx),
            ready: ready_rx,
            done: done_rx,
            state,
        }
    }

    async fn run_loop(
        mut self,
        mut shutdown: ShutdownSignal,
        error_tx: oneshot::Sender<Result<(), MonitorError>>,
        ready_tx: watch::Sender<bool>,
    ) {
        info!("starting clusteroperator monitor loop");

        match self.start(&mut shutdown).await {
            Ok(true) => {
                let _ = error_tx.send(Ok(()));
                self.set_state(MonitorState::Running);
                let _ = ready_tx.send(true);
                self.process(&mut shutdown).await;
            }
            Ok(false) => {
                let _ = error_tx.send(Ok(()));
            }
            Err(e) => {
                error!(error = %e, "clusteroperator monitor failed to start");
                let _ = error_tx.send(Err(e));
            }
        }

        self.set_state(MonitorState::Draining);
        self.receiver.close();
        self.set_state(MonitorState::Stopped);
        info!("exiting from clusteroperator monitor loop");
    }

    /// Returns `Ok(false)` if asked to stop before becoming ready
    async fn start(&mut self, shutdown: &mut ShutdownSignal) -> Result<bool, MonitorError> {
        self.set_state(MonitorState::ProbingApi);
        if !self.wait_for_api(shutdown).await {
            return Ok(false);
        }

        // A matching CSV may never show up, so write the expectation now.
        self.set_state(MonitorState::EnsuringSeeds);
        info!("ensuring that all clusteroperator resources exist");
        for name in &self.names {
            if let Err(source) = self.writer.ensure_exists(name).await {
                error!(clusteroperator = %name, error = %source, "failed to write initial clusteroperator");
                return Err(MonitorError::SeedFailed {
                    name: name.clone(),
                    source,
                });
            }
        }

        match self.cache_sync.take() {
            Some(cache_sync) => self.wait_for_cache_sync(cache_sync, shutdown).await,
            None => Ok(true),
        }
    }

    async fn wait_for_api(&self, shutdown: &mut ShutdownSignal) -> bool {
        loop {
            if shutdown.is_shutdown() {
                return false;
            }

            match self.writer.is_api_available().await {
                Ok(true) => {
                    info!("ClusterOperator api is present");
                    return true;
                }
                Ok(false) => info!("ClusterOperator api not present, skipping update"),
                Err(e) => info!(error = %e, "ClusterOperator api not present, skipping update"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.probe_interval) => {}
                _ = shutdown.wait() => return false,
            }
        }
    }

    async fn wait_for_cache_sync(
        &self,
        mut cache_sync: CacheSync,
        shutdown: &mut ShutdownSignal,
    ) -> Result<bool, MonitorError> {
        info!("waiting for CSV cache to sync");
        tokio::select! {
            synced = tokio::time::timeout(self.cache_sync_timeout, cache_sync.wait()) => match synced {
                Ok(true) => Ok(true),
                Ok(false) => Err(MonitorError::CacheSyncAborted),
                Err(_) => Err(MonitorError::CacheSyncTimeout(self.cache_sync_timeout)),
            },
            _ = shutdown.wait() => Ok(false),
        }
    }

    async fn process(&mut self, shutdown: &mut ShutdownSignal) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                next = self.receiver.recv() => match next {
                    Some(context) => self.apply(context).await,
                    None => {
                        info!("all notification senders gone");
                        break;
                    }
                },
            }
        }
    }

    async fn apply(&self, context: NotificationContext) {
        info!(notification = %context, "notification");
        if let Err(e) = self.writer.write(&context).await {
            error!(clusteroperator = %context.name, error = %e, "failed to update clusteroperator");
        }
    }

    fn set_state(&self, state: MonitorState) {
        self.state.send_replace(state);
    }
}

/// Caller side of a running monitor
///
/// - `error()`: startup result, `Err` only if startup failed
/// - `ready()`: resolves once notifications are being processed
/// - `done()`: resolves once the loop has exited
pub struct RunHandle {
    error: Option<oneshot::Receiver<Result<(), MonitorError>>>,
    ready: watch::Receiver<bool>,
    done: watch::Receiver<bool>,
    state: watch::Receiver<MonitorState>,
}

impl RunHandle {
    /// Startup result; later calls return `Ok(())`
    pub async fn error(&mut self) -> Result<(), MonitorError> {
        match self.error.take() {
            Some(rx) => rx.await.unwrap_or(Err(MonitorError::Aborted)),
            None => Ok(()),
        }
    }

    /// `true` once ready, `false` if the loop exited without getting there
    pub async fn ready(&mut self) -> bool {
        self.ready.wait_for(|ready| *ready).await.is_ok()
    }

    pub async fn done(&mut self) {
        let _ = self.done.wait_for(|done| *done).await;
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }
}

#[cfg(test)]
#[path = "monitor_test.rs"]
mod tests;
