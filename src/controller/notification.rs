//! Notifications from CSV events to the status monitor
//!
//! Producers (watch event callbacks) hand `NotificationContext`s to a bounded
//! channel with a single consumer. Sending never blocks: when the channel is
//! full the notification is dropped and a warning is logged. Periodic resync
//! of the watch re-delivers every CSV, so a dropped intermediate state is
//! eventually superseded.

use crate::crd::csv::Csv;
use crate::server::SharedMetrics;
use kube::ResourceExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Default capacity of the notification channel
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Everything the monitor needs to update one ClusterOperator
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationContext {
    /// Name of the ClusterOperator to update
    pub name: String,
    /// CSV the event was about
    pub current: Arc<Csv>,
    /// Newest CSV replacing `current`, `None` if `current` is the newest
    pub final_csv: Option<Arc<Csv>>,
    pub deleted: bool,
}

impl NotificationContext {
    /// CSV whose state decides the reported status
    pub fn effective(&self) -> &Csv {
        self.final_csv.as_deref().unwrap_or(self.current.as_ref())
    }
}

impl fmt::Display for NotificationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let replaces = self
            .final_csv
            .as_ref()
            .map(|csv| csv.name_any())
            .unwrap_or_else(|| "<nil>".to_string());

        write!(
            f,
            "name={} csv={} deleted={} replaces={}",
            self.name,
            self.current.name_any(),
            self.deleted,
            replaces
        )
    }
}

/// Posts notifications to the monitor
///
/// `send` must not block. If the monitor cannot take the notification right
/// now it is lost.
pub trait Sender: Send + Sync {
    fn send(&self, context: NotificationContext);
}

/// Outcome of a single `try_send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Dropped,
}

/// Producer half of the notification channel
#[derive(Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<NotificationContext>,
    metrics: Option<SharedMetrics>,
}

impl NotificationSender {
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Non-blocking send reporting whether the notification was accepted
    pub fn try_send(&self, context: NotificationContext) -> SendOutcome {
        let outcome = match self.tx.try_send(context) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(context)) => {
                warn!(
                    clusteroperator = %context.name,
                    csv = %context.current.name_any(),
                    "monitor not ready to accept cluster operator update notification, dropping"
                );
                SendOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(context)) => {
                warn!(
                    clusteroperator = %context.name,
                    "monitor has stopped, dropping cluster operator update notification"
                );
                SendOutcome::Dropped
            }
        };

        if let Some(ref metrics) = self.metrics {
            metrics.record_notification(outcome);
        }
        outcome
    }
}

impl Sender for NotificationSender {
    fn send(&self, context: NotificationContext) {
        let _ = self.try_send(context);
    }
}

/// Consumer half of the notification channel, owned by the monitor loop
pub struct NotificationReceiver {
    rx: mpsc::Receiver<NotificationContext>,
}

impl NotificationReceiver {
    /// Next notification in send order, `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<NotificationContext> {
        self.rx.recv().await
    }

    /// Stop accepting notifications; anything still queued is dropped
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Create a bounded notification channel
///
/// A capacity of zero is bumped to one.
pub fn notification_channel(capacity: usize) -> (NotificationSender, NotificationReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        NotificationSender { tx, metrics: None },
        NotificationReceiver { rx },
    )
}

#[cfg(test)]
#[path = "notification_test.rs"]
mod tests;
