//! Prometheus metrics for the status reconciler
//!
//! - `costatus_notifications_total{result}`: notifications posted (`sent`)
//!   or lost on a full or closed channel (`dropped`)
//! - `costatus_status_writes_total{result}`: ClusterOperator writes that
//!   `updated` the status, found it `unchanged`, or hit an `error`

use crate::controller::notification::SendOutcome;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub type SharedMetrics = Arc<ControllerMetrics>;

pub struct ControllerMetrics {
    registry: Registry,
    notifications: IntCounterVec,
    status_writes: IntCounterVec,
}

impl ControllerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let notifications = IntCounterVec::new(
            Opts::new(
                "costatus_notifications_total",
                "CSV notifications handed to the monitor, by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(notifications.clone()))?;

        let status_writes = IntCounterVec::new(
            Opts::new(
                "costatus_status_writes_total",
                "ClusterOperator status writes, by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(status_writes.clone()))?;

        Ok(ControllerMetrics {
            registry,
            notifications,
            status_writes,
        })
    }

    pub fn record_notification(&self, outcome: SendOutcome) {
        let result = match outcome {
            SendOutcome::Sent => "sent",
            SendOutcome::Dropped => "dropped",
        };
        self.notifications.with_label_values(&[result]).inc();
    }

    pub fn record_write(&self, result: &str) {
        self.status_writes.with_label_values(&[result]).inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(ControllerMetrics::new()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_empty() {
        let metrics = create_metrics().unwrap();
        let body = metrics.encode().unwrap();
        assert!(!body.contains("costatus_notifications_total{"));
    }

    #[test]
    fn test_notification_outcomes_are_labelled() {
        let metrics = create_metrics().unwrap();

        metrics.record_notification(SendOutcome::Sent);
        metrics.record_notification(SendOutcome::Sent);
        metrics.record_notification(SendOutcome::Dropped);

        let body = metrics.encode().unwrap();
        assert!(body.contains(r#"costatus_notifications_total{result="sent"} 2"#));
        assert!(body.contains(r#"costatus_notifications_total{result="dropped"} 1"#));
    }

    #[test]
    fn test_write_results_are_labelled() {
        let metrics = create_metrics().unwrap();

        metrics.record_write("error");

        let body = metrics.encode().unwrap();
        assert!(body.contains(r#"costatus_status_writes_total{result="error"} 1"#));
        assert!(body.contains("# TYPE costatus_status_writes_total counter"));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = create_metrics().unwrap();
        let second = create_metrics().unwrap();

        first.record_write("updated");

        assert!(!second.encode().unwrap().contains("updated"));
    }
}
