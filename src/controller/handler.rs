//! CSV event handling
//!
//! Turns CSV add/update/delete events into `NotificationContext`s:
//!
//! 1. copied CSVs are ignored
//! 2. CSVs without the `olm.clusteroperator.name` label are ignored; the label
//!    value names the ClusterOperator to update (in strict mode it must also
//!    equal the one expected name)
//! 3. the newest CSV in the replacement chain is resolved from the lister
//! 4. the notification is posted without blocking

use crate::controller::notification::{NotificationContext, Sender};
use crate::controller::replace::find_newest;
use crate::crd::csv::Csv;
use kube::runtime::reflector::Store;
use kube::ResourceExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("CSV missing name")]
    MissingName,

    #[error("CSV {0} missing namespace")]
    MissingNamespace(String),
}

/// Event envelope produced by the watch layer
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// CSV was added, changed, or re-delivered by a resync
    Applied(Arc<Csv>),
    Deleted(Arc<Csv>),
}

impl WatchEvent {
    pub fn csv(&self) -> &Arc<Csv> {
        match self {
            WatchEvent::Applied(csv) | WatchEvent::Deleted(csv) => csv,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, WatchEvent::Deleted(_))
    }

    /// Check the payload carries the identity the handler needs
    ///
    /// Returns the namespace the CSV lives in.
    pub fn decode(&self) -> Result<&str, DecodeError> {
        let csv = self.csv();
        let name = csv.metadata.name.as_deref().ok_or(DecodeError::MissingName)?;
        csv.metadata
            .namespace
            .as_deref()
            .ok_or_else(|| DecodeError::MissingNamespace(name.to_string()))
    }
}

/// Lists CSVs that take part in replacement chain resolution
pub trait CsvLister: Send + Sync {
    /// Non-copied CSVs in `namespace` carrying the operator name label
    fn list(&self, namespace: &str) -> Vec<Arc<Csv>>;
}

impl CsvLister for Store<Csv> {
    fn list(&self, namespace: &str) -> Vec<Arc<Csv>> {
        self.state()
            .into_iter()
            .filter(|csv| csv.namespace().as_deref() == Some(namespace))
            .filter(|csv| !csv.is_copied() && csv.operator_name().is_some())
            .collect()
    }
}

impl CsvLister for Vec<Arc<Csv>> {
    fn list(&self, namespace: &str) -> Vec<Arc<Csv>> {
        self.iter()
            .filter(|csv| csv.namespace().as_deref() == Some(namespace))
            .filter(|csv| !csv.is_copied() && csv.operator_name().is_some())
            .cloned()
            .collect()
    }
}

pub struct EventHandler {
    lister: Arc<dyn CsvLister>,
    sender: Arc<dyn Sender>,
    expected_name: Option<String>,
}

impl EventHandler {
    pub fn new(lister: Arc<dyn CsvLister>, sender: Arc<dyn Sender>) -> Self {
        EventHandler {
            lister,
            sender,
            expected_name: None,
        }
    }

    /// Only react to CSVs labelled for this one ClusterOperator
    pub fn with_expected_name(mut self, name: impl Into<String>) -> Self {
        self.expected_name = Some(name.into());
        self
    }

    pub fn handle(&self, event: WatchEvent) {
        let namespace = match event.decode() {
            Ok(namespace) => namespace.to_string(),
            Err(e) => {
                error!(error = %e, "dropping malformed CSV event");
                return;
            }
        };

        let deleted = event.is_delete();
        match event {
            WatchEvent::Applied(csv) | WatchEvent::Deleted(csv) => {
                self.on_event(csv, &namespace, deleted)
            }
        }
    }

    pub fn on_add_or_update(&self, csv: Arc<Csv>) {
        self.handle(WatchEvent::Applied(csv));
    }

    pub fn on_delete(&self, csv: Arc<Csv>) {
        self.handle(WatchEvent::Deleted(csv));
    }

    /// `namespace` is the decoded namespace of `csv`
    fn on_event(&self, csv: Arc<Csv>, namespace: &str, deleted: bool) {
        let Some(name) = self.matching_operator(&csv) else {
            debug!(csv = %csv.name_any(), "CSV not relevant to any monitored clusteroperator");
            return;
        };

        info!(
            csv = %csv.name_any(),
            phase = %csv.phase(),
            deleted,
            "found a matching CSV, sending notification"
        );

        let final_csv = self.latest_in_replacement_chain(&csv, namespace);
        self.sender.send(NotificationContext {
            name,
            current: csv,
            final_csv,
            deleted,
        });
    }

    fn latest_in_replacement_chain(&self, csv: &Csv, namespace: &str) -> Option<Arc<Csv>> {
        let related = self.lister.list(namespace);
        find_newest(csv, &related)
    }

    fn matching_operator(&self, csv: &Csv) -> Option<String> {
        if csv.is_copied() {
            return None;
        }

        let name = csv.operator_name()?;
        match &self.expected_name {
            Some(expected) if expected != name => None,
            _ => Some(name.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "handler_test.rs"]
mod tests;
