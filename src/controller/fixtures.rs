//! Test fixtures shared by the controller tests

use crate::controller::notification::{NotificationContext, Sender};
use crate::crd::csv::{
    ClusterServiceVersionSpec, ClusterServiceVersionStatus, Csv, CsvPhase, OPERATOR_NAME_LABEL,
};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "openshift-operator-lifecycle-manager";

/// CSV builder for tests
pub struct CsvFixture {
    csv: Csv,
}

impl CsvFixture {
    pub fn new(name: &str, version: &str) -> Self {
        CsvFixture {
            csv: Csv {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    namespace: Some(NAMESPACE.to_string()),
                    ..Default::default()
                },
                spec: ClusterServiceVersionSpec {
                    version: version.to_string(),
                    replaces: None,
                    display_name: None,
                },
                status: None,
            },
        }
    }

    pub fn replaces(mut self, previous: &str) -> Self {
        self.csv.spec.replaces = Some(previous.to_string());
        self
    }

    pub fn phase(mut self, phase: CsvPhase) -> Self {
        self.csv
            .status
            .get_or_insert_with(ClusterServiceVersionStatus::default)
            .phase = phase;
        self
    }

    pub fn reason(mut self, reason: &str) -> Self {
        self.csv
            .status
            .get_or_insert_with(ClusterServiceVersionStatus::default)
            .reason = Some(reason.to_string());
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.csv
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Label the CSV as reporting into the given ClusterOperator
    pub fn reports_to(self, operator: &str) -> Self {
        self.label(OPERATOR_NAME_LABEL, operator)
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.csv.metadata.namespace = Some(namespace.to_string());
        self
    }

    pub fn build(self) -> Csv {
        self.csv
    }

    pub fn arc(self) -> Arc<Csv> {
        Arc::new(self.csv)
    }
}

/// Sender that keeps every notification for later assertions
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<NotificationContext>>,
}

#[allow(clippy::unwrap_used)]
impl RecordingSender {
    pub fn sent(&self) -> Vec<NotificationContext> {
        self.sent.lock().unwrap().clone()
    }
}

#[allow(clippy::unwrap_used)]
impl Sender for RecordingSender {
    fn send(&self, context: NotificationContext) {
        self.sent.lock().unwrap().push(context);
    }
}
