//! ClusterOperator status derivation
//!
//! Maps what we know about a CSV (its phase, whether it was deleted, and
//! whether a newer CSV is taking over) onto the Progressing / Available /
//! Degraded conditions and the installed version list.
//!
//! Scenarios covered:
//! - fresh install of v1: working toward v1, v1 deployed, v1 failed, v1
//!   removed after install
//! - upgrade v1 -> v2: v2 is reported as soon as it exists; deleting v1 as
//!   part of the handoff only drops v1 from the version list

use crate::controller::builder::StatusBuilder;
use crate::controller::clock::{Clock, SystemClock};
use crate::controller::notification::NotificationContext;
use crate::crd::clusteroperator::{ClusterOperator, ClusterOperatorStatus};
use crate::crd::csv::{Csv, CsvPhase};
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Reporter {
    clock: Arc<dyn Clock>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Reporter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Reporter { clock }
    }

    /// Status for a ClusterOperator before any matching CSV has been seen
    pub fn initial_status(&self, name: &str) -> ClusterOperatorStatus {
        StatusBuilder::new(self.clock.clone())
            .with_progressing(
                true,
                format!("Expecting to see corresponding CSV for {}", name),
            )
            .with_available(false, "")
            .with_degraded(false)
            .status()
    }

    /// ClusterOperator object suitable for creation when none exists yet
    pub fn new_cluster_operator(&self, name: &str) -> ClusterOperator {
        ClusterOperator {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Default::default(),
            status: Some(self.initial_status(name)),
        }
    }

    /// Compute the status the ClusterOperator should have after `context`
    ///
    /// The result is built on top of `existing`, so anything this
    /// notification does not speak to is carried over unchanged.
    pub fn expected_status(
        &self,
        existing: Option<&ClusterOperatorStatus>,
        context: &NotificationContext,
    ) -> ClusterOperatorStatus {
        let Some(existing) = existing else {
            return self.initial_status(&context.name);
        };

        let mut builder = StatusBuilder::from_existing(Some(existing), self.clock.clone());

        if context.deleted {
            let current = &context.current;
            builder.without_version(&current.name_any(), &current.spec.version);

            // Not an upgrade: nothing newer is taking over.
            if context.final_csv.is_none() {
                builder
                    .with_progressing(
                        false,
                        format!("Uninstalled version {}", current.spec.version),
                    )
                    .with_available(false, "")
                    .with_degraded(false);
                return builder.into_status();
            }
        }

        let latest = context.effective();
        match latest.phase() {
            CsvPhase::Succeeded => available(&mut builder, latest),
            CsvPhase::Failed => failed(&mut builder, latest),
            _ => progressing(&mut builder, latest),
        }

        builder.into_status()
    }
}

fn available(builder: &mut StatusBuilder, latest: &Csv) {
    builder
        .with_progressing(
            false,
            format!("Deployed version {}", latest.spec.version),
        )
        .with_available(true, "")
        .with_degraded(false)
        .with_version(&latest.name_any(), &latest.spec.version);
}

// Available keeps whatever value it had before.
fn failed(builder: &mut StatusBuilder, latest: &Csv) {
    builder
        .with_progressing(false, format!("Failed to deploy {}", latest.spec.version))
        .with_degraded(false);
}

fn progressing(builder: &mut StatusBuilder, latest: &Csv) {
    builder
        .with_progressing(true, format!("Working toward {}", latest.spec.version))
        .with_available(false, "")
        .with_degraded(false);
}

#[cfg(test)]
#[path = "reporter_test.rs"]
mod tests;
