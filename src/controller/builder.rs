//! Fluent construction of `ClusterOperatorStatus`
//!
//! The builder starts from an existing status (or an empty one) and edits it
//! in place. A condition's `lastTransitionTime` only moves when its status
//! value changes; message-only edits keep the old timestamp so repeated
//! derivations of the same state compare equal.

use crate::controller::clock::Clock;
use crate::crd::clusteroperator::{
    ClusterOperatorStatus, ClusterOperatorStatusCondition, ConditionStatus, ConditionType,
    OperandVersion,
};
use std::sync::Arc;

pub struct StatusBuilder {
    status: ClusterOperatorStatus,
    clock: Arc<dyn Clock>,
}

impl StatusBuilder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::from_existing(None, clock)
    }

    /// Seed the builder with a copy of `existing`
    pub fn from_existing(existing: Option<&ClusterOperatorStatus>, clock: Arc<dyn Clock>) -> Self {
        StatusBuilder {
            status: existing.cloned().unwrap_or_default(),
            clock,
        }
    }

    pub fn with_progressing(&mut self, value: bool, message: impl Into<String>) -> &mut Self {
        self.set_condition(ConditionType::Progressing, value.into(), message.into());
        self
    }

    pub fn with_available(&mut self, value: bool, message: impl Into<String>) -> &mut Self {
        self.set_condition(ConditionType::Available, value.into(), message.into());
        self
    }

    pub fn with_degraded(&mut self, value: bool) -> &mut Self {
        self.set_condition(ConditionType::Degraded, value.into(), String::new());
        self
    }

    /// Record an installed operand version; no-op if the pair is present
    pub fn with_version(&mut self, name: &str, version: &str) -> &mut Self {
        let exists = self
            .status
            .versions
            .iter()
            .any(|v| v.name == name && v.version == version);

        if !exists {
            self.status.versions.push(OperandVersion {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        self
    }

    /// Remove an operand version; no-op if the pair is absent
    pub fn without_version(&mut self, name: &str, version: &str) -> &mut Self {
        self.status
            .versions
            .retain(|v| !(v.name == name && v.version == version));
        self
    }

    pub fn status(&self) -> ClusterOperatorStatus {
        self.status.clone()
    }

    pub fn into_status(self) -> ClusterOperatorStatus {
        self.status
    }

    fn set_condition(&mut self, type_: ConditionType, status: ConditionStatus, message: String) {
        let message = Some(message).filter(|m| !m.is_empty());

        match self.status.conditions.iter_mut().find(|c| c.type_ == type_) {
            Some(existing) if existing.status == status => {
                existing.message = message;
            }
            Some(existing) => {
                existing.status = status;
                existing.message = message;
                existing.last_transition_time = self.clock.timestamp();
            }
            None => {
                self.status.conditions.push(ClusterOperatorStatusCondition {
                    type_,
                    status,
                    message,
                    reason: None,
                    last_transition_time: self.clock.timestamp(),
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
