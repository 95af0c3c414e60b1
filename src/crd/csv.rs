use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label whose value names the ClusterOperator a CSV reports into
///
/// A CSV that should update the cluster operator named "package-server"
/// carries `olm.clusteroperator.name: package-server`.
pub const OPERATOR_NAME_LABEL: &str = "olm.clusteroperator.name";

/// Label OLM puts on CSVs projected into other namespaces
pub const COPIED_FROM_LABEL: &str = "olm.copiedFrom";

/// Status reason OLM sets on copied CSVs
pub const COPIED_REASON: &str = "Copied";

/// ClusterServiceVersion as written by OLM
///
/// Only the fields needed to follow install progress and the replacement
/// chain are modelled; everything else in the object is ignored.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "ClusterServiceVersion",
    shortname = "csv",
    namespaced,
    status = "ClusterServiceVersionStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Version", "type":"string", "jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Replaces", "type":"string", "jsonPath":".spec.replaces"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#
)]
pub struct ClusterServiceVersionSpec {
    /// Semantic version of the packaged operator
    #[serde(default)]
    pub version: String,

    /// Name of the CSV this one supersedes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,

    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ClusterServiceVersionStatus {
    #[serde(default)]
    pub phase: CsvPhase,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Install lifecycle phase of a CSV
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum CsvPhase {
    /// Phase not yet set by OLM
    #[default]
    #[serde(rename = "")]
    None,
    Pending,
    InstallReady,
    Installing,
    Succeeded,
    Failed,
    Replacing,
    Deleting,
    /// Any phase this crate does not know about
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CsvPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CsvPhase::None => "",
            CsvPhase::Pending => "Pending",
            CsvPhase::InstallReady => "InstallReady",
            CsvPhase::Installing => "Installing",
            CsvPhase::Succeeded => "Succeeded",
            CsvPhase::Failed => "Failed",
            CsvPhase::Replacing => "Replacing",
            CsvPhase::Deleting => "Deleting",
            CsvPhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

pub type Csv = ClusterServiceVersion;

impl ClusterServiceVersion {
    /// Current phase, `CsvPhase::None` if no status has been written yet
    pub fn phase(&self) -> CsvPhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    /// Whether this is a copy OLM projected into another namespace
    pub fn is_copied(&self) -> bool {
        let copied_reason = self
            .status
            .as_ref()
            .and_then(|s| s.reason.as_deref())
            .map(|reason| reason == COPIED_REASON)
            .unwrap_or(false);

        copied_reason || self.labels().contains_key(COPIED_FROM_LABEL)
    }

    /// Value of the operator name label, if present
    pub fn operator_name(&self) -> Option<&str> {
        self.labels().get(OPERATOR_NAME_LABEL).map(String::as_str)
    }

    pub fn replaces(&self) -> Option<&str> {
        self.spec.replaces.as_deref().filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
#[path = "csv_test.rs"]
mod tests;
