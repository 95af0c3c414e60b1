//! Custom resource types this controller reads and writes
//!
//! - `ClusterServiceVersion` (operators.coreos.com/v1alpha1): read only
//! - `ClusterOperator` (config.openshift.io/v1): status written by us

pub mod clusteroperator;
pub mod csv;
