//! ClusterOperator status reconciler
//!
//! Follows ClusterServiceVersion lifecycle events and keeps one
//! ClusterOperator status record per monitored name in step with them.

pub mod config;
pub mod controller;
pub mod crd;
pub mod server;
