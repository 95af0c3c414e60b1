//! Replacement chain resolution
//!
//! CSVs form a singly linked list through `spec.replaces`: a newer CSV names
//! the one it supersedes. During an upgrade both ends of the link exist at
//! once, so to report the right version we walk the chain forward from the
//! CSV an event was about to the newest CSV that (transitively) replaces it.
//!
//! Everything here works over a candidate slice handed in by the caller; no
//! API calls are made.

use crate::crd::csv::Csv;
use kube::ResourceExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Returns the CSV that directly replaces `csv`, if any.
///
/// If more than one candidate claims to replace `csv` the first one found is
/// returned.
pub fn is_being_replaced(csv: &Csv, candidates: &[Arc<Csv>]) -> Option<Arc<Csv>> {
    let name = csv.name_any();
    candidates
        .iter()
        .find(|candidate| candidate.replaces() == Some(name.as_str()))
        .map(|candidate| {
            debug!(csv = %name, replaced_by = %candidate.name_any(), "found successor");
            Arc::clone(candidate)
        })
}

/// Returns the CSV that `csv` replaces, if it is among the candidates.
pub fn is_replacing(csv: &Csv, candidates: &[Arc<Csv>]) -> Option<Arc<Csv>> {
    let previous = csv.replaces()?;
    candidates
        .iter()
        .find(|candidate| candidate.name_any() == previous)
        .cloned()
}

/// Follow the chain forward from `start` and return its newest member.
///
/// Returns `None` when nothing replaces `start`. A cycle in the chain (which
/// only malformed cluster state can produce) ends the walk at the last CSV
/// not seen before.
pub fn find_newest(start: &Csv, candidates: &[Arc<Csv>]) -> Option<Arc<Csv>> {
    let mut visited = HashSet::from([start.name_any()]);
    let mut newest: Option<Arc<Csv>> = None;

    loop {
        let current = newest.as_deref().unwrap_or(start);
        let Some(next) = is_being_replaced(current, candidates) else {
            break;
        };

        if !visited.insert(next.name_any()) {
            debug!(csv = %next.name_any(), "replacement chain loops back, stopping");
            break;
        }
        newest = Some(next);
    }

    newest
}
