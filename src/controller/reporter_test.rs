//! Tests for ClusterOperator status derivation

use super::*;
use crate::controller::clock::MockClock;
use crate::controller::fixtures::CsvFixture;
use crate::crd::clusteroperator::{
    ClusterOperatorStatusCondition, ConditionStatus, ConditionType, OperandVersion,
};

fn reporter() -> (Reporter, Arc<MockClock>) {
    let clock = Arc::new(MockClock::fixed());
    (Reporter::new(clock.clone()), clock)
}

fn context(current: Csv, final_csv: Option<Csv>, deleted: bool) -> NotificationContext {
    NotificationContext {
        name: "foo".to_string(),
        current: Arc::new(current),
        final_csv: final_csv.map(Arc::new),
        deleted,
    }
}

fn cond(status: &ClusterOperatorStatus, type_: ConditionType) -> &ClusterOperatorStatusCondition {
    status
        .condition(type_)
        .unwrap_or_else(|| panic!("missing {:?} condition", type_))
}

fn version(name: &str, version: &str) -> OperandVersion {
    OperandVersion {
        name: name.to_string(),
        version: version.to_string(),
    }
}

#[test]
fn test_new_cluster_operator_is_seeded_with_expectation() {
    let (reporter, _) = reporter();

    let co = reporter.new_cluster_operator("foo");

    assert_eq!(co.metadata.name.as_deref(), Some("foo"));
    let status = co.status.expect("seeded status");
    assert_eq!(
        status.conditions,
        vec![
            ClusterOperatorStatusCondition {
                type_: ConditionType::Progressing,
                status: ConditionStatus::True,
                message: Some("Expecting to see corresponding CSV for foo".to_string()),
                reason: None,
                last_transition_time: "2024-05-01T12:00:00Z".to_string(),
            },
            ClusterOperatorStatusCondition {
                type_: ConditionType::Available,
                status: ConditionStatus::False,
                message: None,
                reason: None,
                last_transition_time: "2024-05-01T12:00:00Z".to_string(),
            },
            ClusterOperatorStatusCondition {
                type_: ConditionType::Degraded,
                status: ConditionStatus::False,
                message: None,
                reason: None,
                last_transition_time: "2024-05-01T12:00:00Z".to_string(),
            },
        ]
    );
    assert!(status.versions.is_empty());
}

#[test]
fn test_no_existing_status_yields_seed_for_any_context() {
    let (reporter, _) = reporter();
    let csv = CsvFixture::new("foo", "1.2.3")
        .phase(CsvPhase::Succeeded)
        .build();

    let status = reporter.expected_status(None, &context(csv, None, false));

    assert_eq!(status, reporter.initial_status("foo"));
}

#[test]
fn test_succeeded_reports_available_with_version() {
    let (reporter, clock) = reporter();
    let existing = reporter.initial_status("foo");
    clock.advance(chrono::Duration::seconds(10));

    let csv = CsvFixture::new("foo", "1.2.3")
        .phase(CsvPhase::Succeeded)
        .build();
    let status = reporter.expected_status(Some(&existing), &context(csv, None, false));

    let progressing = cond(&status, ConditionType::Progressing);
    assert_eq!(progressing.status, ConditionStatus::False);
    assert_eq!(progressing.message.as_deref(), Some("Deployed version 1.2.3"));
    assert_eq!(progressing.last_transition_time, "2024-05-01T12:00:10Z");

    let available = cond(&status, ConditionType::Available);
    assert_eq!(available.status, ConditionStatus::True);
    assert_eq!(available.last_transition_time, "2024-05-01T12:00:10Z");

    let degraded = cond(&status, ConditionType::Degraded);
    assert_eq!(degraded.status, ConditionStatus::False);
    // Degraded did not change, its timestamp must not move.
    assert_eq!(degraded.last_transition_time, "2024-05-01T12:00:00Z");

    assert_eq!(status.versions, vec![version("foo", "1.2.3")]);
}

#[test]
fn test_installing_reports_progressing() {
    let (reporter, _) = reporter();
    let existing = reporter.initial_status("foo");

    let csv = CsvFixture::new("foo.v2", "2.0.0")
        .phase(CsvPhase::Installing)
        .build();
    let status = reporter.expected_status(Some(&existing), &context(csv, None, false));

    let progressing = cond(&status, ConditionType::Progressing);
    assert_eq!(progressing.status, ConditionStatus::True);
    assert_eq!(progressing.message.as_deref(), Some("Working toward 2.0.0"));
    assert_eq!(
        cond(&status, ConditionType::Available).status,
        ConditionStatus::False
    );
    assert!(status.versions.is_empty());
}

#[test]
fn test_phase_not_set_reports_progressing() {
    let (reporter, _) = reporter();
    let existing = reporter.initial_status("foo");

    let csv = CsvFixture::new("foo.v1", "1.0.0").build();
    let status = reporter.expected_status(Some(&existing), &context(csv, None, false));

    assert_eq!(
        cond(&status, ConditionType::Progressing).message.as_deref(),
        Some("Working toward 1.0.0")
    );
}

#[test]
fn test_failed_leaves_available_unchanged() {
    let (reporter, clock) = reporter();
    let succeeded = CsvFixture::new("foo.v1", "1.0.0")
        .phase(CsvPhase::Succeeded)
        .build();
    let existing = reporter.expected_status(
        Some(&reporter.initial_status("foo")),
        &context(succeeded, None, false),
    );
    clock.advance(chrono::Duration::seconds(10));

    let failed = CsvFixture::new("foo.v1", "1.0.0")
        .phase(CsvPhase::Failed)
        .build();
    let status = reporter.expected_status(Some(&existing), &context(failed, None, false));

    let progressing = cond(&status, ConditionType::Progressing);
    assert_eq!(progressing.status, ConditionStatus::False);
    assert_eq!(progressing.message.as_deref(), Some("Failed to deploy 1.0.0"));
    assert_eq!(
        cond(&status, ConditionType::Available),
        cond(&existing, ConditionType::Available)
    );
    assert_eq!(
        cond(&status, ConditionType::Degraded).status,
        ConditionStatus::False
    );
    assert_eq!(status.versions, existing.versions);
}

#[test]
fn test_delete_without_successor_is_terminal() {
    let (reporter, _) = reporter();
    let mut existing = reporter.initial_status("foo");
    existing.versions.push(version("foo", "1.0.0"));

    let csv = CsvFixture::new("foo", "1.0.0")
        .phase(CsvPhase::Succeeded)
        .build();
    let status = reporter.expected_status(Some(&existing), &context(csv, None, true));

    assert!(status.versions.is_empty());
    let progressing = cond(&status, ConditionType::Progressing);
    assert_eq!(progressing.status, ConditionStatus::False);
    assert_eq!(
        progressing.message.as_deref(),
        Some("Uninstalled version 1.0.0")
    );
    assert_eq!(
        cond(&status, ConditionType::Available).status,
        ConditionStatus::False
    );
    assert_eq!(
        cond(&status, ConditionType::Degraded).status,
        ConditionStatus::False
    );
}

#[test]
fn test_delete_during_handoff_reports_successor() {
    let (reporter, _) = reporter();
    let old = CsvFixture::new("foo.v1", "1.0.0")
        .phase(CsvPhase::Succeeded)
        .build();
    let existing = reporter.expected_status(
        Some(&reporter.initial_status("foo")),
        &context(old.clone(), None, false),
    );

    let new = CsvFixture::new("foo.v2", "2.0.0")
        .replaces("foo.v1")
        .phase(CsvPhase::Succeeded)
        .build();
    let status = reporter.expected_status(Some(&existing), &context(old, Some(new), true));

    assert_eq!(status.versions, vec![version("foo.v2", "2.0.0")]);
    assert_eq!(
        cond(&status, ConditionType::Progressing).message.as_deref(),
        Some("Deployed version 2.0.0")
    );
    assert_eq!(
        cond(&status, ConditionType::Available).status,
        ConditionStatus::True
    );
}

#[test]
fn test_update_with_installing_successor_reports_successor_progress() {
    let (reporter, _) = reporter();
    let existing = reporter.initial_status("foo");

    let old = CsvFixture::new("foo.v1", "1.0.0")
        .phase(CsvPhase::Replacing)
        .build();
    let new = CsvFixture::new("foo.v2", "2.0.0")
        .replaces("foo.v1")
        .phase(CsvPhase::Installing)
        .build();
    let status = reporter.expected_status(Some(&existing), &context(old, Some(new), false));

    assert_eq!(
        cond(&status, ConditionType::Progressing).message.as_deref(),
        Some("Working toward 2.0.0")
    );
}

#[test]
fn test_derivation_is_deterministic() {
    let (reporter, _) = reporter();
    let existing = reporter.initial_status("foo");
    let csv = CsvFixture::new("foo", "1.2.3")
        .phase(CsvPhase::Succeeded)
        .build();
    let ctx = context(csv, None, false);

    let first = reporter.expected_status(Some(&existing), &ctx);
    let second = reporter.expected_status(Some(&existing), &ctx);
    assert_eq!(first, second);

    // Re-deriving on top of the result is a fixed point.
    let third = reporter.expected_status(Some(&first), &ctx);
    assert_eq!(first, third);
}
