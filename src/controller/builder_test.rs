//! Tests for the status builder

use super::*;
use crate::controller::clock::MockClock;

fn clock() -> Arc<MockClock> {
    Arc::new(MockClock::fixed())
}

fn condition(status: &ClusterOperatorStatus, type_: ConditionType) -> ClusterOperatorStatusCondition {
    status
        .condition(type_)
        .cloned()
        .unwrap_or_else(|| panic!("missing {:?} condition", type_))
}

#[test]
fn test_new_conditions_are_appended_in_call_order() {
    let status = StatusBuilder::new(clock())
        .with_progressing(true, "working")
        .with_available(false, "")
        .with_degraded(false)
        .status();

    let types: Vec<_> = status.conditions.iter().map(|c| c.type_).collect();
    assert_eq!(
        types,
        vec![
            ConditionType::Progressing,
            ConditionType::Available,
            ConditionType::Degraded
        ]
    );
    assert!(status
        .conditions
        .iter()
        .all(|c| c.last_transition_time == "2024-05-01T12:00:00Z"));
}

#[test]
fn test_empty_message_is_omitted() {
    let status = StatusBuilder::new(clock())
        .with_available(false, "")
        .with_degraded(false)
        .status();

    assert_eq!(condition(&status, ConditionType::Available).message, None);
    assert_eq!(condition(&status, ConditionType::Degraded).message, None);
}

#[test]
fn test_same_value_twice_keeps_timestamp() {
    let clock = clock();
    let mut builder = StatusBuilder::new(clock.clone());
    builder
        .with_progressing(true, "working")
        .with_available(false, "")
        .with_degraded(false);
    let first = builder.status();

    clock.advance(chrono::Duration::minutes(5));
    builder
        .with_progressing(true, "working")
        .with_available(false, "")
        .with_degraded(false);
    let second = builder.status();

    assert_eq!(first, second);
}

#[test]
fn test_value_change_moves_timestamp() {
    let clock = clock();
    let mut builder = StatusBuilder::new(clock.clone());
    builder.with_available(true, "m1");
    let before = condition(&builder.status(), ConditionType::Available);

    clock.advance(chrono::Duration::seconds(30));
    builder.with_available(false, "m2");
    let after = condition(&builder.status(), ConditionType::Available);

    assert_eq!(after.status, ConditionStatus::False);
    assert_eq!(after.message.as_deref(), Some("m2"));
    assert_ne!(after.last_transition_time, before.last_transition_time);
    assert_eq!(after.last_transition_time, "2024-05-01T12:00:30Z");
}

#[test]
fn test_message_only_change_keeps_timestamp() {
    let clock = clock();
    let mut builder = StatusBuilder::new(clock.clone());
    builder.with_available(true, "m1");
    let before = condition(&builder.status(), ConditionType::Available);

    clock.advance(chrono::Duration::seconds(30));
    builder.with_available(true, "m2");
    let after = condition(&builder.status(), ConditionType::Available);

    assert_eq!(after.message.as_deref(), Some("m2"));
    assert_eq!(after.last_transition_time, before.last_transition_time);
}

#[test]
fn test_at_most_one_condition_per_type() {
    let status = StatusBuilder::new(clock())
        .with_progressing(true, "a")
        .with_progressing(false, "b")
        .with_progressing(true, "c")
        .status();

    assert_eq!(status.conditions.len(), 1);
    assert_eq!(
        condition(&status, ConditionType::Progressing).message.as_deref(),
        Some("c")
    );
}

#[test]
fn test_seeded_builder_preserves_untouched_fields() {
    let seed = StatusBuilder::new(clock())
        .with_progressing(true, "working")
        .with_available(true, "")
        .with_version("foo.v1", "1.0.0")
        .status();

    let status = StatusBuilder::from_existing(Some(&seed), clock())
        .with_progressing(false, "done")
        .status();

    assert_eq!(
        condition(&status, ConditionType::Available),
        condition(&seed, ConditionType::Available)
    );
    assert_eq!(status.versions, seed.versions);
}

#[test]
fn test_with_version_ignores_duplicates() {
    let status = StatusBuilder::new(clock())
        .with_version("foo.v1", "1.0.0")
        .with_version("foo.v1", "1.0.0")
        .with_version("foo.v1", "1.0.1")
        .status();

    assert_eq!(status.versions.len(), 2);
}

#[test]
fn test_without_version_removes_exact_pair_only() {
    let status = StatusBuilder::new(clock())
        .with_version("foo.v1", "1.0.0")
        .with_version("foo.v2", "2.0.0")
        .without_version("foo.v1", "9.9.9")
        .without_version("foo.v2", "2.0.0")
        .without_version("missing", "1.0.0")
        .status();

    assert_eq!(
        status.versions,
        vec![OperandVersion {
            name: "foo.v1".to_string(),
            version: "1.0.0".to_string()
        }]
    );
}
