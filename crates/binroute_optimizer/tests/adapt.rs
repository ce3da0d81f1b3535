mod common;

use std::sync::Arc;

use binroute_optimizer::{
    adaptation::change_set::ChangeSet,
    engine::{Engine, EngineParams},
    error::Warning,
    solution::solution::Solution,
};
use jiff::SignedDuration;

fn planned() -> (Engine, Solution) {
    let engine = Engine::new(EngineParams::default());
    let solution = engine.optimize(
        common::problem(&[30.0, 20.0, 40.0, 10.0, 25.0], &[100.0, 100.0]),
        SignedDuration::from_secs(10),
    );

    (engine, solution)
}

#[test]
fn test_empty_change_set_is_idempotent() {
    let (engine, prior) = planned();

    let next = engine.adapt(&prior, &ChangeSet::default(), SignedDuration::from_secs(2));

    assert!(next.same_plan(&prior));
    assert_eq!(next.metadata.parent_version, Some(prior.version()));
}

#[test]
fn test_remove_then_readd_restores_assigned_count() {
    let (engine, prior) = planned();
    let assigned = prior.assigned_count();

    let removed = engine.adapt(
        &prior,
        &ChangeSet {
            removed_bin_ids: vec!["b2".to_owned()],
            ..ChangeSet::default()
        },
        SignedDuration::from_secs(2),
    );
    assert_eq!(removed.assigned_count(), assigned - 1);

    let problem = removed.problem();
    let bin = problem
        .bin_by_id("b2")
        .map(|index| problem.bin(index).clone())
        .unwrap();

    let readded = engine.adapt(
        &removed,
        &ChangeSet {
            added_bins: vec![bin],
            ..ChangeSet::default()
        },
        SignedDuration::from_secs(2),
    );

    assert_eq!(readded.assigned_count(), assigned);
    assert_eq!(readded.version(), 3);
    assert_eq!(readded.metrics.violations.total(), 0);
}

#[test]
fn test_zero_budget_returns_prior_plan() {
    let (engine, prior) = planned();

    let next = engine.adapt(
        &prior,
        &ChangeSet {
            removed_bin_ids: vec!["b0".to_owned()],
            ..ChangeSet::default()
        },
        SignedDuration::ZERO,
    );

    assert!(next.same_plan(&prior));
    assert!(next.warnings.iter().any(|warning| matches!(warning, Warning::BudgetExceeded { .. })));
    for (next, prior) in next.routes.iter().zip(&prior.routes) {
        assert!(Arc::ptr_eq(next, prior));
    }
}

#[test]
fn test_unknown_ids_are_reported_and_skipped() {
    let (engine, prior) = planned();

    let next = engine.adapt(
        &prior,
        &ChangeSet {
            removed_bin_ids: vec!["missing".to_owned(), "b1".to_owned()],
            unavailable_vehicle_ids: vec!["ghost".to_owned()],
            ..ChangeSet::default()
        },
        SignedDuration::from_secs(2),
    );

    let conflicts = next
        .warnings
        .iter()
        .filter(|warning| matches!(warning, Warning::AdaptationConflict { .. }))
        .count();
    assert_eq!(conflicts, 2);
    assert_eq!(next.assigned_count(), prior.assigned_count() - 1);
}
