//! Pure phase-ordering logic.
//!
//! Two orderings exist: the base pipeline of four phases and the extended
//! pipeline that inserts domain discovery after detection. Nothing here
//! fails; invalid inputs yield `None` or `false`.

use ideaforge_types::WorkflowPhase;

const BASE_PHASES: [WorkflowPhase; 4] = [
    WorkflowPhase::Detection,
    WorkflowPhase::Requirements,
    WorkflowPhase::TechStack,
    WorkflowPhase::ExecutionPlan,
];

const EXTENDED_PHASES: [WorkflowPhase; 5] = [
    WorkflowPhase::Detection,
    WorkflowPhase::DomainDiscovery,
    WorkflowPhase::Requirements,
    WorkflowPhase::TechStack,
    WorkflowPhase::ExecutionPlan,
];

/// The complete phase order for one workflow run.
#[must_use]
pub fn phase_order(use_domain_discovery: bool) -> &'static [WorkflowPhase] {
    if use_domain_discovery {
        &EXTENDED_PHASES
    } else {
        &BASE_PHASES
    }
}

/// The phase immediately following `current`, or `None` when `current` is
/// the last phase or absent from the applicable ordering.
#[must_use]
pub fn next_phase(
    current: WorkflowPhase,
    use_domain_discovery: bool,
) -> Option<WorkflowPhase> {
    let order = phase_order(use_domain_discovery);
    let index = order.iter().position(|phase| *phase == current)?;
    order.get(index + 1).copied()
}

/// True iff `current` is the final phase of either ordering.
#[must_use]
pub fn is_complete(current: WorkflowPhase) -> bool {
    current == WorkflowPhase::ExecutionPlan
}

/// True iff `proposed` is exactly the next phase after `current`.
#[must_use]
pub fn validate_transition(
    current: WorkflowPhase,
    proposed: WorkflowPhase,
    use_domain_discovery: bool,
) -> bool {
    next_phase(current, use_domain_discovery) == Some(proposed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_order_skips_domain_discovery() {
        assert_eq!(
            next_phase(WorkflowPhase::Detection, false),
            Some(WorkflowPhase::Requirements)
        );
        assert_eq!(
            next_phase(WorkflowPhase::Detection, true),
            Some(WorkflowPhase::DomainDiscovery)
        );
        assert_eq!(
            next_phase(WorkflowPhase::DomainDiscovery, true),
            Some(WorkflowPhase::Requirements)
        );
    }

    #[test]
    fn last_phase_has_no_successor() {
        assert_eq!(next_phase(WorkflowPhase::ExecutionPlan, false), None);
        assert_eq!(next_phase(WorkflowPhase::ExecutionPlan, true), None);
    }

    #[test]
    fn phase_absent_from_ordering_yields_none() {
        // Domain discovery is not in the base ordering at all.
        assert_eq!(next_phase(WorkflowPhase::DomainDiscovery, false), None);
    }

    #[test]
    fn only_execution_plan_completes_the_workflow() {
        assert!(is_complete(WorkflowPhase::ExecutionPlan));
        assert!(!is_complete(WorkflowPhase::TechStack));
        assert!(!is_complete(WorkflowPhase::Detection));
    }

    #[test]
    fn transitions_validate_against_the_applicable_ordering() {
        assert!(validate_transition(
            WorkflowPhase::Detection,
            WorkflowPhase::Requirements,
            false
        ));
        assert!(!validate_transition(
            WorkflowPhase::Detection,
            WorkflowPhase::Requirements,
            true
        ));
        assert!(!validate_transition(
            WorkflowPhase::Detection,
            WorkflowPhase::TechStack,
            false
        ));
    }

    #[test]
    fn orderings_walk_to_completion() {
        for use_dd in [false, true] {
            let order = phase_order(use_dd);
            let mut current = order[0];
            while let Some(next) = next_phase(current, use_dd) {
                assert!(validate_transition(current, next, use_dd));
                current = next;
            }
            assert!(is_complete(current));
        }
    }
}
