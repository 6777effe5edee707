//! Conflict resolution for parallel-scope decompositions.
//!
//! Runs at each sequential boundary over the tasks collected since the last
//! one. Conflicting decomposition pairs are struck from the live candidates;
//! a task whose every decomposition ends up implicated makes the mission
//! unsolvable.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use tracing::warn;

use muster_core::decomposition::Decomposition;
use muster_core::error::{MusterError, Result};
use muster_core::predicate::{Literal, Term};
use muster_graph::TaskGraph;

use crate::constraints::Constraint;
use crate::enumerate::Candidate;

/// Strike candidates pairing conflicting decompositions of the pending
/// parallel tasks.
pub(crate) fn resolve_conflicts(
    graph: &TaskGraph,
    constraints: &[Constraint],
    live: &mut Vec<Candidate>,
    pending: &[NodeIndex],
) -> Result<()> {
    let mut implicated: HashMap<NodeIndex, HashSet<NodeIndex>> = HashMap::new();

    for (position, &first_task) in pending.iter().enumerate() {
        for &second_task in pending.iter().skip(position + 1) {
            for d1 in graph.decompositions_of(first_task) {
                for d2 in graph.decompositions_of(second_task) {
                    let Some(first) = graph.node(d1).kind.as_decomposition() else {
                        continue;
                    };
                    let Some(second) = graph.node(d2).kind.as_decomposition() else {
                        continue;
                    };

                    let tight = constraints.iter().any(|constraint| {
                        constraint.is_tight_non_coop() && constraint.involves(d1, d2)
                    });

                    if !decompositions_conflict(first, second, tight) {
                        continue;
                    }
                    warn!(
                        "Decompositions {} and {} conflict, striking the pair",
                        first.id, second.id
                    );

                    implicate(graph, &mut implicated, first_task, d1)?;
                    implicate(graph, &mut implicated, second_task, d2)?;

                    live.retain(|candidate| {
                        !(candidate.steps.contains(&d1) && candidate.steps.contains(&d2))
                    });
                }
            }
        }
    }

    Ok(())
}

/// Record a decomposition as conflict-implicated, failing once every
/// decomposition of its task is.
fn implicate(
    graph: &TaskGraph,
    implicated: &mut HashMap<NodeIndex, HashSet<NodeIndex>>,
    task: NodeIndex,
    decomposition: NodeIndex,
) -> Result<()> {
    let entry = implicated.entry(task).or_default();
    entry.insert(decomposition);

    if entry.len() == graph.decompositions_of(task).len() {
        let kind = &graph.node(task).kind;
        let (task_id, task_name) = match kind.as_task() {
            Some(task) => (task.id.clone(), task.name.clone()),
            None => (kind.label(), kind.label()),
        };
        return Err(MusterError::UnsolvableConflict { task_id, task_name });
    }

    Ok(())
}

/// Check whether any effect of `first` clashes with any effect of `second`.
fn decompositions_conflict(first: &Decomposition, second: &Decomposition, tight: bool) -> bool {
    first.effects.iter().any(|e1| {
        second
            .effects
            .iter()
            .any(|e2| effects_conflict(first, e1, second, e2, tight))
    })
}

fn effects_conflict(
    d1: &Decomposition,
    e1: &Literal,
    d2: &Decomposition,
    e2: &Literal,
    tight: bool,
) -> bool {
    match (e1, e2) {
        (Literal::Ground(a), Literal::Ground(b)) => a.conflicts_with(b),
        (Literal::Lifted(a), Literal::Lifted(b)) => {
            a.predicate == b.predicate
                && a.args.len() == b.args.len()
                && a.positive != b.positive
                && a.args
                    .iter()
                    .zip(&b.args)
                    .all(|(t1, t2)| terms_overlap(d1, t1, d2, t2, tight))
        }
        // A ground effect and a lifted one are owned by differently bound
        // tasks; treat them as touching different objects.
        _ => false,
    }
}

/// Decide whether two argument positions can denote the same object.
///
/// A pair of robot-sorted variables is special: whether two of them may end
/// up bound to the same robot is exactly what the non-cooperation flags
/// encode, so the scope's tightness answers it. Other variable pairs unify
/// with anything, constants only with themselves, and a constant against a
/// variable is conservatively an overlap.
fn terms_overlap(
    d1: &Decomposition,
    t1: &Term,
    d2: &Decomposition,
    t2: &Term,
    tight: bool,
) -> bool {
    match (t1, t2) {
        (Term::Constant(a), Term::Constant(b)) => a == b,
        (Term::Variable(_), Term::Variable(_)) => {
            if names_robot(d1, t1) || names_robot(d2, t2) {
                tight
            } else {
                true
            }
        }
        _ => true,
    }
}

fn names_robot(decomposition: &Decomposition, term: &Term) -> bool {
    term.is_variable()
        && decomposition
            .path
            .iter()
            .flat_map(|action| action.parameters.iter())
            .any(|parameter| parameter.name == term.name() && parameter.is_robot_sort())
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::predicate::LiftedLiteral;
    use muster_core::task::{
        AbstractTask, Location, Parameter, PrimitiveTask, RobotCount,
    };

    fn create_decomposition(
        id: &str,
        parameters: Vec<Parameter>,
        effects: Vec<LiftedLiteral>,
    ) -> Decomposition {
        let task = AbstractTask {
            id: "AT1_1".to_string(),
            name: "Task".to_string(),
            robots: RobotCount::Fixed(1),
            location: Location::Single("locA".to_string()),
            bindings: Vec::new(),
            triggers: Vec::new(),
        };
        let action = PrimitiveTask {
            name: "act".to_string(),
            parameters,
            capabilities: Vec::new(),
            preconditions: Vec::new(),
            effects,
        };
        Decomposition::derive(id, task, vec![action])
    }

    fn ground(predicate: &str, object: &str, positive: bool) -> LiftedLiteral {
        LiftedLiteral::new(predicate, vec![Term::constant(object)], positive)
    }

    #[test]
    fn test_ground_effects_conflict_on_same_atom() {
        let first = create_decomposition("A|1", vec![], vec![ground("clean", "room1", true)]);
        let second = create_decomposition("B|1", vec![], vec![ground("clean", "room1", false)]);

        assert!(decompositions_conflict(&first, &second, false));
    }

    #[test]
    fn test_ground_effects_ignore_different_atoms() {
        let first = create_decomposition("A|1", vec![], vec![ground("clean", "room1", true)]);
        let second = create_decomposition("B|1", vec![], vec![ground("clean", "room2", false)]);

        assert!(!decompositions_conflict(&first, &second, true));
    }

    #[test]
    fn test_robot_variable_overlap_follows_tightness() {
        let effect = |positive| {
            LiftedLiteral::new(
                "holds",
                vec![Term::variable("?r"), Term::constant("box1")],
                positive,
            )
        };
        let first = create_decomposition(
            "A|1",
            vec![Parameter::new("?r", "robot")],
            vec![effect(true)],
        );
        let second = create_decomposition(
            "B|1",
            vec![Parameter::new("?r", "robot")],
            vec![effect(false)],
        );

        assert!(!decompositions_conflict(&first, &second, false));
        assert!(decompositions_conflict(&first, &second, true));
    }

    #[test]
    fn test_non_robot_variable_overlaps_anything() {
        let first = create_decomposition(
            "A|1",
            vec![Parameter::new("?slot", "location")],
            vec![LiftedLiteral::new(
                "reserved",
                vec![Term::variable("?slot")],
                true,
            )],
        );
        let second = create_decomposition(
            "B|1",
            vec![],
            vec![LiftedLiteral::new(
                "reserved",
                vec![Term::constant("slot3")],
                false,
            )],
        );

        // Mixed ground/lifted literals never compare, so pit the lifted one
        // against another lifted effect.
        let lifted_second = create_decomposition(
            "B|2",
            vec![Parameter::new("?other", "location")],
            vec![LiftedLiteral::new(
                "reserved",
                vec![Term::variable("?other")],
                false,
            )],
        );

        assert!(!decompositions_conflict(&first, &second, false));
        assert!(decompositions_conflict(&first, &lifted_second, false));
    }

    #[test]
    fn test_constant_against_robot_variable_overlaps() {
        let first = create_decomposition(
            "A|1",
            vec![Parameter::new("?obj", "object")],
            vec![LiftedLiteral::new(
                "holds",
                vec![Term::constant("r1"), Term::variable("?obj")],
                true,
            )],
        );
        let second = create_decomposition(
            "B|1",
            vec![
                Parameter::new("?r", "robot"),
                Parameter::new("?obj", "object"),
            ],
            vec![LiftedLiteral::new(
                "holds",
                vec![Term::variable("?r"), Term::variable("?obj")],
                false,
            )],
        );

        // The named robot may be whoever binds ?r, tight scope or not.
        assert!(decompositions_conflict(&first, &second, false));
    }

    #[test]
    fn test_opposite_polarity_required() {
        let first = create_decomposition("A|1", vec![], vec![ground("clean", "room1", true)]);
        let second = create_decomposition("B|1", vec![], vec![ground("clean", "room1", true)]);

        assert!(!decompositions_conflict(&first, &second, true));
    }
}
