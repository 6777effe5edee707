//! Decomposition search over the mission queue.
//!
//! Candidates grow one task at a time. Sequential scopes thread world state
//! through each chosen decomposition's effects; parallel scopes keep the
//! incoming state and defer interaction checks to conflict resolution at the
//! next sequential boundary (or once the queue drains).

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use tracing::{debug, info};

use muster_core::annotation::OperatorKind;
use muster_core::decomposition::Decomposition;
use muster_core::error::{MusterError, Result};
use muster_core::state::WorldState;
use muster_core::task::AbstractTask;
use muster_graph::{NodeKind, TaskGraph};

use crate::conflict;
use crate::constraints::Constraint;

/// One partial combination of decomposition choices during the search.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    /// Decomposition nodes chosen so far, in queue order.
    pub(crate) steps: Vec<NodeIndex>,

    /// World state after the effects applied so far.
    pub(crate) state: WorldState,
}

/// One chosen decomposition inside a finished plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    /// Graph node of the chosen decomposition.
    pub node: NodeIndex,

    /// Identity of the decomposition (`<task instance id>|<path number>`).
    pub decomposition_id: String,

    /// Identity of the task instance it realizes.
    pub task_id: String,
}

/// A complete valid mission decomposition: one chosen path per task.
#[derive(Debug, Clone)]
pub struct MissionPlan {
    /// The chosen decompositions, in queue order.
    pub steps: Vec<PlanStep>,

    /// World state once every sequentially applied effect has landed.
    pub state: WorldState,
}

/// Enumerate every valid combination of task decompositions.
///
/// Consumes the mission queue produced by [`crate::queue::linearize`]. Fatal
/// errors mean the mission as written admits no valid decomposition at all;
/// an empty result only occurs for a mission with no tasks.
pub fn enumerate(
    graph: &TaskGraph,
    mut queue: VecDeque<NodeIndex>,
    initial: &WorldState,
    constraints: &[Constraint],
) -> Result<Vec<MissionPlan>> {
    let mut live: Vec<Candidate> = Vec::new();
    let mut pending: Vec<NodeIndex> = Vec::new();

    while !queue.is_empty() {
        visit(
            graph,
            initial,
            constraints,
            None,
            &mut queue,
            &mut live,
            &mut pending,
        )?;
    }

    // Parallel tasks still unchecked once the queue drains (a mission rooted
    // in `#`, or ending inside one) get their resolution pass here.
    if pending.len() > 1 {
        conflict::resolve_conflicts(graph, constraints, &mut live, &pending)?;
    }

    let plans: Vec<MissionPlan> = live
        .into_iter()
        .map(|candidate| MissionPlan {
            steps: candidate
                .steps
                .iter()
                .filter_map(|&node| {
                    graph
                        .node(node)
                        .kind
                        .as_decomposition()
                        .map(|decomposition| PlanStep {
                            node,
                            decomposition_id: decomposition.id.clone(),
                            task_id: decomposition.task.id.clone(),
                        })
                })
                .collect(),
            state: candidate.state,
        })
        .collect();

    info!("Decomposition search finished with {} valid plans", plans.len());
    Ok(plans)
}

/// Process the queue front: an operator opens a scope for its structural
/// children, a task multiplies the live candidates by its decompositions.
fn visit(
    graph: &TaskGraph,
    initial: &WorldState,
    constraints: &[Constraint],
    scope: Option<OperatorKind>,
    queue: &mut VecDeque<NodeIndex>,
    live: &mut Vec<Candidate>,
    pending: &mut Vec<NodeIndex>,
) -> Result<()> {
    let Some(current) = queue.pop_front() else {
        return Ok(());
    };

    match &graph.node(current).kind {
        NodeKind::Operator(kind) => {
            let kind = *kind;
            if kind == OperatorKind::Sequential && pending.len() > 1 {
                conflict::resolve_conflicts(graph, constraints, live, pending.as_slice())?;
                pending.clear();
            }
            while let Some(&next) = queue.front() {
                if !graph.is_structural_child(current, next) {
                    break;
                }
                visit(graph, initial, constraints, Some(kind), queue, live, pending)?;
            }
        }
        NodeKind::Task(task) => {
            visit_task(graph, initial, scope, current, task, live, pending)?;
        }
        _ => {}
    }

    Ok(())
}

fn visit_task(
    graph: &TaskGraph,
    initial: &WorldState,
    scope: Option<OperatorKind>,
    current: NodeIndex,
    task: &AbstractTask,
    live: &mut Vec<Candidate>,
    pending: &mut Vec<NodeIndex>,
) -> Result<()> {
    let parallel = scope == Some(OperatorKind::Parallel);
    let choices: Vec<(NodeIndex, &Decomposition)> = graph
        .decompositions_of(current)
        .into_iter()
        .filter_map(|node| {
            graph
                .node(node)
                .kind
                .as_decomposition()
                .map(|decomposition| (node, decomposition))
        })
        .collect();

    if live.is_empty() {
        let mut seeded = Vec::new();
        for (node, decomposition) in &choices {
            if !decomposition.preconditions_hold(initial) {
                continue;
            }
            let state = if parallel {
                initial.clone()
            } else {
                initial.apply_all(decomposition.ground_effects())
            };
            seeded.push(Candidate {
                steps: vec![*node],
                state,
            });
        }
        if seeded.is_empty() {
            return Err(MusterError::NoValidDecomposition {
                task_id: task.id.clone(),
                task_name: task.name.clone(),
            });
        }
        debug!("Task {} seeded {} candidates", task.id, seeded.len());
        *live = seeded;
    } else {
        let mut extended = Vec::new();
        for candidate in live.iter() {
            let before = extended.len();
            for (node, decomposition) in &choices {
                if !decomposition.preconditions_hold(&candidate.state) {
                    continue;
                }
                let mut steps = candidate.steps.clone();
                steps.push(*node);
                let state = if parallel {
                    candidate.state.clone()
                } else {
                    candidate.state.apply_all(decomposition.ground_effects())
                };
                extended.push(Candidate { steps, state });
            }
            if extended.len() == before {
                return Err(MusterError::NoValidDecomposition {
                    task_id: task.id.clone(),
                    task_name: task.name.clone(),
                });
            }
        }
        debug!(
            "Task {} extended the pool to {} candidates",
            task.id,
            extended.len()
        );
        *live = extended;
    }

    if parallel {
        pending.push(current);
    }

    Ok(())
}
