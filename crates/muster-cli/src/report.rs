//! Plan report assembly.
//!
//! The report is the tool's single output: the mission's tasks, the
//! constraints derived between their decompositions, and every valid plan
//! with its resulting world facts.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use muster_core::predicate::GroundLiteral;
use muster_core::task::{Location, RobotCount};
use muster_graph::TaskGraph;
use muster_planner::{Constraint, ConstraintKind, MissionPlan};

/// Machine-readable record of one decomposition run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    /// Report identity.
    pub id: Uuid,

    /// When the report was produced.
    pub generated_at: DateTime<Utc>,

    /// The mission's task instances, in graph order.
    pub tasks: Vec<TaskSummary>,

    /// Constraints between decomposition choices.
    pub constraints: Vec<ConstraintSummary>,

    /// Every valid mission decomposition.
    pub plans: Vec<PlanSummary>,

    /// Distinct primitive actions appearing in any surviving plan.
    pub actions: Vec<String>,
}

/// A task instance as the mission declared it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: String,
    pub name: String,
    pub robots: RobotCount,
    pub location: Location,
}

/// One derived constraint, with decompositions named by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSummary {
    pub kind: ConstraintKind,
    pub first: String,
    pub second: String,
}

/// One valid plan: the chosen decomposition per task and the facts that
/// hold once its sequential effects have been applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub steps: Vec<StepSummary>,
    pub facts: Vec<GroundLiteral>,
}

/// One chosen decomposition inside a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSummary {
    pub task: String,
    pub decomposition: String,
}

impl PlanReport {
    /// Assemble the report for one finished run.
    pub fn assemble(
        graph: &TaskGraph,
        constraints: &[Constraint],
        plans: &[MissionPlan],
    ) -> Self {
        let tasks = graph
            .task_nodes()
            .into_iter()
            .filter_map(|index| graph.node(index).kind.as_task())
            .map(|task| TaskSummary {
                id: task.id.clone(),
                name: task.name.clone(),
                robots: task.robots,
                location: task.location.clone(),
            })
            .collect();

        let constraints = constraints
            .iter()
            .map(|constraint| ConstraintSummary {
                kind: constraint.kind,
                first: graph.node(constraint.pair.0).kind.label(),
                second: graph.node(constraint.pair.1).kind.label(),
            })
            .collect();

        let actions: BTreeSet<String> = plans
            .iter()
            .flat_map(|plan| plan.steps.iter())
            .filter_map(|step| graph.node(step.node).kind.as_decomposition())
            .flat_map(|decomposition| decomposition.path.iter())
            .map(|action| action.name.clone())
            .collect();

        let plans = plans
            .iter()
            .map(|plan| PlanSummary {
                steps: plan
                    .steps
                    .iter()
                    .map(|step| StepSummary {
                        task: step.task_id.clone(),
                        decomposition: step.decomposition_id.clone(),
                    })
                    .collect(),
                facts: plan.state.facts().to_vec(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            tasks,
            constraints,
            plans,
            actions: actions.into_iter().collect(),
        }
    }
}
