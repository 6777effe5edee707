//! Constraint derivation: execution-order and resource relations between
//! decomposition choices, recomputed from the graph for each mission run.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use muster_core::annotation::OperatorKind;
use muster_graph::{NodeKind, TaskGraph};

/// The relation a constraint asserts between two decompositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// The first decomposition executes strictly before the second.
    Sequential,

    /// The pair shares a non-cooperative resource scope.
    NonCooperative { group: bool, divisible: bool },

    /// The pair runs in the same parallel scope with no direct ordering or
    /// resource relation. Informational output only; conflict resolution
    /// never consults it.
    CoOccurrence,
}

/// A constraint between two decomposition nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    /// What the constraint asserts.
    pub kind: ConstraintKind,

    /// The decomposition nodes involved, in queue order.
    pub pair: (NodeIndex, NodeIndex),
}

impl Constraint {
    /// True if the constraint joins exactly these two nodes, in either
    /// orientation.
    pub fn involves(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.pair == (a, b) || self.pair == (b, a)
    }

    /// True for a non-cooperative constraint that actually restricts
    /// resource sharing: not group-shared, or not divisible.
    pub fn is_tight_non_coop(&self) -> bool {
        matches!(
            self.kind,
            ConstraintKind::NonCooperative { group, divisible } if !group || !divisible
        )
    }
}

/// Derive the constraint set for one mission queue.
///
/// Every pair of tasks in queue order contributes one constraint per
/// decomposition combination: sequential when their lowest common ancestor
/// composes them in order, co-occurrence when it is a parallel operator.
/// A non-cooperation edge between parallel tasks upgrades their
/// co-occurrence to a non-cooperative constraint carrying the scope's flags.
pub fn derive_constraints(graph: &TaskGraph, queue: &VecDeque<NodeIndex>) -> Vec<Constraint> {
    let tasks: Vec<NodeIndex> = queue
        .iter()
        .copied()
        .filter(|&index| graph.node(index).kind.is_task())
        .collect();

    let mut constraints = Vec::new();

    for (position, &first) in tasks.iter().enumerate() {
        for &second in tasks.iter().skip(position + 1) {
            let parallel = matches!(
                lowest_common_ancestor(graph, first, second)
                    .map(|ancestor| &graph.node(ancestor).kind),
                Some(NodeKind::Operator(OperatorKind::Parallel))
            );
            let kind = if parallel {
                match graph.non_coop_between(first, second) {
                    Some((group, divisible)) => {
                        ConstraintKind::NonCooperative { group, divisible }
                    }
                    None => ConstraintKind::CoOccurrence,
                }
            } else {
                ConstraintKind::Sequential
            };

            for d1 in graph.decompositions_of(first) {
                for d2 in graph.decompositions_of(second) {
                    constraints.push(Constraint {
                        kind,
                        pair: (d1, d2),
                    });
                }
            }
        }
    }

    constraints
}

fn lowest_common_ancestor(graph: &TaskGraph, a: NodeIndex, b: NodeIndex) -> Option<NodeIndex> {
    let mut ancestors = Vec::new();
    let mut current = Some(a);
    while let Some(node) = current {
        ancestors.push(node);
        current = graph.hierarchy_parent(node);
    }

    let mut current = Some(b);
    while let Some(node) = current {
        if ancestors.contains(&node) {
            return Some(node);
        }
        current = graph.hierarchy_parent(node);
    }
    None
}
