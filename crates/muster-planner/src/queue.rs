//! Mission linearization: flattening the task graph into the queue that
//! drives plan enumeration.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use tracing::{debug, info};

use muster_graph::{NodeKind, TaskGraph};

/// Flatten the graph into the mission queue.
///
/// Nodes are visited in index order, which reproduces the order the
/// builder created them in. Only nodes the enumerator acts on are kept:
/// every task, and every operator actually composing two or more children.
/// Goal nodes and single-child operators are semantic no-ops and never
/// enqueued.
pub fn linearize(graph: &TaskGraph) -> VecDeque<NodeIndex> {
    let mut queue = VecDeque::new();

    for index in graph.node_indices() {
        match &graph.node(index).kind {
            NodeKind::Task(task) => {
                debug!("Enqueued task {} at node {}", task.id, index.index());
                queue.push_back(index);
            }
            NodeKind::Operator(kind) => {
                if graph.hierarchy_children(index).len() > 1 {
                    debug!("Enqueued operator {} at node {}", kind, index.index());
                    queue.push_back(index);
                }
            }
            _ => {}
        }
    }

    info!("Mission queue linearized with {} entries", queue.len());
    queue
}
