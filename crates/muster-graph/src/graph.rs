//! The task graph: operators, goals, tasks and decompositions joined by
//! hierarchy, context-dependency and non-cooperation edges.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use muster_core::annotation::OperatorKind;
use muster_core::decomposition::Decomposition;
use muster_core::task::AbstractTask;

/// What a task-graph node represents.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A composition operator over its children.
    Operator(OperatorKind),

    /// A goal refined by the nodes below it.
    Goal(String),

    /// An abstract task instance.
    Task(AbstractTask),

    /// One concrete decomposition of its parent task.
    Decomposition(Decomposition),
}

impl NodeKind {
    /// The task instance, if this node is a task.
    pub fn as_task(&self) -> Option<&AbstractTask> {
        match self {
            NodeKind::Task(task) => Some(task),
            _ => None,
        }
    }

    /// The decomposition, if this node is one.
    pub fn as_decomposition(&self) -> Option<&Decomposition> {
        match self {
            NodeKind::Decomposition(decomposition) => Some(decomposition),
            _ => None,
        }
    }

    /// True for task nodes.
    pub fn is_task(&self) -> bool {
        matches!(self, NodeKind::Task(_))
    }

    /// Short identifier for logs and error messages.
    pub fn label(&self) -> String {
        match self {
            NodeKind::Operator(kind) => kind.symbol().to_string(),
            NodeKind::Goal(id) => id.clone(),
            NodeKind::Task(task) => task.id.clone(),
            NodeKind::Decomposition(decomposition) => decomposition.id.clone(),
        }
    }
}

/// A node of the task graph.
#[derive(Debug, Clone)]
pub struct TaskNode {
    /// What the node represents.
    pub kind: NodeKind,

    /// This node heads a non-cooperative scope.
    pub non_coop: bool,

    /// Scope flag: the resource is shared by the group as a whole.
    pub group: bool,

    /// Scope flag: participation in the resource is divisible.
    pub divisible: bool,
}

impl TaskNode {
    /// Create a node outside any non-cooperative scope.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            non_coop: false,
            group: true,
            divisible: true,
        }
    }
}

/// Edge kinds of the task graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Parent-to-child refinement, in document order.
    Hierarchy,

    /// The source decomposition must occur for the target's context to hold.
    ContextDependency,

    /// The endpoints compete for a non-cooperative resource scope.
    NonCooperative { group: bool, divisible: bool },
}

/// Directed graph over the structure of a mission.
///
/// Hierarchy edges form a tree rooted at the annotation root; context
/// dependencies and non-cooperation links cut across it.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    graph: DiGraph<TaskNode, EdgeKind>,
}

impl TaskGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index.
    pub fn add_node(&mut self, node: TaskNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Add an edge of the given kind.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, kind: EdgeKind) {
        self.graph.add_edge(source, target, kind);
    }

    /// The node at `index`.
    pub fn node(&self, index: NodeIndex) -> &TaskNode {
        &self.graph[index]
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// All node indices, ascending.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Hierarchy children of `index`, in insertion (document) order.
    pub fn hierarchy_children(&self, index: NodeIndex) -> Vec<NodeIndex> {
        // petgraph iterates out-edges newest first; restore insertion order.
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .filter(|edge| *edge.weight() == EdgeKind::Hierarchy)
            .map(|edge| edge.target())
            .collect();
        children.reverse();
        children
    }

    /// Hierarchy parent of `index`, if any.
    pub fn hierarchy_parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(index, Direction::Incoming)
            .find(|edge| *edge.weight() == EdgeKind::Hierarchy)
            .map(|edge| edge.source())
    }

    /// Decomposition children of a task node, in insertion order.
    pub fn decompositions_of(&self, task: NodeIndex) -> Vec<NodeIndex> {
        self.hierarchy_children(task)
            .into_iter()
            .filter(|child| self.node(*child).kind.as_decomposition().is_some())
            .collect()
    }

    /// All task nodes, ascending by index.
    pub fn task_nodes(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|index| self.node(*index).kind.is_task())
            .collect()
    }

    /// All task nodes at or below `index` in the hierarchy.
    pub fn task_descendants(&self, index: NodeIndex) -> Vec<NodeIndex> {
        if self.node(index).kind.is_task() {
            return vec![index];
        }

        let mut tasks = Vec::new();
        for child in self.hierarchy_children(index) {
            tasks.extend(self.task_descendants(child));
        }
        tasks
    }

    /// Depth-first discovery order starting at `start`, followed by every
    /// node not reachable from it, ascending.
    ///
    /// Context-dependency resolution walks this order looking for the first
    /// task whose decompositions can establish a pending condition.
    pub fn search_order(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut visited = vec![false; self.graph.node_count()];
        self.discover(start, &mut visited, &mut order);

        for index in self.graph.node_indices() {
            if !visited[index.index()] {
                self.discover(index, &mut visited, &mut order);
            }
        }
        order
    }

    fn discover(&self, index: NodeIndex, visited: &mut [bool], order: &mut Vec<NodeIndex>) {
        if visited[index.index()] {
            return;
        }
        visited[index.index()] = true;
        order.push(index);

        let mut targets: Vec<NodeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| edge.target())
            .collect();
        targets.reverse();

        for target in targets {
            self.discover(target, visited, order);
        }
    }

    /// True if `index` is invisible to plan enumeration: a goal node, or an
    /// operator composing fewer than two children.
    pub fn is_transparent(&self, index: NodeIndex) -> bool {
        match &self.node(index).kind {
            NodeKind::Goal(_) => true,
            NodeKind::Operator(_) => self.hierarchy_children(index).len() < 2,
            _ => false,
        }
    }

    /// True if `candidate` sits below `parent`, looking through transparent
    /// nodes.
    pub fn is_structural_child(&self, parent: NodeIndex, candidate: NodeIndex) -> bool {
        for child in self.hierarchy_children(parent) {
            if child == candidate {
                return true;
            }
            if self.is_transparent(child) && self.is_structural_child(child, candidate) {
                return true;
            }
        }
        false
    }

    /// Scope flags of a non-cooperation link between two nodes, if one
    /// exists in either direction.
    pub fn non_coop_between(&self, a: NodeIndex, b: NodeIndex) -> Option<(bool, bool)> {
        self.graph
            .edges_directed(a, Direction::Outgoing)
            .chain(self.graph.edges_directed(b, Direction::Outgoing))
            .find_map(|edge| match *edge.weight() {
                EdgeKind::NonCooperative { group, divisible }
                    if (edge.source() == a && edge.target() == b)
                        || (edge.source() == b && edge.target() == a) =>
                {
                    Some((group, divisible))
                }
                _ => None,
            })
    }

    /// True if any edge joins `source` to `target`.
    pub fn has_edge(&self, source: NodeIndex, target: NodeIndex) -> bool {
        self.graph.find_edge(source, target).is_some()
    }
}
