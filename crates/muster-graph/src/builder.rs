//! Recursive expansion of a runtime annotation tree into a task graph.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use tracing::{debug, info, warn};

use muster_core::annotation::{
    AnnotationKind, AnnotationNode, Context, GoalModel, VariableEnv, VariableValue,
};
use muster_core::decomposition::Decomposition;
use muster_core::error::{MusterError, Result};
use muster_core::predicate::Literal;
use muster_core::semantics::{self, AttributeCondition, SemanticMapping};
use muster_core::state::WorldState;
use muster_core::task::{AbstractTask, ObjectRef, PrimitiveTask};

use crate::graph::{EdgeKind, NodeKind, TaskGraph, TaskNode};

/// Builds the task graph for one mission.
///
/// The builder mirrors the annotation tree one-for-one into graph nodes,
/// expanding each task reference into its valid decompositions and wiring
/// context-dependency and non-cooperation edges as it descends.
pub struct GraphBuilder<'a> {
    instances: &'a HashMap<String, Vec<AbstractTask>>,
    paths: &'a HashMap<String, Vec<Vec<PrimitiveTask>>>,
    goal_model: &'a GoalModel,
    variables: &'a HashMap<String, VariableValue>,
    mappings: &'a [SemanticMapping],
    state: &'a WorldState,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder over the mission inputs.
    pub fn new(
        instances: &'a HashMap<String, Vec<AbstractTask>>,
        paths: &'a HashMap<String, Vec<Vec<PrimitiveTask>>>,
        goal_model: &'a GoalModel,
        variables: &'a HashMap<String, VariableValue>,
        mappings: &'a [SemanticMapping],
        state: &'a WorldState,
    ) -> Self {
        Self {
            instances,
            paths,
            goal_model,
            variables,
            mappings,
            state,
        }
    }

    /// Expand the annotation tree into a task graph.
    ///
    /// Fails if a referenced task instance is unknown, a task ends up with
    /// no valid decomposition, or a context condition can be satisfied
    /// neither by the initial state nor by any task built so far.
    pub fn build(&self, annotation: &AnnotationNode) -> Result<TaskGraph> {
        let mut graph = TaskGraph::new();
        let env: VariableEnv = self
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), value.value.clone()))
            .collect();

        self.visit(&mut graph, annotation, None, false, &env)?;

        info!("Task graph built with {} nodes", graph.node_count());
        Ok(graph)
    }

    fn visit(
        &self,
        graph: &mut TaskGraph,
        annot: &AnnotationNode,
        parent: Option<NodeIndex>,
        inherited_non_coop: bool,
        env: &VariableEnv,
    ) -> Result<()> {
        match annot.kind {
            AnnotationKind::Task => self.visit_task(graph, annot, parent, inherited_non_coop),
            _ => self.visit_composite(graph, annot, parent, inherited_non_coop, env),
        }
    }

    /// Operator, goal and means-end nodes: create the node, evaluate any
    /// guard, then recurse into the children.
    fn visit_composite(
        &self,
        graph: &mut TaskGraph,
        annot: &AnnotationNode,
        parent: Option<NodeIndex>,
        inherited_non_coop: bool,
        env: &VariableEnv,
    ) -> Result<()> {
        let mut guard: Option<Context> = None;
        let mut for_all: Option<(String, String)> = None;

        if let Some(goal_id) = &annot.related_goal {
            match self.goal_model.entry(goal_id) {
                Some(entry) => guard = entry.context.clone(),
                None => {
                    warn!("Goal {} has no goal model entry, treating it as unguarded", goal_id)
                }
            }
        } else if annot.kind == AnnotationKind::Operator {
            // No related goal: a forAll expansion. The iteration variables
            // live on the goal entry of the first generated child.
            if let Some(entry) = annot
                .children
                .first()
                .and_then(|child| child.related_goal.as_deref())
                .and_then(|goal_id| self.goal_model.entry(goal_id))
            {
                if let (Some(monitored), Some(controlled)) = (&entry.monitored, &entry.controlled)
                {
                    for_all = Some((monitored.name.clone(), controlled.name.clone()));
                }
            }
        }

        let kind = match annot.kind {
            AnnotationKind::Operator => NodeKind::Operator(annot.operator_kind()?),
            _ => NodeKind::Goal(annot.content.clone()),
        };
        let node = graph.add_node(TaskNode {
            kind,
            non_coop: annot.non_coop,
            group: annot.group,
            divisible: annot.divisible,
        });
        if let Some(parent) = parent {
            graph.add_edge(parent, node, EdgeKind::Hierarchy);
        }

        if let Some(context) = &guard {
            let active = semantics::evaluate_context(context, self.mappings, env, self.state)?;
            if !active {
                self.resolve_context_dependency(graph, parent, node, annot, context, env)?;
            }
        }

        let inherited = inherited_non_coop || annot.non_coop;

        // Scope closing is deferred to the last child in document order,
        // when every task of the scope exists in the graph.
        let child_count = annot.children.len();
        for (position, child) in annot.children.iter().enumerate() {
            let child_non_coop = if position + 1 == child_count {
                inherited
            } else {
                false
            };

            match &for_all {
                Some((monitored, controlled)) => {
                    let element = self.collection_element(monitored, position)?;
                    let mut child_env = env.clone();
                    child_env.insert(controlled.clone(), ObjectRef::Object(element));
                    self.visit(graph, child, Some(node), child_non_coop, &child_env)?;
                }
                None => {
                    self.visit(graph, child, Some(node), child_non_coop, env)?;
                }
            }
        }

        Ok(())
    }

    /// Task nodes: resolve the instance, close any non-cooperative scope,
    /// and expand the valid decomposition paths below the node.
    fn visit_task(
        &self,
        graph: &mut TaskGraph,
        annot: &AnnotationNode,
        parent: Option<NodeIndex>,
        inherited_non_coop: bool,
    ) -> Result<()> {
        let task = self.find_instance(&annot.content)?.clone();

        let mut task_node = TaskNode::new(NodeKind::Task(task.clone()));
        task_node.non_coop = true;
        let node = graph.add_node(task_node);
        if let Some(parent) = parent {
            graph.add_edge(parent, node, EdgeKind::Hierarchy);
        }

        if inherited_non_coop {
            self.close_non_coop_scope(graph, node);
        }

        let candidates = self
            .paths
            .get(&task.name)
            .map(|paths| paths.as_slice())
            .unwrap_or(&[]);

        let mut kept = 0;
        for path in candidates {
            if !self.path_is_valid(path, &task) {
                continue;
            }
            kept += 1;

            let decomposition = Decomposition::derive(
                format!("{}|{}", task.id, kept),
                task.clone(),
                path.clone(),
            );
            let mut path_node = TaskNode::new(NodeKind::Decomposition(decomposition));
            path_node.non_coop = true;
            let index = graph.add_node(path_node);
            graph.add_edge(node, index, EdgeKind::Hierarchy);
        }

        if kept == 0 {
            return Err(MusterError::NoValidDecomposition {
                task_id: task.id.clone(),
                task_name: task.name.clone(),
            });
        }

        debug!(
            "Task {} expanded with {} of {} candidate paths",
            task.id,
            kept,
            candidates.len()
        );
        Ok(())
    }

    /// A path is valid when no primitive task's precondition, once grounded
    /// through the task's bindings, contradicts the current world state.
    ///
    /// Preconditions that stay lifted cannot be judged here and pass.
    fn path_is_valid(&self, path: &[PrimitiveTask], task: &AbstractTask) -> bool {
        path.iter().all(|action| {
            action.preconditions.iter().all(|precondition| {
                let grounded =
                    precondition.ground(|variable| task.bound_object(variable).map(str::to_string));
                match grounded {
                    Literal::Ground(ground) => !self.state.contradicts(&ground),
                    Literal::Lifted(_) => true,
                }
            })
        })
    }

    /// Try to satisfy a failed guard from the effects of tasks already in
    /// the graph.
    ///
    /// Walks the graph in depth-first order from the guarded node's parent.
    /// The first task with a decomposition whose accumulated effects
    /// establish the guard wins; every such decomposition of that task gets
    /// a context-dependency edge to the guarded node. No match is fatal:
    /// the branch can never activate, so the mission model is malformed.
    fn resolve_context_dependency(
        &self,
        graph: &mut TaskGraph,
        parent: Option<NodeIndex>,
        node: NodeIndex,
        annot: &AnnotationNode,
        context: &Context,
        env: &VariableEnv,
    ) -> Result<()> {
        let condition = AttributeCondition::parse(&context.expression)?;
        let wanted = semantics::condition_literal(&condition, self.mappings, env)?;

        let start = parent.unwrap_or(node);
        let mut satisfying: Vec<NodeIndex> = Vec::new();

        for candidate in graph.search_order(start) {
            if !graph.node(candidate).kind.is_task() {
                continue;
            }
            for index in graph.decompositions_of(candidate) {
                let Some(decomposition) = graph.node(index).kind.as_decomposition() else {
                    continue;
                };
                let projected = self.state.apply_all(decomposition.ground_effects());
                if projected.supports(&wanted) {
                    satisfying.push(index);
                }
            }
            if !satisfying.is_empty() {
                break;
            }
        }

        if satisfying.is_empty() {
            return Err(MusterError::UnreachableContext {
                node: annot
                    .related_goal
                    .clone()
                    .unwrap_or_else(|| annot.content.clone()),
                condition: context.expression.clone(),
            });
        }

        for source in satisfying {
            debug!(
                "Context dependency on '{}' links {} to {}",
                context.expression,
                graph.node(source).kind.label(),
                graph.node(node).kind.label()
            );
            graph.add_edge(source, node, EdgeKind::ContextDependency);
        }
        Ok(())
    }

    /// Close a non-cooperative scope at its last task: walk up to the
    /// nearest flagged ancestor and link every pair of tasks below it.
    fn close_non_coop_scope(&self, graph: &mut TaskGraph, node: NodeIndex) {
        let mut current = node;
        let scope = loop {
            match graph.hierarchy_parent(current) {
                Some(parent) if graph.node(parent).non_coop => break parent,
                Some(parent) => current = parent,
                None => return,
            }
        };

        let group = graph.node(scope).group;
        let divisible = graph.node(scope).divisible;

        let tasks = graph.task_descendants(scope);
        for &first in &tasks {
            for &second in &tasks {
                if first != second && !graph.has_edge(first, second) {
                    graph.add_edge(
                        first,
                        second,
                        EdgeKind::NonCooperative { group, divisible },
                    );
                }
            }
        }
    }

    fn find_instance(&self, id: &str) -> Result<&AbstractTask> {
        self.instances
            .values()
            .flatten()
            .find(|instance| instance.id == id)
            .ok_or_else(|| MusterError::MissingTaskInstance { id: id.to_string() })
    }

    fn collection_element(&self, variable: &str, position: usize) -> Result<String> {
        let unbound = || MusterError::UnboundVariable {
            variable: variable.to_string(),
        };

        self.variables
            .get(variable)
            .and_then(|value| value.value.as_collection())
            .and_then(|elements| elements.get(position))
            .cloned()
            .ok_or_else(unbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::annotation::{Context, GoalEntry, GoalVariable};
    use muster_core::predicate::{GroundLiteral, LiftedLiteral, Term};
    use muster_core::semantics::PredicateDefinition;
    use muster_core::task::{Location, Parameter, RobotCount, VariableBinding};

    fn create_test_instance(id: &str, name: &str, object: &str) -> AbstractTask {
        AbstractTask {
            id: id.to_string(),
            name: name.to_string(),
            robots: RobotCount::Fixed(1),
            location: Location::Single("locA".to_string()),
            bindings: vec![VariableBinding::object("?r", object)],
            triggers: Vec::new(),
        }
    }

    fn create_move_action(from: &str, to: &str) -> PrimitiveTask {
        let mut action = PrimitiveTask::new("move");
        action.parameters = vec![Parameter::new("?r", "robot")];
        action.preconditions = vec![LiftedLiteral::new(
            "at",
            vec![Term::variable("?r"), Term::constant(from)],
            true,
        )];
        action.effects = vec![
            LiftedLiteral::new(
                "at",
                vec![Term::variable("?r"), Term::constant(from)],
                false,
            ),
            LiftedLiteral::new("at", vec![Term::variable("?r"), Term::constant(to)], true),
        ];
        action
    }

    fn create_clean_action() -> PrimitiveTask {
        let mut action = PrimitiveTask::new("sweep");
        action.parameters = vec![Parameter::new("?r", "robot")];
        action.effects = vec![LiftedLiteral::new("swept", vec![Term::variable("?r")], true)];
        action
    }

    fn mapping(attribute: &str, predicate: &str) -> SemanticMapping {
        SemanticMapping::attribute(
            attribute,
            PredicateDefinition::new(predicate, vec!["object".to_string()]),
        )
    }

    fn empty_variables() -> HashMap<String, VariableValue> {
        HashMap::new()
    }

    #[test]
    fn test_build_mirrors_annotation_structure() {
        let mut instances = HashMap::new();
        instances.insert(
            "Sweep".to_string(),
            vec![
                create_test_instance("AT1_1", "Sweep", "r1"),
                create_test_instance("AT1_2", "Sweep", "r2"),
            ],
        );
        let mut paths = HashMap::new();
        paths.insert("Sweep".to_string(), vec![vec![create_clean_action()]]);

        let goal_model = GoalModel::default();
        let variables = empty_variables();
        let state = WorldState::new();
        let builder = GraphBuilder::new(&instances, &paths, &goal_model, &variables, &[], &state);

        let annotation = AnnotationNode::operator(
            ";",
            vec![AnnotationNode::task("AT1_1"), AnnotationNode::task("AT1_2")],
        );
        let graph = builder.build(&annotation).unwrap();

        let root = graph.node_indices().next().unwrap();
        assert!(matches!(graph.node(root).kind, NodeKind::Operator(_)));

        let tasks = graph.task_nodes();
        assert_eq!(tasks.len(), 2);
        for task in tasks {
            assert_eq!(graph.decompositions_of(task).len(), 1);
        }
    }

    #[test]
    fn test_contradicted_paths_are_filtered() {
        let mut instances = HashMap::new();
        instances.insert(
            "Move".to_string(),
            vec![create_test_instance("AT1_1", "Move", "r1")],
        );
        let mut paths = HashMap::new();
        paths.insert(
            "Move".to_string(),
            vec![
                vec![create_move_action("locA", "locB")],
                vec![create_move_action("locC", "locB")],
            ],
        );

        let goal_model = GoalModel::default();
        let variables = empty_variables();
        let state = WorldState::from_facts(vec![
            GroundLiteral::new("at", vec!["r1".to_string(), "locA".to_string()], true),
            GroundLiteral::new("at", vec!["r1".to_string(), "locC".to_string()], false),
        ]);
        let builder = GraphBuilder::new(&instances, &paths, &goal_model, &variables, &[], &state);

        let graph = builder.build(&AnnotationNode::task("AT1_1")).unwrap();

        let tasks = graph.task_nodes();
        let decompositions = graph.decompositions_of(tasks[0]);
        assert_eq!(decompositions.len(), 1);

        let kept = graph.node(decompositions[0]).kind.as_decomposition().unwrap();
        assert_eq!(kept.id, "AT1_1|1");
        assert_eq!(kept.path[0].preconditions[0].args[1], Term::constant("locA"));
    }

    #[test]
    fn test_all_paths_invalid_is_fatal() {
        let mut instances = HashMap::new();
        instances.insert(
            "Move".to_string(),
            vec![create_test_instance("AT1_1", "Move", "r1")],
        );
        let mut paths = HashMap::new();
        paths.insert(
            "Move".to_string(),
            vec![vec![create_move_action("locA", "locB")]],
        );

        let goal_model = GoalModel::default();
        let variables = empty_variables();
        let state = WorldState::from_facts(vec![GroundLiteral::new(
            "at",
            vec!["r1".to_string(), "locA".to_string()],
            false,
        )]);
        let builder = GraphBuilder::new(&instances, &paths, &goal_model, &variables, &[], &state);

        let err = builder.build(&AnnotationNode::task("AT1_1")).unwrap_err();
        assert!(
            matches!(err, MusterError::NoValidDecomposition { task_id, .. } if task_id == "AT1_1")
        );
    }

    #[test]
    fn test_unknown_instance_is_fatal() {
        let instances = HashMap::new();
        let paths = HashMap::new();
        let goal_model = GoalModel::default();
        let variables = empty_variables();
        let state = WorldState::new();
        let builder = GraphBuilder::new(&instances, &paths, &goal_model, &variables, &[], &state);

        let err = builder.build(&AnnotationNode::task("AT9_1")).unwrap_err();
        assert!(matches!(err, MusterError::MissingTaskInstance { id } if id == "AT9_1"));
    }

    #[test]
    fn test_non_coop_scope_links_every_task_pair() {
        let mut instances = HashMap::new();
        instances.insert(
            "Sweep".to_string(),
            vec![
                create_test_instance("AT1_1", "Sweep", "r1"),
                create_test_instance("AT1_2", "Sweep", "r2"),
            ],
        );
        let mut paths = HashMap::new();
        paths.insert("Sweep".to_string(), vec![vec![create_clean_action()]]);

        let goal_model = GoalModel::default();
        let variables = empty_variables();
        let state = WorldState::new();
        let builder = GraphBuilder::new(&instances, &paths, &goal_model, &variables, &[], &state);

        let annotation = AnnotationNode::operator(
            "#",
            vec![AnnotationNode::task("AT1_1"), AnnotationNode::task("AT1_2")],
        )
        .non_cooperative(true, false);
        let graph = builder.build(&annotation).unwrap();

        let tasks = graph.task_nodes();
        assert_eq!(graph.non_coop_between(tasks[0], tasks[1]), Some((true, false)));
        assert_eq!(graph.non_coop_between(tasks[1], tasks[0]), Some((true, false)));
    }

    #[test]
    fn test_for_all_binds_each_collection_element() {
        let mut instances = HashMap::new();
        instances.insert(
            "Sweep".to_string(),
            vec![
                create_test_instance("AT1_1", "Sweep", "r1"),
                create_test_instance("AT1_2", "Sweep", "r2"),
            ],
        );
        let mut paths = HashMap::new();
        paths.insert("Sweep".to_string(), vec![vec![create_clean_action()]]);

        let goal_model = GoalModel::new(vec![GoalEntry {
            id: "G2".to_string(),
            context: Some(Context::condition("current_room.accessible")),
            monitored: Some(GoalVariable {
                name: "rooms".to_string(),
                sort: "room".to_string(),
            }),
            controlled: Some(GoalVariable {
                name: "current_room".to_string(),
                sort: "room".to_string(),
            }),
        }]);
        let mut variables = HashMap::new();
        variables.insert(
            "rooms".to_string(),
            VariableValue {
                value: ObjectRef::Collection(vec!["room1".to_string(), "room2".to_string()]),
                sort: "room".to_string(),
            },
        );
        let mappings = vec![mapping("accessible", "accessible")];

        let annotation = AnnotationNode::operator(
            "#",
            vec![
                AnnotationNode {
                    kind: AnnotationKind::MeansEnd,
                    content: "G2_room1".to_string(),
                    related_goal: Some("G2".to_string()),
                    children: vec![AnnotationNode::task("AT1_1")],
                    non_coop: false,
                    group: true,
                    divisible: true,
                },
                AnnotationNode {
                    kind: AnnotationKind::MeansEnd,
                    content: "G2_room2".to_string(),
                    related_goal: Some("G2".to_string()),
                    children: vec![AnnotationNode::task("AT1_2")],
                    non_coop: false,
                    group: true,
                    divisible: true,
                },
            ],
        );

        // Both rooms accessible: both branches activate.
        let state = WorldState::from_facts(vec![
            GroundLiteral::new("accessible", vec!["room1".to_string()], true),
            GroundLiteral::new("accessible", vec!["room2".to_string()], true),
        ]);
        let builder =
            GraphBuilder::new(&instances, &paths, &goal_model, &variables, &mappings, &state);
        let graph = builder.build(&annotation).unwrap();
        assert_eq!(graph.task_nodes().len(), 2);

        // Second room inaccessible: the second branch's guard fails and no
        // built task can establish it.
        let state = WorldState::from_facts(vec![GroundLiteral::new(
            "accessible",
            vec!["room1".to_string()],
            true,
        )]);
        let builder =
            GraphBuilder::new(&instances, &paths, &goal_model, &variables, &mappings, &state);
        let err = builder.build(&annotation).unwrap_err();
        assert!(matches!(err, MusterError::UnreachableContext { .. }));
    }

    #[test]
    fn test_failed_guard_resolved_by_context_dependency() {
        let mut sweep = PrimitiveTask::new("sweep");
        sweep.parameters = vec![Parameter::new("?room", "room")];
        sweep.effects = vec![LiftedLiteral::new(
            "clean",
            vec![Term::variable("?room")],
            true,
        )];

        let cleaner = AbstractTask {
            id: "AT1_1".to_string(),
            name: "CleanRoom".to_string(),
            robots: RobotCount::Fixed(1),
            location: Location::Single("room1".to_string()),
            bindings: vec![VariableBinding::object("?room", "room1")],
            triggers: Vec::new(),
        };

        let mut instances = HashMap::new();
        instances.insert("CleanRoom".to_string(), vec![cleaner]);
        instances.insert(
            "MoveFurniture".to_string(),
            vec![create_test_instance("AT2_1", "MoveFurniture", "r2")],
        );

        let mut paths = HashMap::new();
        paths.insert("CleanRoom".to_string(), vec![vec![sweep]]);
        paths.insert(
            "MoveFurniture".to_string(),
            vec![vec![create_clean_action()]],
        );

        let goal_model = GoalModel::new(vec![GoalEntry {
            id: "G3".to_string(),
            context: Some(Context::condition("target.clean")),
            monitored: None,
            controlled: None,
        }]);
        let mut variables = HashMap::new();
        variables.insert(
            "target".to_string(),
            VariableValue {
                value: ObjectRef::Object("room1".to_string()),
                sort: "room".to_string(),
            },
        );
        let mappings = vec![mapping("clean", "clean")];
        let state = WorldState::new();

        let annotation = AnnotationNode::operator(
            ";",
            vec![
                AnnotationNode::task("AT1_1"),
                AnnotationNode {
                    kind: AnnotationKind::MeansEnd,
                    content: "G3".to_string(),
                    related_goal: Some("G3".to_string()),
                    children: vec![AnnotationNode::task("AT2_1")],
                    non_coop: false,
                    group: true,
                    divisible: true,
                },
            ],
        );

        let builder =
            GraphBuilder::new(&instances, &paths, &goal_model, &variables, &mappings, &state);
        let graph = builder.build(&annotation).unwrap();

        let cleaner_node = graph
            .task_nodes()
            .into_iter()
            .find(|index| graph.node(*index).kind.as_task().unwrap().id == "AT1_1")
            .unwrap();
        let decomposition = graph.decompositions_of(cleaner_node)[0];

        let goal_node = graph
            .node_indices()
            .find(|index| matches!(&graph.node(*index).kind, NodeKind::Goal(id) if id == "G3"))
            .unwrap();

        assert!(graph.has_edge(decomposition, goal_node));
    }
}
