//! Goal-model inputs: the runtime annotation tree describing how mission
//! work is composed, and the per-goal metadata the graph builder consults.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MusterError, Result};
use crate::task::ObjectRef;

fn default_true() -> bool {
    true
}

/// Kind of a node in the runtime annotation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Composes its children with a mission operator.
    Operator,
    /// A goal refined by its children.
    Goal,
    /// A goal achieved directly by a single task.
    MeansEnd,
    /// A reference to an abstract task instance.
    Task,
}

/// A node of the runtime annotation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationNode {
    /// What this node is.
    pub kind: AnnotationKind,

    /// Operator symbol (`#` or `;`), or the goal/task instance id.
    pub content: String,

    /// Goal-model entry this node evaluates under, when it has one.
    ///
    /// An operator without a related goal is a forAll expansion: its
    /// children were generated one per element of a monitored collection.
    #[serde(default)]
    pub related_goal: Option<String>,

    /// Child nodes in document order.
    #[serde(default)]
    pub children: Vec<AnnotationNode>,

    /// Opens a non-cooperative resource scope over the tasks below.
    #[serde(default)]
    pub non_coop: bool,

    /// The scope is shared by the whole group of robots.
    #[serde(default = "default_true")]
    pub group: bool,

    /// The scope admits divisible participation.
    #[serde(default = "default_true")]
    pub divisible: bool,
}

impl AnnotationNode {
    /// Create an operator node over the given children.
    pub fn operator(symbol: impl Into<String>, children: Vec<AnnotationNode>) -> Self {
        Self {
            kind: AnnotationKind::Operator,
            content: symbol.into(),
            related_goal: None,
            children,
            non_coop: false,
            group: true,
            divisible: true,
        }
    }

    /// Create a goal node.
    pub fn goal(id: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Goal,
            content: id.into(),
            related_goal: None,
            children: Vec::new(),
            non_coop: false,
            group: true,
            divisible: true,
        }
    }

    /// Create a task reference node.
    pub fn task(id: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Task,
            content: id.into(),
            related_goal: None,
            children: Vec::new(),
            non_coop: false,
            group: true,
            divisible: true,
        }
    }

    /// Attach the goal-model entry this node evaluates under.
    pub fn with_related_goal(mut self, goal: impl Into<String>) -> Self {
        self.related_goal = Some(goal.into());
        self
    }

    /// Mark this node as opening a non-cooperative scope.
    pub fn non_cooperative(mut self, group: bool, divisible: bool) -> Self {
        self.non_coop = true;
        self.group = group;
        self.divisible = divisible;
        self
    }

    /// Parse the operator symbol carried by this node.
    pub fn operator_kind(&self) -> Result<OperatorKind> {
        OperatorKind::from_symbol(&self.content)
    }
}

/// The two mission composition operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// `#`: children execute concurrently against the same state.
    Parallel,
    /// `;`: children execute in order, threading state left to right.
    Sequential,
}

impl OperatorKind {
    /// Parse an operator from its annotation symbol.
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        match symbol {
            "#" => Ok(OperatorKind::Parallel),
            ";" => Ok(OperatorKind::Sequential),
            other => Err(MusterError::InvalidOperator {
                symbol: other.to_string(),
            }),
        }
    }

    /// The annotation symbol for this operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            OperatorKind::Parallel => "#",
            OperatorKind::Sequential => ";",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Guard kinds a goal-model entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Evaluated against the world state at build time.
    Condition,
    /// Activated by an event at runtime; always considered active here.
    Trigger,
}

/// A guard condition gating activation of a goal-model branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// How the guard activates.
    pub kind: ContextKind,

    /// Condition expression, e.g. `robot.ready` or `!room.clean`.
    pub expression: String,
}

impl Context {
    /// Create a condition guard.
    pub fn condition(expression: impl Into<String>) -> Self {
        Self {
            kind: ContextKind::Condition,
            expression: expression.into(),
        }
    }

    /// Create a trigger guard.
    pub fn trigger(expression: impl Into<String>) -> Self {
        Self {
            kind: ContextKind::Trigger,
            expression: expression.into(),
        }
    }
}

/// A typed goal-model variable declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalVariable {
    /// Variable name.
    pub name: String,

    /// Domain sort of the variable.
    pub sort: String,
}

/// Per-goal metadata the graph builder consults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalEntry {
    /// Goal id, referenced by annotation nodes.
    pub id: String,

    /// Guard gating this goal's branch, if any.
    #[serde(default)]
    pub context: Option<Context>,

    /// Collection variable a forAll goal iterates over.
    #[serde(default)]
    pub monitored: Option<GoalVariable>,

    /// Variable bound to each element of the monitored collection in turn.
    #[serde(default)]
    pub controlled: Option<GoalVariable>,
}

impl GoalEntry {
    /// Create an entry with no guard or iteration variables.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context: None,
            monitored: None,
            controlled: None,
        }
    }
}

/// The goal-model entries of a mission, looked up by goal id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalModel {
    entries: Vec<GoalEntry>,
}

impl GoalModel {
    /// Create a goal model from its entries.
    pub fn new(entries: Vec<GoalEntry>) -> Self {
        Self { entries }
    }

    /// Look up an entry by goal id.
    pub fn entry(&self, id: &str) -> Option<&GoalEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// All entries, in declaration order.
    pub fn entries(&self) -> &[GoalEntry] {
        &self.entries
    }
}

/// Value bound to a goal-model variable before the build starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValue {
    /// The bound object or collection.
    pub value: ObjectRef,

    /// Domain sort of the variable.
    pub sort: String,
}

/// Variable environment threaded through the graph build: variables already
/// instantiated, by name.
pub type VariableEnv = HashMap<String, ObjectRef>;
