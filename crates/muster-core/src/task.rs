//! Mission work at both abstraction levels: primitive actions a robot can
//! execute, and abstract tasks instantiated from the goal model.

use serde::{Deserialize, Serialize};

use crate::predicate::LiftedLiteral;

/// A typed parameter of a primitive task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Task-local variable name (e.g. `?r`).
    pub name: String,

    /// Domain sort of the parameter (e.g. `robot`, `location`).
    pub sort: String,
}

impl Parameter {
    /// Create a new parameter.
    pub fn new(name: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: sort.into(),
        }
    }

    /// Check if the parameter ranges over an exclusively-held robot
    /// resource.
    pub fn is_robot_sort(&self) -> bool {
        matches!(self.sort.as_str(), "robot" | "robotteam")
    }
}

/// An executable action: the unit a decomposition path is made of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveTask {
    /// Action name.
    pub name: String,

    /// Typed parameters the pre/effect literals range over.
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Capabilities a robot must have to execute this action.
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Preconditions over the parameters.
    #[serde(default)]
    pub preconditions: Vec<LiftedLiteral>,

    /// Effects over the parameters.
    #[serde(default)]
    pub effects: Vec<LiftedLiteral>,
}

impl PrimitiveTask {
    /// Create a new primitive task with no parameters or literals.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            capabilities: Vec::new(),
            preconditions: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Sort of a parameter, if the task declares it.
    pub fn parameter_sort(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| parameter.sort.as_str())
    }
}

/// How many robots an abstract task requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotCount {
    /// Exactly this many robots.
    Fixed(u32),
    /// Any count inside the inclusive range.
    Range {
        /// Minimum robots required.
        min: u32,
        /// Maximum robots usable.
        max: u32,
    },
}

impl RobotCount {
    /// Fewest robots that satisfy the requirement.
    pub fn min(&self) -> u32 {
        match *self {
            RobotCount::Fixed(count) => count,
            RobotCount::Range { min, .. } => min,
        }
    }

    /// Most robots the requirement admits.
    pub fn max(&self) -> u32 {
        match *self {
            RobotCount::Fixed(count) => count,
            RobotCount::Range { max, .. } => max,
        }
    }
}

/// Where an abstract task takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// A single named location.
    Single(String),
    /// Any one of the named locations.
    AnyOf(Vec<String>),
}

/// One or many concrete domain objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectRef {
    /// A single object.
    Object(String),
    /// An ordered collection of objects.
    Collection(Vec<String>),
}

impl ObjectRef {
    /// The single object, if this reference names exactly one.
    pub fn as_object(&self) -> Option<&str> {
        match self {
            ObjectRef::Object(name) => Some(name),
            ObjectRef::Collection(_) => None,
        }
    }

    /// The collection, if this reference names one.
    pub fn as_collection(&self) -> Option<&[String]> {
        match self {
            ObjectRef::Collection(items) => Some(items),
            ObjectRef::Object(_) => None,
        }
    }
}

/// Binds a task-local variable to goal-model objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBinding {
    /// Task-local variable being bound (e.g. `?r`).
    pub variable: String,

    /// Value the variable is bound to.
    pub value: ObjectRef,
}

impl VariableBinding {
    /// Bind a variable to a single object.
    pub fn object(variable: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: ObjectRef::Object(object.into()),
        }
    }
}

/// An unresolved unit of mission work, instantiated from the goal model.
///
/// Immutable once instantiated: the graph builder reads it, never rewrites
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractTask {
    /// Instance identity (e.g. `AT1_2`: definition `AT1`, instance `2`).
    pub id: String,

    /// Task name shared by all instances of the same definition.
    pub name: String,

    /// Robots the task requires.
    pub robots: RobotCount,

    /// Location the task takes place at.
    pub location: Location,

    /// Bindings from task-local variables to goal-model objects.
    #[serde(default)]
    pub bindings: Vec<VariableBinding>,

    /// Events whose occurrence activates the task.
    #[serde(default)]
    pub triggers: Vec<String>,
}

impl AbstractTask {
    /// Resolve a task-local variable to its single bound object.
    ///
    /// Returns `None` when the variable is unbound or bound to a
    /// collection: a collection cannot ground a single argument position.
    pub fn bound_object(&self, variable: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|binding| binding.variable == variable)
            .and_then(|binding| binding.value.as_object())
    }

    /// Definition prefix of the instance id (`AT1` of `AT1_2`).
    pub fn id_prefix(&self) -> &str {
        match self.id.split_once('_') {
            Some((prefix, _)) => prefix,
            None => &self.id,
        }
    }
}
