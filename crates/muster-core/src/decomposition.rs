//! Decompositions: concrete realizations of abstract tasks.

use serde::{Deserialize, Serialize};

use crate::predicate::{GroundLiteral, Literal};
use crate::state::WorldState;
use crate::task::{AbstractTask, PrimitiveTask};

/// One concrete path realizing an [`AbstractTask`].
///
/// Built once per surviving candidate path at graph-build time and never
/// mutated afterward. The aggregate precondition and effect sets are derived
/// on construction; see [`Decomposition::derive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    /// Identity, unique across the mission (`<task instance id>|<path number>`).
    pub id: String,

    /// The abstract task this decomposition realizes.
    pub task: AbstractTask,

    /// The ordered primitive tasks of the path.
    pub path: Vec<PrimitiveTask>,

    /// Aggregate preconditions: the first action's preconditions, grounded
    /// where the owning task's bindings allow.
    pub preconditions: Vec<Literal>,

    /// Aggregate effects: every action's effects folded left-to-right, later
    /// effects overwriting earlier ones on the same atom.
    pub effects: Vec<Literal>,
}

impl Decomposition {
    /// Build a decomposition from a path, deriving its aggregate literal
    /// sets through the owning task's variable bindings.
    ///
    /// Arguments bound to a single object become constants; arguments left
    /// unbound (or bound to a collection) stay free, and the literal stays
    /// variable-bearing.
    pub fn derive(id: impl Into<String>, task: AbstractTask, path: Vec<PrimitiveTask>) -> Self {
        let preconditions = match path.first() {
            Some(first) => first
                .preconditions
                .iter()
                .map(|prec| prec.ground(|var| task.bound_object(var).map(String::from)))
                .collect(),
            None => Vec::new(),
        };

        let mut effects: Vec<Literal> = Vec::new();
        for action in &path {
            for effect in &action.effects {
                let effect = effect.ground(|var| task.bound_object(var).map(String::from));
                match effects.iter_mut().find(|known| known.same_atom(&effect)) {
                    Some(known) => known.set_positive(effect.positive()),
                    None => effects.push(effect),
                }
            }
        }

        Self {
            id: id.into(),
            task,
            path,
            preconditions,
            effects,
        }
    }

    /// Iterate over the ground preconditions. Variable-bearing ones are not
    /// checked by the search.
    pub fn ground_preconditions(&self) -> impl Iterator<Item = &GroundLiteral> {
        self.preconditions.iter().filter_map(Literal::as_ground)
    }

    /// Iterate over the ground effects.
    pub fn ground_effects(&self) -> impl Iterator<Item = &GroundLiteral> {
        self.effects.iter().filter_map(Literal::as_ground)
    }

    /// Check that no ground precondition is contradicted by the state.
    pub fn preconditions_hold(&self, state: &WorldState) -> bool {
        self.ground_preconditions()
            .all(|prec| !state.contradicts(prec))
    }

    /// Sort of a free variable, resolved against the parameters of the
    /// path's actions (first declaration wins).
    pub fn variable_sort(&self, variable: &str) -> Option<&str> {
        self.path
            .iter()
            .find_map(|action| action.parameter_sort(variable))
    }
}
