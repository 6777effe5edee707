//! # Muster Planner
//!
//! Decomposition search over a built task graph: queue linearization,
//! constraint derivation, candidate enumeration, and conflict resolution.

mod conflict;
pub mod constraints;
pub mod enumerate;
pub mod queue;

pub use constraints::{derive_constraints, Constraint, ConstraintKind};
pub use enumerate::{enumerate, MissionPlan, PlanStep};
pub use queue::linearize;
