//! # Muster Core
//!
//! Core primitives and types for mission decomposition.
//!
//! This crate provides the fundamental building blocks:
//! - [`GroundLiteral`] / [`LiftedLiteral`] - Predicate facts and schemas
//! - [`WorldState`] - The fact set decomposition evaluates against
//! - [`AbstractTask`] / [`PrimitiveTask`] - Mission task instances and actions
//! - [`Decomposition`] - One concrete way to realize an abstract task
//! - [`AnnotationNode`] / [`GoalModel`] - The runtime goal-model inputs
//! - [`MusterError`] - Decomposition error types

pub mod annotation;
pub mod decomposition;
pub mod error;
pub mod predicate;
pub mod semantics;
pub mod state;
pub mod task;

// Re-exports for convenience
pub use annotation::{
    AnnotationKind, AnnotationNode, Context, ContextKind, GoalEntry, GoalModel, GoalVariable,
    OperatorKind, VariableEnv, VariableValue,
};
pub use decomposition::Decomposition;
pub use error::{MusterError, Result};
pub use predicate::{GroundLiteral, LiftedLiteral, Literal, Term};
pub use semantics::{MappingKind, PredicateDefinition, SemanticMapping};
pub use state::WorldState;
pub use task::{
    AbstractTask, Location, ObjectRef, Parameter, PrimitiveTask, RobotCount, VariableBinding,
};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::annotation::{
        AnnotationKind, AnnotationNode, Context, ContextKind, GoalEntry, GoalModel, OperatorKind,
        VariableEnv, VariableValue,
    };
    pub use crate::decomposition::Decomposition;
    pub use crate::error::{MusterError, Result};
    pub use crate::predicate::{GroundLiteral, LiftedLiteral, Literal, Term};
    pub use crate::semantics::{MappingKind, PredicateDefinition, SemanticMapping};
    pub use crate::state::WorldState;
    pub use crate::task::{AbstractTask, ObjectRef, PrimitiveTask};
}
