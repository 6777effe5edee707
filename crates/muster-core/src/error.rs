//! Error types for mission decomposition.

use thiserror::Error;

/// Main error type for decomposition operations.
///
/// Every failure is fatal to the run: the engine never silently drops a
/// goal, task or decomposition it cannot handle.
#[derive(Error, Debug, Clone)]
pub enum MusterError {
    /// A context condition can never be satisfied where its node sits.
    #[error("Context condition never satisfiable for node {node}: {condition}")]
    UnreachableContext { node: String, condition: String },

    /// Every decomposition path of a task failed its precondition check.
    #[error("No valid decomposition for task {task_id} ({task_name})")]
    NoValidDecomposition { task_id: String, task_name: String },

    /// Conflict resolution eliminated every decomposition of a task.
    #[error("Conflicts eliminated every decomposition of task {task_id} ({task_name})")]
    UnsolvableConflict { task_id: String, task_name: String },

    /// An annotation node references a task instance that was never declared.
    #[error("Unknown task instance: {id}")]
    MissingTaskInstance { id: String },

    /// An attribute condition has no entry in the semantic mapping table.
    #[error("No semantic mapping for attribute: {attribute}")]
    MissingSemanticMapping { attribute: String },

    /// A context variable is unbound, or bound to a collection.
    #[error("Variable not bound to a single object: {variable}")]
    UnboundVariable { variable: String },

    /// A context expression does not have the `variable.attribute` shape.
    #[error("Malformed context expression: {expression}")]
    MalformedCondition { expression: String },

    /// An annotation operator is neither `#` nor `;`.
    #[error("Unknown mission operator: {symbol}")]
    InvalidOperator { symbol: String },
}

impl MusterError {
    /// Returns true if the mission itself is infeasible as modeled, rather
    /// than the input being malformed.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            MusterError::UnreachableContext { .. }
                | MusterError::NoValidDecomposition { .. }
                | MusterError::UnsolvableConflict { .. }
        )
    }

    /// Returns the offending task id if the error names one.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            MusterError::NoValidDecomposition { task_id, .. } => Some(task_id),
            MusterError::UnsolvableConflict { task_id, .. } => Some(task_id),
            MusterError::MissingTaskInstance { id } => Some(id),
            _ => None,
        }
    }
}

/// Convenience Result type for decomposition operations.
pub type Result<T> = std::result::Result<T, MusterError>;
