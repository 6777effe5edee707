//! Semantic resolution: translating goal-model attribute conditions into
//! world-state predicates through a declared mapping table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::{Context, ContextKind, VariableEnv};
use crate::error::{MusterError, Result};
use crate::predicate::GroundLiteral;
use crate::state::WorldState;
use crate::task::ObjectRef;

/// A predicate declared in the domain vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateDefinition {
    /// Predicate name as it appears in world-state facts.
    pub name: String,

    /// Sorts of the predicate's arguments, in order.
    pub argument_sorts: Vec<String>,
}

impl PredicateDefinition {
    /// Create a predicate definition.
    pub fn new(name: impl Into<String>, argument_sorts: Vec<String>) -> Self {
        Self {
            name: name.into(),
            argument_sorts,
        }
    }

    /// Number of arguments the predicate takes.
    pub fn arity(&self) -> usize {
        self.argument_sorts.len()
    }
}

/// What an ontology entry maps onto the world-state vocabulary.
///
/// Context evaluation only consults attribute mappings; relationship
/// mappings are carried for collaborators that reason over object links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    /// A single-object attribute, testable in context guards.
    Attribute,
    /// A relation between objects.
    Relationship,
}

/// One entry of the semantic mapping table: an ontology name and the
/// predicate that expresses it in the world state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticMapping {
    /// What the entry maps.
    pub kind: MappingKind,

    /// Ontology name, as written in context expressions.
    pub name: String,

    /// Predicate the entry denotes.
    pub predicate: PredicateDefinition,
}

impl SemanticMapping {
    /// Create an attribute mapping.
    pub fn attribute(name: impl Into<String>, predicate: PredicateDefinition) -> Self {
        Self {
            kind: MappingKind::Attribute,
            name: name.into(),
            predicate,
        }
    }

    /// Create a relationship mapping.
    pub fn relationship(name: impl Into<String>, predicate: PredicateDefinition) -> Self {
        Self {
            kind: MappingKind::Relationship,
            name: name.into(),
            predicate,
        }
    }
}

/// A `variable.attribute` condition parsed from a context expression.
///
/// A leading `!` or `not ` negates the expected polarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCondition {
    /// Goal-model variable the condition constrains.
    pub variable: String,

    /// Attribute being tested.
    pub attribute: String,

    /// Expected polarity of the resolved fact.
    pub positive: bool,
}

impl AttributeCondition {
    /// Parse a context expression of the form `var.attr`, `!var.attr` or
    /// `not var.attr`.
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let (positive, body) = if let Some(rest) = trimmed.strip_prefix('!') {
            (false, rest.trim_start())
        } else if let Some(rest) = trimmed.strip_prefix("not ") {
            (false, rest.trim_start())
        } else {
            (true, trimmed)
        };

        let malformed = || MusterError::MalformedCondition {
            expression: expression.to_string(),
        };

        let (variable, attribute) = body.split_once('.').ok_or_else(malformed)?;
        if variable.is_empty() || attribute.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            variable: variable.to_string(),
            attribute: attribute.to_string(),
            positive,
        })
    }
}

/// Resolve an attribute name through the mapping table.
pub fn resolve_attribute<'a>(
    mappings: &'a [SemanticMapping],
    attribute: &str,
) -> Result<&'a PredicateDefinition> {
    mappings
        .iter()
        .find(|mapping| mapping.kind == MappingKind::Attribute && mapping.name == attribute)
        .map(|mapping| &mapping.predicate)
        .ok_or_else(|| MusterError::MissingSemanticMapping {
            attribute: attribute.to_string(),
        })
}

/// Ground the fact a parsed condition denotes, substituting the condition's
/// variable from the environment.
///
/// The variable must be bound to a single object; collections cannot appear
/// in a context guard.
pub fn condition_literal(
    condition: &AttributeCondition,
    mappings: &[SemanticMapping],
    env: &VariableEnv,
) -> Result<GroundLiteral> {
    let definition = resolve_attribute(mappings, &condition.attribute)?;
    let object = env
        .get(&condition.variable)
        .and_then(ObjectRef::as_object)
        .ok_or_else(|| MusterError::UnboundVariable {
            variable: condition.variable.clone(),
        })?;

    Ok(GroundLiteral::new(
        definition.name.clone(),
        vec![object.to_string()],
        condition.positive,
    ))
}

/// Evaluate a goal-model guard against the current world state.
///
/// Triggers describe runtime events and are always considered active at
/// build time. Conditions resolve to a ground fact and hold exactly when
/// the state carries that fact with the expected polarity.
pub fn evaluate_context(
    context: &Context,
    mappings: &[SemanticMapping],
    env: &VariableEnv,
    state: &WorldState,
) -> Result<bool> {
    match context.kind {
        ContextKind::Trigger => Ok(true),
        ContextKind::Condition => {
            let condition = AttributeCondition::parse(&context.expression)?;
            let literal = condition_literal(&condition, mappings, env)?;
            let active = state.supports(&literal);
            debug!(
                "Context guard '{}' maps to {} and evaluates to {}",
                context.expression, literal, active
            );
            Ok(active)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_mappings() -> Vec<SemanticMapping> {
        vec![
            SemanticMapping::attribute(
                "clean",
                PredicateDefinition::new("clean", vec!["room".to_string()]),
            ),
            SemanticMapping::attribute(
                "ready",
                PredicateDefinition::new("robot_ready", vec!["robot".to_string()]),
            ),
            SemanticMapping::relationship(
                "inside",
                PredicateDefinition::new(
                    "inside",
                    vec!["object".to_string(), "room".to_string()],
                ),
            ),
        ]
    }

    #[test]
    fn test_parse_positive_condition() {
        let condition = AttributeCondition::parse("current_room.clean").unwrap();

        assert_eq!(condition.variable, "current_room");
        assert_eq!(condition.attribute, "clean");
        assert!(condition.positive);
    }

    #[test]
    fn test_parse_negated_condition() {
        let bang = AttributeCondition::parse("!current_room.clean").unwrap();
        let word = AttributeCondition::parse("not current_room.clean").unwrap();

        assert!(!bang.positive);
        assert!(!word.positive);
        assert_eq!(bang.variable, word.variable);
    }

    #[test]
    fn test_parse_rejects_missing_attribute() {
        let err = AttributeCondition::parse("current_room").unwrap_err();
        assert!(matches!(err, MusterError::MalformedCondition { .. }));

        let err = AttributeCondition::parse("!.clean").unwrap_err();
        assert!(matches!(err, MusterError::MalformedCondition { .. }));
    }

    #[test]
    fn test_resolve_unknown_attribute_fails() {
        let mappings = create_test_mappings();
        let err = resolve_attribute(&mappings, "painted").unwrap_err();

        assert!(matches!(
            err,
            MusterError::MissingSemanticMapping { attribute } if attribute == "painted"
        ));
    }

    #[test]
    fn test_relationship_entries_are_not_consulted() {
        let mappings = create_test_mappings();
        let err = resolve_attribute(&mappings, "inside").unwrap_err();

        assert!(matches!(err, MusterError::MissingSemanticMapping { .. }));
    }

    #[test]
    fn test_condition_literal_grounds_variable() {
        let mappings = create_test_mappings();
        let mut env = VariableEnv::new();
        env.insert(
            "current_room".to_string(),
            ObjectRef::Object("room1".to_string()),
        );

        let condition = AttributeCondition::parse("!current_room.clean").unwrap();
        let literal = condition_literal(&condition, &mappings, &env).unwrap();

        assert_eq!(literal.predicate, "clean");
        assert_eq!(literal.args, vec!["room1".to_string()]);
        assert!(!literal.positive);
    }

    #[test]
    fn test_condition_literal_requires_single_object() {
        let mappings = create_test_mappings();
        let mut env = VariableEnv::new();
        env.insert(
            "rooms".to_string(),
            ObjectRef::Collection(vec!["room1".to_string(), "room2".to_string()]),
        );

        let condition = AttributeCondition::parse("rooms.clean").unwrap();
        let err = condition_literal(&condition, &mappings, &env).unwrap_err();

        assert!(matches!(err, MusterError::UnboundVariable { variable } if variable == "rooms"));
    }

    #[test]
    fn test_evaluate_condition_against_state() {
        let mappings = create_test_mappings();
        let mut env = VariableEnv::new();
        env.insert(
            "current_room".to_string(),
            ObjectRef::Object("room1".to_string()),
        );

        let state = WorldState::from_facts(vec![GroundLiteral::new(
            "clean",
            vec!["room1".to_string()],
            false,
        )]);

        let negated = Context::condition("!current_room.clean");
        assert!(evaluate_context(&negated, &mappings, &env, &state).unwrap());

        let positive = Context::condition("current_room.clean");
        assert!(!evaluate_context(&positive, &mappings, &env, &state).unwrap());
    }

    #[test]
    fn test_triggers_are_always_active() {
        let mappings = create_test_mappings();
        let env = VariableEnv::new();
        let state = WorldState::new();

        let trigger = Context::trigger("battery_low");
        assert!(evaluate_context(&trigger, &mappings, &env, &state).unwrap());
    }
}
