//! World state: the set of ground facts a mission is planned against.
//!
//! States are values. The search never mutates a state in place; applying
//! effects produces a new state, so divergent branches of the search can
//! never observe each other's tentative updates.

use serde::{Deserialize, Serialize};

use crate::predicate::GroundLiteral;

/// A snapshot of world knowledge as a set of ground literals.
///
/// The state is closed-world only over the literals it contains: the absence
/// of a fact is never treated as its negation. Queries therefore distinguish
/// "explicitly contradicted" from "not mentioned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldState {
    facts: Vec<GroundLiteral>,
}

impl WorldState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state from a list of ground facts.
    pub fn from_facts(facts: Vec<GroundLiteral>) -> Self {
        Self { facts }
    }

    /// The facts currently held.
    pub fn facts(&self) -> &[GroundLiteral] {
        &self.facts
    }

    /// Number of facts held.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Check if the state holds no facts.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// The fact on the same predicate and arguments, if one is present.
    pub fn matching_fact(&self, literal: &GroundLiteral) -> Option<&GroundLiteral> {
        self.facts.iter().find(|fact| fact.same_atom(literal))
    }

    /// Check whether a fact with the same atom and *opposite* polarity is
    /// present. An atom the state does not mention contradicts nothing.
    pub fn contradicts(&self, literal: &GroundLiteral) -> bool {
        self.facts.iter().any(|fact| fact.conflicts_with(literal))
    }

    /// Check whether the exact literal (same atom, same polarity) is present.
    pub fn supports(&self, literal: &GroundLiteral) -> bool {
        self.facts
            .iter()
            .any(|fact| fact.same_atom(literal) && fact.positive == literal.positive)
    }

    /// Apply one effect, returning the updated state.
    ///
    /// A fact on the same predicate and arguments has its polarity
    /// overwritten; an atom not yet mentioned is added. All other facts
    /// persist unchanged.
    pub fn apply(&self, effect: &GroundLiteral) -> WorldState {
        let mut facts = self.facts.clone();
        match facts.iter_mut().find(|fact| fact.same_atom(effect)) {
            Some(fact) => fact.positive = effect.positive,
            None => facts.push(effect.clone()),
        }
        WorldState { facts }
    }

    /// Apply a sequence of effects left-to-right, returning the final state.
    pub fn apply_all<'a, I>(&self, effects: I) -> WorldState
    where
        I: IntoIterator<Item = &'a GroundLiteral>,
    {
        let mut facts = self.facts.clone();
        for effect in effects {
            match facts.iter_mut().find(|fact| fact.same_atom(effect)) {
                Some(fact) => fact.positive = effect.positive,
                None => facts.push(effect.clone()),
            }
        }
        WorldState { facts }
    }
}

impl FromIterator<GroundLiteral> for WorldState {
    fn from_iter<I: IntoIterator<Item = GroundLiteral>>(iter: I) -> Self {
        Self {
            facts: iter.into_iter().collect(),
        }
    }
}
