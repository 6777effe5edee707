//! Predicate literals over the mission domain.
//!
//! Literals come in two forms: [`GroundLiteral`], whose arguments are all
//! concrete domain objects, and [`LiftedLiteral`], whose arguments may still
//! contain free variables scoped to the task that owns them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One argument position of a lifted literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// A concrete domain object.
    Constant(String),
    /// A free variable scoped to the owning task.
    Variable(String),
}

impl Term {
    /// Create a constant term.
    pub fn constant(name: impl Into<String>) -> Self {
        Term::Constant(name.into())
    }

    /// Create a variable term.
    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    /// The token carried by this term.
    pub fn name(&self) -> &str {
        match self {
            Term::Constant(name) | Term::Variable(name) => name,
        }
    }

    /// Check if the term is a free variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fully instantiated predicate literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundLiteral {
    /// Predicate name.
    pub predicate: String,

    /// Ordered concrete arguments.
    pub args: Vec<String>,

    /// Polarity: `true` asserts the predicate, `false` denies it.
    pub positive: bool,
}

impl GroundLiteral {
    /// Create a new ground literal.
    pub fn new(predicate: impl Into<String>, args: Vec<String>, positive: bool) -> Self {
        Self {
            predicate: predicate.into(),
            args,
            positive,
        }
    }

    /// Check whether both literals name the same predicate over the same
    /// arguments, regardless of polarity.
    pub fn same_atom(&self, other: &GroundLiteral) -> bool {
        self.predicate == other.predicate && self.args == other.args
    }

    /// Check whether the two literals are in direct conflict: same atom,
    /// opposite polarity.
    pub fn conflicts_with(&self, other: &GroundLiteral) -> bool {
        self.same_atom(other) && self.positive != other.positive
    }

    /// The same atom with flipped polarity.
    pub fn negated(&self) -> GroundLiteral {
        GroundLiteral {
            predicate: self.predicate.clone(),
            args: self.args.clone(),
            positive: !self.positive,
        }
    }
}

impl fmt::Display for GroundLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.positive {
            write!(f, "!")?;
        }
        write!(f, "{}({})", self.predicate, self.args.join(", "))
    }
}

/// A predicate literal whose arguments may still contain free variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftedLiteral {
    /// Predicate name.
    pub predicate: String,

    /// Ordered arguments: constants or task-scoped free variables.
    pub args: Vec<Term>,

    /// Polarity: `true` asserts the predicate, `false` denies it.
    pub positive: bool,
}

impl LiftedLiteral {
    /// Create a new lifted literal.
    pub fn new(predicate: impl Into<String>, args: Vec<Term>, positive: bool) -> Self {
        Self {
            predicate: predicate.into(),
            args,
            positive,
        }
    }

    /// Check if every argument is a constant.
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(|arg| !arg.is_variable())
    }

    /// Iterate over the free variables of this literal.
    pub fn free_variables(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| match arg {
            Term::Variable(name) => Some(name.as_str()),
            Term::Constant(_) => None,
        })
    }

    /// Check whether both literals name the same predicate over the same
    /// argument tokens, regardless of polarity.
    pub fn same_atom(&self, other: &LiftedLiteral) -> bool {
        self.predicate == other.predicate && self.args == other.args
    }

    /// Ground this literal through a variable resolver.
    ///
    /// Every variable the resolver can bind is replaced by its object;
    /// constants pass through. The result is a [`Literal::Ground`] when no
    /// free variable remains, and a [`Literal::Lifted`] otherwise.
    pub fn ground<F>(&self, resolve: F) -> Literal
    where
        F: Fn(&str) -> Option<String>,
    {
        let grounded: Vec<Term> = self
            .args
            .iter()
            .map(|arg| match arg {
                Term::Constant(name) => Term::Constant(name.clone()),
                Term::Variable(name) => match resolve(name) {
                    Some(object) => Term::Constant(object),
                    None => Term::Variable(name.clone()),
                },
            })
            .collect();

        if grounded.iter().any(|arg| arg.is_variable()) {
            Literal::Lifted(LiftedLiteral {
                predicate: self.predicate.clone(),
                args: grounded,
                positive: self.positive,
            })
        } else {
            Literal::Ground(GroundLiteral {
                predicate: self.predicate.clone(),
                args: grounded.into_iter().map(|arg| arg.name().to_string()).collect(),
                positive: self.positive,
            })
        }
    }
}

impl fmt::Display for LiftedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.positive {
            write!(f, "!")?;
        }
        let args: Vec<String> = self.args.iter().map(|arg| arg.to_string()).collect();
        write!(f, "{}({})", self.predicate, args.join(", "))
    }
}

/// Either literal form, as carried in derived precondition and effect sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    /// A fully instantiated literal.
    Ground(GroundLiteral),
    /// A literal still carrying free variables.
    Lifted(LiftedLiteral),
}

impl Literal {
    /// Predicate name of either form.
    pub fn predicate(&self) -> &str {
        match self {
            Literal::Ground(lit) => &lit.predicate,
            Literal::Lifted(lit) => &lit.predicate,
        }
    }

    /// Polarity of either form.
    pub fn positive(&self) -> bool {
        match self {
            Literal::Ground(lit) => lit.positive,
            Literal::Lifted(lit) => lit.positive,
        }
    }

    /// The ground literal, if this is one.
    pub fn as_ground(&self) -> Option<&GroundLiteral> {
        match self {
            Literal::Ground(lit) => Some(lit),
            Literal::Lifted(_) => None,
        }
    }

    /// The lifted literal, if this is one.
    pub fn as_lifted(&self) -> Option<&LiftedLiteral> {
        match self {
            Literal::Lifted(lit) => Some(lit),
            Literal::Ground(_) => None,
        }
    }

    /// Check whether both literals are the same form, name the same
    /// predicate and apply it to the same argument tokens. Mixed forms
    /// never match.
    pub fn same_atom(&self, other: &Literal) -> bool {
        match (self, other) {
            (Literal::Ground(a), Literal::Ground(b)) => a.same_atom(b),
            (Literal::Lifted(a), Literal::Lifted(b)) => a.same_atom(b),
            _ => false,
        }
    }

    /// Overwrite the polarity of either form.
    pub fn set_positive(&mut self, positive: bool) {
        match self {
            Literal::Ground(lit) => lit.positive = positive,
            Literal::Lifted(lit) => lit.positive = positive,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Ground(lit) => lit.fmt(f),
            Literal::Lifted(lit) => lit.fmt(f),
        }
    }
}

impl From<GroundLiteral> for Literal {
    fn from(literal: GroundLiteral) -> Self {
        Literal::Ground(literal)
    }
}

impl From<LiftedLiteral> for Literal {
    fn from(literal: LiftedLiteral) -> Self {
        Literal::Lifted(literal)
    }
}
