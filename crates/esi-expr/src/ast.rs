//! Expression tree produced by the parser.

use serde::{Deserialize, Serialize};

/// Comparison operator between two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

/// Boolean operator joining an expression to its following sibling.
///
/// The last node of a sequence always carries `And`; the parser only
/// assigns an operator when a following sibling exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BooleanOperator {
    #[default]
    And,
    Or,
}

/// A `$(NAME)` or `$(NAME{KEY})` variable reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableReference {
    Simple { name: String },
    Dictionary { name: String, key: String },
}

impl VariableReference {
    pub fn simple(name: impl Into<String>) -> Self {
        Self::Simple { name: name.into() }
    }

    pub fn dictionary(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Dictionary {
            name: name.into(),
            key: key.into(),
        }
    }

    /// The variable name, without any key.
    pub fn name(&self) -> &str {
        match self {
            Self::Simple { name } => name,
            Self::Dictionary { name, .. } => name,
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Constant(String),
    Variable(VariableReference),
}

impl Operand {
    pub fn constant(value: impl Into<String>) -> Self {
        Self::Constant(value.into())
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self::Variable(VariableReference::simple(name))
    }

    pub fn dictionary(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Variable(VariableReference::dictionary(name, key))
    }
}

/// A single comparison, `left op right`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonExpression {
    pub left: Operand,
    pub right: Operand,
    pub operator: ComparisonOperator,
    /// Operator joining this comparison to the following sibling.
    pub next: BooleanOperator,
}

/// A parenthesized or top-level sequence of two or more expressions.
///
/// Single-item sequences collapse to the item itself and never appear
/// as a `GroupExpression`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupExpression {
    pub items: Vec<Expression>,
    /// Operator joining this group to the following sibling.
    pub next: BooleanOperator,
}

/// A boolean expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Comparison(ComparisonExpression),
    Group(GroupExpression),
}

impl Expression {
    /// A comparison joined to its following sibling with `And`.
    pub fn comparison(left: Operand, right: Operand, operator: ComparisonOperator) -> Self {
        Self::Comparison(ComparisonExpression {
            left,
            right,
            operator,
            next: BooleanOperator::And,
        })
    }

    /// A group joined to its following sibling with `And`.
    pub fn group(items: Vec<Expression>) -> Self {
        Self::Group(GroupExpression {
            items,
            next: BooleanOperator::And,
        })
    }

    /// The operator joining this node to the following sibling.
    pub fn next(&self) -> BooleanOperator {
        match self {
            Self::Comparison(c) => c.next,
            Self::Group(g) => g.next,
        }
    }

    pub(crate) fn set_next(&mut self, operator: BooleanOperator) {
        match self {
            Self::Comparison(c) => c.next = operator,
            Self::Group(g) => g.next = operator,
        }
    }
}
