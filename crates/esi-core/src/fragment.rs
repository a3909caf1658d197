//! The parsed content tree.

use std::fmt;

use esi_expr::Expression;
use serde::{Deserialize, Serialize};

/// A node in the parsed content tree. Fragments are immutable once
/// built: the markup parser is the sole producer, the executor the
/// sole consumer, and all per-request state lives in the execution
/// context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fragment {
    /// Literal output.
    Text(String),
    /// Produces nothing.
    Ignore,
    /// Ordered concatenation of children.
    Composite(Vec<Fragment>),
    /// Reference to a remote sub-fragment, possibly relative to the
    /// current request.
    Include { src: String },
    /// Fallback pair: `except` renders when `attempt` fails.
    Try {
        attempt: Box<Fragment>,
        except: Box<Fragment>,
    },
    /// The first branch whose test holds renders; otherwise the
    /// `otherwise` fragment does.
    Choose {
        whens: Vec<When>,
        otherwise: Box<Fragment>,
    },
    /// Raw text with `$(...)` placeholders substituted at execution
    /// time.
    Vars(String),
}

/// One `when` branch of a choose fragment. The test expression is
/// parsed at parse time, not execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct When {
    pub test: Expression,
    pub body: Fragment,
}

impl When {
    pub fn new(test: Expression, body: Fragment) -> Self {
        Self { test, body }
    }
}

/// Discriminant of a [`Fragment`], used as the dispatch and registry
/// key for executors and interceptor pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentKind {
    Text,
    Ignore,
    Composite,
    Include,
    Try,
    Choose,
    Vars,
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Ignore => write!(f, "ignore"),
            Self::Composite => write!(f, "composite"),
            Self::Include => write!(f, "include"),
            Self::Try => write!(f, "try"),
            Self::Choose => write!(f, "choose"),
            Self::Vars => write!(f, "vars"),
        }
    }
}

impl Fragment {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    pub fn include(src: impl Into<String>) -> Self {
        Self::Include { src: src.into() }
    }

    pub fn vars(body: impl Into<String>) -> Self {
        Self::Vars(body.into())
    }

    pub fn try_except(attempt: Fragment, except: Fragment) -> Self {
        Self::Try {
            attempt: Box::new(attempt),
            except: Box::new(except),
        }
    }

    pub fn choose(whens: Vec<When>, otherwise: Fragment) -> Self {
        Self::Choose {
            whens,
            otherwise: Box::new(otherwise),
        }
    }

    /// Normalize a parsed child list: ignorable children are dropped,
    /// an empty list is `Ignore`, a single child is the child itself,
    /// and only two or more children form a `Composite`.
    pub fn from_children(children: Vec<Fragment>) -> Self {
        let mut children: Vec<Fragment> = children
            .into_iter()
            .filter(|child| !matches!(child, Self::Ignore))
            .collect();
        match children.len() {
            0 => Self::Ignore,
            1 => children.remove(0),
            _ => Self::Composite(children),
        }
    }

    pub fn kind(&self) -> FragmentKind {
        match self {
            Self::Text(_) => FragmentKind::Text,
            Self::Ignore => FragmentKind::Ignore,
            Self::Composite(_) => FragmentKind::Composite,
            Self::Include { .. } => FragmentKind::Include,
            Self::Try { .. } => FragmentKind::Try,
            Self::Choose { .. } => FragmentKind::Choose,
            Self::Vars(_) => FragmentKind::Vars,
        }
    }
}
