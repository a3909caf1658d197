//! Markup parse errors. Any of these aborts the parse of the whole
//! body; there is no partial rendering.

use esi_expr::InvalidExpression;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    #[error(transparent)]
    Expression(#[from] InvalidExpression),

    #[error("<esi:{tag}> requires the '{attribute}' attribute")]
    MissingAttribute {
        tag: &'static str,
        attribute: &'static str,
    },

    #[error("<esi:{parent}> requires an <esi:{child}> child")]
    MissingChild {
        parent: &'static str,
        child: &'static str,
    },
}
