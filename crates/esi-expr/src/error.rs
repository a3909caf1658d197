//! Parse error with caret diagnostics.

/// Raised when an expression does not conform to the grammar.
///
/// `position` is the zero-based character index of the first character
/// the parser could not consume. For truncated input (an unterminated
/// string constant, for example) it equals the input length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected character at position {position} in expression '{input}'")]
pub struct InvalidExpression {
    pub input: String,
    pub position: usize,
}

impl InvalidExpression {
    pub fn new(input: impl Into<String>, position: usize) -> Self {
        Self {
            input: input.into(),
            position,
        }
    }

    /// Multi-line rendering of the offending input with a caret under
    /// the unexpected character.
    pub fn diagnostic(&self) -> String {
        format!(
            "unexpected character at position {}\n{}\n{}^",
            self.position,
            self.input,
            " ".repeat(self.position)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_points_at_offset() {
        let error = InvalidExpression::new("'a' == b", 7);
        assert_eq!(
            error.diagnostic(),
            "unexpected character at position 7\n'a' == b\n       ^"
        );
    }

    #[test]
    fn test_diagnostic_at_start() {
        let error = InvalidExpression::new("", 0);
        assert_eq!(error.diagnostic(), "unexpected character at position 0\n\n^");
    }
}
