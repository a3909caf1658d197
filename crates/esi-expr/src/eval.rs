//! Expression evaluation against per-request variables.

use crate::ast::{BooleanOperator, ComparisonOperator, Expression, Operand, VariableReference};
use crate::variables::{resolve_variable, VariableMap};

/// Evaluate a parsed expression. Evaluation is pure: comparisons have
/// no side effects, so no short-circuiting is observable.
pub fn evaluate(expression: &Expression, variables: &VariableMap) -> bool {
    match expression {
        Expression::Comparison(comparison) => {
            let left = resolve_operand(&comparison.left, variables);
            let right = resolve_operand(&comparison.right, variables);
            compare(&left, &right, comparison.operator)
        }
        Expression::Group(group) => evaluate_sequence(&group.items, variables),
    }
}

/// Fold a sequence left to right, AND binding tighter than OR: each
/// maximal run of AND-joined items forms one OR-term. Relies on the
/// parser invariant that the last item carries `And`.
fn evaluate_sequence(items: &[Expression], variables: &VariableMap) -> bool {
    let mut any_term = false;
    let mut term = true;
    for item in items {
        term = evaluate(item, variables) && term;
        if item.next() == BooleanOperator::Or {
            any_term = any_term || term;
            term = true;
        }
    }
    any_term || term
}

fn resolve_operand(operand: &Operand, variables: &VariableMap) -> String {
    match operand {
        Operand::Constant(value) => value.clone(),
        Operand::Variable(VariableReference::Simple { name }) => {
            resolve_variable(variables, name, None)
        }
        Operand::Variable(VariableReference::Dictionary { name, key }) => {
            resolve_variable(variables, name, Some(key))
        }
    }
}

/// Ordering operators compare lexicographically by Unicode scalar
/// value (ordinal comparison).
fn compare(left: &str, right: &str, operator: ComparisonOperator) -> bool {
    match operator {
        ComparisonOperator::Equal => left == right,
        ComparisonOperator::NotEqual => left != right,
        ComparisonOperator::GreaterThan => left > right,
        ComparisonOperator::GreaterThanOrEqual => left >= right,
        ComparisonOperator::LessThan => left < right,
        ComparisonOperator::LessThanOrEqual => left <= right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::variables::VariableResolver;
    use std::collections::HashMap;

    fn request_variables() -> VariableMap {
        VariableMap::from([
            (
                String::from("HTTP_HOST"),
                VariableResolver::simple("example.com"),
            ),
            (
                String::from("HTTP_COOKIE"),
                VariableResolver::dictionary(HashMap::from([(
                    String::from("showPricesWithVat"),
                    String::from("true"),
                )])),
            ),
        ])
    }

    #[test]
    fn test_parse_and_evaluate() {
        let cases = [
            ("$(HTTP_HOST)=='example.com'", true),
            ("$(HTTP_HOST)=='foo.com'", false),
            ("$(HTTP_HOST)!='example.com'", false),
            ("$(HTTP_HOST)!='foo.com'", true),
            ("'a'=='b' && 'c'=='c'", false),
            ("'a'=='b' || 'c'=='c'", true),
            ("'a'=='a' && '1'=='2' && 'c'=='c'", false),
            ("'a'=='a' || '1'=='2' && 'c'=='c'", true),
            ("'a'=='a' && '1'=='2' || 'c'=='c'", true),
            ("'a'=='a' && '1'=='1' && 'b'=='c'", false),
            ("'a'=='a' || '1'=='1' && 'b'=='c'", true),
            ("'a'=='a' && '1'=='1' || 'b'=='c'", true),
            ("'a'=='b' && '1'=='2' || 'c'=='c'", true),
            ("'a'=='b' && ('1'=='2' || 'c'=='c')", false),
            ("('a'=='b')", false),
            ("('a'=='a')", true),
            ("(('a'=='a'))", true),
            ("('a'=='b' || 'a'=='a') && ('b'=='b' || 'b'=='a')", true),
            ("('a'=='b' || 'a'=='a') && ('b'=='c' || 'b'=='a')", false),
            ("$(HTTP_COOKIE{showPricesWithVat})=='true'", true),
            ("$(HTTP_COOKIE{showPricesWithVat})=='false'", false),
        ];
        let variables = request_variables();
        for (input, expected) in cases {
            let expression = parse(input).unwrap();
            assert_eq!(evaluate(&expression, &variables), expected, "input: {input}");
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // true || (true && false) is true; (true || true) && false is not.
        let expression = parse("'a'=='a' || 'b'=='b' && 'c'=='d'").unwrap();
        assert!(evaluate(&expression, &VariableMap::new()));
    }

    #[test]
    fn test_unresolvable_variables_compare_as_empty() {
        let variables = request_variables();
        let cases = [
            ("$(WHATEVER)==''", true),
            ("$(WHATEVER{whatever})==''", true),
            ("$(WHATEVER)!=''", false),
            ("$(HTTP_COOKIE{missing})==''", true),
        ];
        for (input, expected) in cases {
            let expression = parse(input).unwrap();
            assert_eq!(evaluate(&expression, &variables), expected, "input: {input}");
        }
    }

    #[test]
    fn test_ordinal_comparison() {
        let cases = [
            ("'a' < 'b'", true),
            ("'b' <= 'b'", true),
            ("'10' < '9'", true),
            ("'abc' > 'abb'", true),
            ("'abc' >= 'abd'", false),
        ];
        for (input, expected) in cases {
            let expression = parse(input).unwrap();
            assert_eq!(
                evaluate(&expression, &VariableMap::new()),
                expected,
                "input: {input}"
            );
        }
    }
}
