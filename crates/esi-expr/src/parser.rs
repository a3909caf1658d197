//! Recursive-descent parser for the expression grammar.
//!
//! Grammar sketch:
//!
//! ```text
//! expression = item (bool-op item)*
//! item       = '(' expression ')' | comparison
//! comparison = operand cmp-op operand
//! operand    = '\'' constant '\'' | '$(' NAME ('{' KEY '}')? ')'
//! bool-op    = '&&' | '&' | '||' | '|'
//! cmp-op     = '==' | '!=' | '>' | '>=' | '<' | '<='
//! ```
//!
//! Whitespace between tokens is insignificant. AND binds tighter than
//! OR; the precedence is encoded by the evaluator, not the tree shape.

use crate::ast::{
    BooleanOperator, ComparisonExpression, ComparisonOperator, Expression, GroupExpression,
    Operand, VariableReference,
};
use crate::error::InvalidExpression;

/// Parse an expression, failing with the offset of the first character
/// that does not fit the grammar.
pub fn parse(input: &str) -> Result<Expression, InvalidExpression> {
    let chars: Vec<char> = input.chars().collect();
    let mut cursor = Cursor {
        input,
        chars,
        pos: 0,
    };
    let items = parse_sequence(&mut cursor)?;
    cursor.skip_whitespace();
    if !cursor.at_end() {
        return Err(cursor.unexpected());
    }
    Ok(collapse(items))
}

struct Cursor<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Cursor<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> InvalidExpression {
        InvalidExpression::new(self.input, self.pos)
    }

    /// Consume a boolean separator if one is present.
    fn boolean_operator(&mut self) -> Option<BooleanOperator> {
        match self.peek() {
            Some('&') => {
                self.pos += 1;
                if self.peek() == Some('&') {
                    self.pos += 1;
                }
                Some(BooleanOperator::And)
            }
            Some('|') => {
                self.pos += 1;
                if self.peek() == Some('|') {
                    self.pos += 1;
                }
                Some(BooleanOperator::Or)
            }
            _ => None,
        }
    }
}

/// A sequence of items separated by boolean operators. Each item is
/// tagged with the operator joining it to the item that follows; the
/// last item keeps the default `And`.
fn parse_sequence(cursor: &mut Cursor) -> Result<Vec<Expression>, InvalidExpression> {
    let mut items = Vec::new();
    loop {
        let mut item = parse_item(cursor)?;
        cursor.skip_whitespace();
        match cursor.boolean_operator() {
            Some(operator) => {
                item.set_next(operator);
                items.push(item);
            }
            None => {
                items.push(item);
                return Ok(items);
            }
        }
    }
}

fn parse_item(cursor: &mut Cursor) -> Result<Expression, InvalidExpression> {
    cursor.skip_whitespace();
    if cursor.peek() == Some('(') {
        cursor.advance();
        let items = parse_sequence(cursor)?;
        cursor.skip_whitespace();
        if cursor.peek() != Some(')') {
            return Err(cursor.unexpected());
        }
        cursor.advance();
        Ok(collapse(items))
    } else {
        parse_comparison(cursor).map(Expression::Comparison)
    }
}

/// A single-item sequence is the item itself; anything longer becomes a
/// group. The caller re-tags `next` when a sibling follows.
fn collapse(mut items: Vec<Expression>) -> Expression {
    if items.len() == 1 {
        let mut item = items.remove(0);
        item.set_next(BooleanOperator::And);
        item
    } else {
        Expression::Group(GroupExpression {
            items,
            next: BooleanOperator::And,
        })
    }
}

fn parse_comparison(cursor: &mut Cursor) -> Result<ComparisonExpression, InvalidExpression> {
    let left = parse_operand(cursor)?;
    cursor.skip_whitespace();
    let operator = parse_operator(cursor)?;
    let right = parse_operand(cursor)?;
    Ok(ComparisonExpression {
        left,
        right,
        operator,
        next: BooleanOperator::And,
    })
}

fn parse_operand(cursor: &mut Cursor) -> Result<Operand, InvalidExpression> {
    cursor.skip_whitespace();
    match cursor.peek() {
        Some('\'') => parse_constant(cursor),
        Some('$') => parse_variable(cursor),
        _ => Err(cursor.unexpected()),
    }
}

fn parse_operator(cursor: &mut Cursor) -> Result<ComparisonOperator, InvalidExpression> {
    match cursor.peek() {
        Some('=') => {
            cursor.advance();
            if cursor.peek() != Some('=') {
                return Err(cursor.unexpected());
            }
            cursor.advance();
            Ok(ComparisonOperator::Equal)
        }
        Some('!') => {
            cursor.advance();
            if cursor.peek() != Some('=') {
                return Err(cursor.unexpected());
            }
            cursor.advance();
            Ok(ComparisonOperator::NotEqual)
        }
        Some('>') => {
            cursor.advance();
            if cursor.peek() == Some('=') {
                cursor.advance();
                Ok(ComparisonOperator::GreaterThanOrEqual)
            } else {
                Ok(ComparisonOperator::GreaterThan)
            }
        }
        Some('<') => {
            cursor.advance();
            if cursor.peek() == Some('=') {
                cursor.advance();
                Ok(ComparisonOperator::LessThanOrEqual)
            } else {
                Ok(ComparisonOperator::LessThan)
            }
        }
        _ => Err(cursor.unexpected()),
    }
}

/// A single-quoted string constant with escape support.
fn parse_constant(cursor: &mut Cursor) -> Result<Operand, InvalidExpression> {
    cursor.advance(); // opening quote
    let mut value = String::new();
    loop {
        match cursor.peek() {
            None => return Err(cursor.unexpected()),
            Some('\'') => {
                cursor.advance();
                return Ok(Operand::Constant(value));
            }
            Some('\\') => {
                cursor.advance();
                value.push(parse_escape(cursor)?);
            }
            Some(ch) => {
                cursor.advance();
                value.push(ch);
            }
        }
    }
}

fn parse_escape(cursor: &mut Cursor) -> Result<char, InvalidExpression> {
    match cursor.peek() {
        Some('\'') => {
            cursor.advance();
            Ok('\'')
        }
        Some('\\') => {
            cursor.advance();
            Ok('\\')
        }
        Some('b') => {
            cursor.advance();
            Ok('\u{8}')
        }
        Some('f') => {
            cursor.advance();
            Ok('\u{c}')
        }
        Some('n') => {
            cursor.advance();
            Ok('\n')
        }
        Some('r') => {
            cursor.advance();
            Ok('\r')
        }
        Some('u') => {
            cursor.advance();
            let digits_start = cursor.pos;
            let mut code = 0u32;
            for _ in 0..4 {
                let digit = match cursor.peek().and_then(|c| c.to_digit(16)) {
                    Some(d) => d,
                    None => return Err(cursor.unexpected()),
                };
                cursor.advance();
                code = code * 16 + digit;
            }
            char::from_u32(code).ok_or_else(|| InvalidExpression::new(cursor.input, digits_start))
        }
        _ => Err(cursor.unexpected()),
    }
}

/// A `$(NAME)` or `$(NAME{KEY})` reference. Whitespace around the name
/// and key is insignificant.
fn parse_variable(cursor: &mut Cursor) -> Result<Operand, InvalidExpression> {
    cursor.advance(); // '$'
    if cursor.peek() != Some('(') {
        return Err(cursor.unexpected());
    }
    cursor.advance();
    cursor.skip_whitespace();
    let name = parse_name(cursor)?;
    cursor.skip_whitespace();
    let key = if cursor.peek() == Some('{') {
        cursor.advance();
        cursor.skip_whitespace();
        let key = parse_key(cursor)?;
        cursor.advance(); // '}'
        cursor.skip_whitespace();
        Some(key)
    } else {
        None
    };
    if cursor.peek() != Some(')') {
        return Err(cursor.unexpected());
    }
    cursor.advance();
    Ok(Operand::Variable(match key {
        Some(key) => VariableReference::dictionary(name, key),
        None => VariableReference::simple(name),
    }))
}

fn parse_name(cursor: &mut Cursor) -> Result<String, InvalidExpression> {
    let mut name = String::new();
    while let Some(ch) = cursor.peek() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            name.push(ch);
            cursor.advance();
        } else {
            break;
        }
    }
    if name.is_empty() {
        return Err(cursor.unexpected());
    }
    Ok(name)
}

fn parse_key(cursor: &mut Cursor) -> Result<String, InvalidExpression> {
    let mut key = String::new();
    loop {
        match cursor.peek() {
            None => return Err(cursor.unexpected()),
            Some('}') => break,
            Some(ch) => {
                key.push(ch);
                cursor.advance();
            }
        }
    }
    let key = key.trim_end().to_string();
    if key.is_empty() {
        return Err(cursor.unexpected());
    }
    Ok(key)
}
