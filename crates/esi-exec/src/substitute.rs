//! `$(...)` placeholder substitution for vars fragments.

use esi_expr::{resolve_variable, VariableMap};

/// Substitute every `$(NAME)` / `$(NAME{KEY})` placeholder in `body`
/// through the same variable-resolution capability the expression
/// evaluator uses. Unresolvable placeholders become the empty string;
/// text that merely looks like a placeholder stays verbatim.
pub fn substitute_variables(body: &str, variables: &VariableMap) -> String {
    let mut out = String::with_capacity(body.len());
    let mut pos = 0;
    while let Some(found) = body[pos..].find("$(") {
        let start = pos + found;
        out.push_str(&body[pos..start]);
        match parse_placeholder(body, start) {
            Some((name, key, end)) => {
                out.push_str(&resolve_variable(variables, &name, key.as_deref()));
                pos = end;
            }
            None => {
                out.push('$');
                pos = start + 1;
            }
        }
    }
    out.push_str(&body[pos..]);
    out
}

/// Parse a placeholder at `start` (which points at `$(`), returning
/// the name, optional key, and the byte offset just past the `)`.
fn parse_placeholder(body: &str, start: usize) -> Option<(String, Option<String>, usize)> {
    let bytes = body.as_bytes();
    let mut pos = start + 2;
    skip_whitespace(bytes, &mut pos);
    let name_start = pos;
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
    {
        pos += 1;
    }
    if pos == name_start {
        return None;
    }
    let name = body[name_start..pos].to_string();
    skip_whitespace(bytes, &mut pos);
    let key = if bytes.get(pos) == Some(&b'{') {
        pos += 1;
        let key_start = pos;
        while bytes.get(pos).is_some_and(|b| *b != b'}') {
            pos += 1;
        }
        if pos >= body.len() {
            return None;
        }
        let key = body[key_start..pos].trim().to_string();
        pos += 1;
        skip_whitespace(bytes, &mut pos);
        if key.is_empty() {
            return None;
        }
        Some(key)
    } else {
        None
    };
    if bytes.get(pos) != Some(&b')') {
        return None;
    }
    Some((name, key, pos + 1))
}

fn skip_whitespace(bytes: &[u8], pos: &mut usize) {
    while bytes.get(*pos).is_some_and(|b| b.is_ascii_whitespace()) {
        *pos += 1;
    }
}
