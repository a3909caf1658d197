//! Low-level scanning of `<esi:...>` tag spans.
//!
//! The scanner only commits to a span that forms a well-formed tag: a
//! recognized header and, for open tags, a matching close tag found
//! with same-name depth counting. A `<esi:` occurrence that does not
//! scan is left to the caller as ordinary text.

use crate::entity::decode_entities;
use crate::tag::TagAttributes;

const MARKER: &str = "<esi:";

/// One well-formed tag span inside a body.
#[derive(Debug)]
pub(crate) struct ScannedTag<'a> {
    /// Tag name without the `esi:` prefix.
    pub name: &'a str,
    pub attributes: TagAttributes,
    /// Inner body for open tags, `None` for self-closing ones.
    pub body: Option<&'a str>,
    /// The full outer span, open tag through close tag.
    pub outer: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Find the next well-formed tag at or after byte offset `from`.
pub(crate) fn next_tag(input: &str, mut from: usize) -> Option<ScannedTag<'_>> {
    while from < input.len() {
        let found = input[from..].find(MARKER)?;
        let start = from + found;
        if let Some(tag) = scan_at(input, start) {
            return Some(tag);
        }
        from = start + 1;
    }
    None
}

fn scan_at(input: &str, start: usize) -> Option<ScannedTag<'_>> {
    let header = scan_header(input, start)?;
    if header.self_closing {
        Some(ScannedTag {
            name: header.name,
            attributes: header.attributes,
            body: None,
            outer: &input[start..header.end],
            start,
            end: header.end,
        })
    } else {
        let (body_end, close_end) = find_close(input, header.end, header.name)?;
        Some(ScannedTag {
            name: header.name,
            attributes: header.attributes,
            body: Some(&input[header.end..body_end]),
            outer: &input[start..close_end],
            start,
            end: close_end,
        })
    }
}

struct TagHeader<'a> {
    name: &'a str,
    attributes: TagAttributes,
    self_closing: bool,
    end: usize,
}

fn scan_header(input: &str, start: usize) -> Option<TagHeader<'_>> {
    let bytes = input.as_bytes();
    let mut pos = start + MARKER.len();
    let name_start = pos;
    if !bytes.get(pos).is_some_and(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
    {
        pos += 1;
    }
    let name = &input[name_start..pos];
    let mut attributes = TagAttributes::new();
    loop {
        let whitespace_start = pos;
        while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => {
                return Some(TagHeader {
                    name,
                    attributes,
                    self_closing: false,
                    end: pos + 1,
                })
            }
            b'/' => {
                return if bytes.get(pos + 1) == Some(&b'>') {
                    Some(TagHeader {
                        name,
                        attributes,
                        self_closing: true,
                        end: pos + 2,
                    })
                } else {
                    None
                };
            }
            _ => {
                // Attributes must be separated from the name and from
                // each other by whitespace.
                if whitespace_start == pos {
                    return None;
                }
                let (attr_name, raw_value, next) = scan_attribute(input, pos)?;
                attributes.insert(attr_name, decode_entities(raw_value));
                pos = next;
            }
        }
    }
}

fn scan_attribute(input: &str, mut pos: usize) -> Option<(&str, &str, usize)> {
    let bytes = input.as_bytes();
    let name_start = pos;
    if !bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_')
    {
        return None;
    }
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
    {
        pos += 1;
    }
    let name = &input[name_start..pos];
    while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
        pos += 1;
    }
    if bytes.get(pos) != Some(&b'=') {
        return None;
    }
    pos += 1;
    while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
        pos += 1;
    }
    let quote = match bytes.get(pos)? {
        b'"' => b'"',
        b'\'' => b'\'',
        _ => return None,
    };
    pos += 1;
    let value_start = pos;
    while bytes.get(pos).is_some_and(|b| *b != quote) {
        pos += 1;
    }
    if pos >= input.len() {
        return None;
    }
    Some((name, &input[value_start..pos], pos + 1))
}

/// Find the close tag matching an open tag of `name`, counting nested
/// same-name open tags. Returns `(body_end, close_end)`.
fn find_close(input: &str, search_from: usize, name: &str) -> Option<(usize, usize)> {
    let open_marker = format!("<esi:{name}");
    let close_marker = format!("</esi:{name}");
    let bytes = input.as_bytes();
    let mut depth = 1usize;
    let mut pos = search_from;
    loop {
        let close_at = pos + input[pos..].find(&close_marker)?;

        // Nested same-name opens before this close deepen the level.
        let mut scan = pos;
        while let Some(found) = input[scan..close_at].find(&open_marker) {
            let open_at = scan + found;
            let at_boundary = bytes
                .get(open_at + open_marker.len())
                .is_some_and(|b| b.is_ascii_whitespace() || *b == b'/' || *b == b'>');
            if at_boundary {
                match scan_header(input, open_at) {
                    Some(header) => {
                        if !header.self_closing {
                            depth += 1;
                        }
                        scan = header.end;
                    }
                    None => scan = open_at + 1,
                }
            } else {
                scan = open_at + 1;
            }
        }

        let mut after = close_at + close_marker.len();
        if bytes
            .get(after)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
        {
            // A longer tag name, e.g. `</esi:textarea>` while closing
            // `text`.
            pos = close_at + 1;
            continue;
        }
        while bytes.get(after).is_some_and(|b| b.is_ascii_whitespace()) {
            after += 1;
        }
        if bytes.get(after) == Some(&b'>') {
            depth -= 1;
            if depth == 0 {
                return Some((close_at, after + 1));
            }
            pos = after + 1;
        } else {
            pos = close_at + 1;
        }
    }
}
