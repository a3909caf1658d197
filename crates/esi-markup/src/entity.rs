//! HTML entity decoding for attribute values.

/// Decode the named and numeric entities that appear in attribute
/// values (`&amp;` and friends, `&#NN;`, `&#xHH;`). Anything that does
/// not form a valid entity is kept verbatim.
pub fn decode_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match decode_one(candidate) {
            Some((decoded, consumed)) => {
                out.push(decoded);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode a single entity at the start of `input` (which begins with
/// `&`), returning the character and the number of bytes consumed.
fn decode_one(input: &str) -> Option<(char, usize)> {
    let end = input.find(';')?;
    let name = &input[1..end];
    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)?
        }
    };
    Some((decoded, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_entities() {
        assert_eq!(decode_entities("a=1&amp;b=2"), "a=1&b=2");
        assert_eq!(decode_entities("&lt;esi:include&gt;"), "<esi:include>");
        assert_eq!(decode_entities("&quot;x&quot; &apos;y&apos;"), "\"x\" 'y'");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
    }

    #[test]
    fn test_invalid_entities_kept_verbatim() {
        assert_eq!(decode_entities("a && b"), "a && b");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
        assert_eq!(decode_entities("trailing &"), "trailing &");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(decode_entities("no entities here"), "no entities here");
    }
}
