//! The standard tag set.

use std::collections::HashMap;
use std::sync::Arc;

use esi_core::{Fragment, When};

use crate::error::MarkupError;
use crate::parser::{EsiBodyParser, ParseResult, TagParser};
use crate::scanner::{self, ScannedTag};
use crate::tag::TagAttributes;

pub(crate) fn standard_tag_parsers() -> HashMap<String, Arc<dyn TagParser>> {
    let mut parsers: HashMap<String, Arc<dyn TagParser>> = HashMap::new();
    parsers.insert(String::from("include"), Arc::new(IncludeTagParser));
    parsers.insert(String::from("try"), Arc::new(TryTagParser));
    parsers.insert(String::from("choose"), Arc::new(ChooseTagParser));
    parsers.insert(String::from("vars"), Arc::new(VarsTagParser));
    parsers.insert(String::from("text"), Arc::new(TextTagParser));
    parsers.insert(String::from("comment"), Arc::new(IgnoreTagParser));
    parsers.insert(String::from("remove"), Arc::new(IgnoreTagParser));
    parsers
}

/// The direct child tags of a parent tag's body. Text and unrecognized
/// content between children is not part of any child.
fn child_tags(body: &str) -> Vec<ScannedTag<'_>> {
    let mut children = Vec::new();
    let mut pos = 0;
    while let Some(tag) = scanner::next_tag(body, pos) {
        pos = tag.end;
        children.push(tag);
    }
    children
}

/// `<esi:include src="..."/>`, optionally wrapped in a fallback pair
/// when `onerror="continue"` or `alt` is present.
pub struct IncludeTagParser;

impl TagParser for IncludeTagParser {
    fn parse(&self, attributes: &TagAttributes, _body: &str, _parser: &EsiBodyParser) -> ParseResult {
        let src = attributes.require("include", "src")?;
        let include = Fragment::include(src);
        Ok(if attributes.get("onerror") == Some("continue") {
            Fragment::try_except(include, Fragment::Ignore)
        } else if let Some(alt) = attributes.get("alt") {
            Fragment::try_except(include, Fragment::include(alt))
        } else {
            include
        })
    }
}

/// `<esi:try>` with one `attempt` and one `except` child.
pub struct TryTagParser;

impl TagParser for TryTagParser {
    fn parse(&self, _attributes: &TagAttributes, body: &str, parser: &EsiBodyParser) -> ParseResult {
        let mut attempt = None;
        let mut except = None;
        for child in child_tags(body) {
            match child.name {
                "attempt" if attempt.is_none() => {
                    attempt = Some(parser.parse(child.body.unwrap_or_default())?);
                }
                "except" if except.is_none() => {
                    except = Some(parser.parse(child.body.unwrap_or_default())?);
                }
                _ => {}
            }
        }
        let attempt = attempt.ok_or(MarkupError::MissingChild {
            parent: "try",
            child: "attempt",
        })?;
        let except = except.ok_or(MarkupError::MissingChild {
            parent: "try",
            child: "except",
        })?;
        Ok(Fragment::try_except(attempt, except))
    }
}

/// `<esi:choose>` with one or more `when` children and at most one
/// `otherwise`. Each test expression is parsed here, at parse time.
pub struct ChooseTagParser;

impl TagParser for ChooseTagParser {
    fn parse(&self, _attributes: &TagAttributes, body: &str, parser: &EsiBodyParser) -> ParseResult {
        let mut whens = Vec::new();
        let mut otherwise = None;
        for child in child_tags(body) {
            match child.name {
                "when" => {
                    let test = esi_expr::parse(child.attributes.require("when", "test")?)?;
                    let body = parser.parse(child.body.unwrap_or_default())?;
                    whens.push(When::new(test, body));
                }
                "otherwise" if otherwise.is_none() => {
                    otherwise = Some(parser.parse(child.body.unwrap_or_default())?);
                }
                _ => {}
            }
        }
        if whens.is_empty() {
            return Err(MarkupError::MissingChild {
                parent: "choose",
                child: "when",
            });
        }
        Ok(Fragment::choose(whens, otherwise.unwrap_or(Fragment::Ignore)))
    }
}

/// `<esi:vars>`: the body is kept verbatim for execution-time
/// substitution, never parsed as markup.
pub struct VarsTagParser;

impl TagParser for VarsTagParser {
    fn parse(&self, _attributes: &TagAttributes, body: &str, _parser: &EsiBodyParser) -> ParseResult {
        Ok(Fragment::vars(body))
    }
}

/// `<esi:text>`: the body is literal output, even when it looks like
/// markup.
pub struct TextTagParser;

impl TagParser for TextTagParser {
    fn parse(&self, _attributes: &TagAttributes, body: &str, _parser: &EsiBodyParser) -> ParseResult {
        Ok(Fragment::text(body))
    }
}

/// `<esi:comment>` and `<esi:remove>`: no output, regardless of
/// content.
pub struct IgnoreTagParser;

impl TagParser for IgnoreTagParser {
    fn parse(&self, _attributes: &TagAttributes, _body: &str, _parser: &EsiBodyParser) -> ParseResult {
        Ok(Fragment::Ignore)
    }
}
