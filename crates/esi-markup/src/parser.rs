//! Body parsing: recognized tags become fragments, everything else is
//! preserved verbatim as text.

use std::collections::HashMap;
use std::sync::Arc;

use esi_core::Fragment;
use esi_pipeline::Interceptor;

use crate::error::MarkupError;
use crate::scanner::{self, ScannedTag};
use crate::tag::TagAttributes;
use crate::tags::standard_tag_parsers;

pub type ParseResult = Result<Fragment, MarkupError>;

/// Owned view of one scanned tag, handed to parse interceptors.
#[derive(Debug, Clone)]
pub struct ParseInput {
    pub attributes: TagAttributes,
    pub body: String,
}

pub type ParseInterceptor = Arc<dyn Interceptor<ParseInput, ParseResult>>;

/// Per-tag fragment construction. Implementations for tags with
/// recursively parsed children re-enter the body parser.
pub trait TagParser: Send + Sync {
    fn parse(&self, attributes: &TagAttributes, body: &str, parser: &EsiBodyParser) -> ParseResult;
}

/// Scans a body for the recognized tag set and builds the fragment
/// tree. Unrecognized `<esi:...>` tags and ordinary text are preserved
/// verbatim as text fragments.
pub struct EsiBodyParser {
    tag_parsers: HashMap<String, Arc<dyn TagParser>>,
    interceptors: HashMap<String, Vec<ParseInterceptor>>,
}

impl EsiBodyParser {
    /// A parser with the standard tag set registered.
    pub fn new() -> Self {
        Self {
            tag_parsers: standard_tag_parsers(),
            interceptors: HashMap::new(),
        }
    }

    /// Register or replace the parser for one tag name.
    pub fn with_tag_parser(mut self, tag: impl Into<String>, parser: Arc<dyn TagParser>) -> Self {
        self.tag_parsers.insert(tag.into(), parser);
        self
    }

    /// Register a parse interceptor for one tag name. The first
    /// registered interceptor is outermost.
    pub fn with_interceptor(
        mut self,
        tag: impl Into<String>,
        interceptor: ParseInterceptor,
    ) -> Self {
        self.interceptors.entry(tag.into()).or_default().push(interceptor);
        self
    }

    /// Parse a whole body. Any markup error aborts the parse.
    pub fn parse(&self, body: &str) -> ParseResult {
        let mut children = Vec::new();
        let mut pos = 0;
        while let Some(tag) = scanner::next_tag(body, pos) {
            if tag.start > pos {
                children.push(Fragment::Text(body[pos..tag.start].to_string()));
            }
            children.push(self.parse_tag(&tag)?);
            pos = tag.end;
        }
        if pos < body.len() {
            children.push(Fragment::Text(body[pos..].to_string()));
        }
        Ok(Fragment::from_children(children))
    }

    fn parse_tag(&self, tag: &ScannedTag) -> ParseResult {
        let Some(tag_parser) = self.tag_parsers.get(tag.name) else {
            return Ok(Fragment::Text(tag.outer.to_string()));
        };
        let body = tag.body.unwrap_or_default();
        match self.interceptors.get(tag.name) {
            Some(interceptors) if !interceptors.is_empty() => {
                let input = ParseInput {
                    attributes: tag.attributes.clone(),
                    body: body.to_string(),
                };
                esi_pipeline::run(interceptors, input, &|input: ParseInput| {
                    tag_parser.parse(&input.attributes, &input.body, self)
                })
            }
            _ => tag_parser.parse(&tag.attributes, body, self),
        }
    }
}

impl Default for EsiBodyParser {
    fn default() -> Self {
        Self::new()
    }
}
