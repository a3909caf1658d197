//! Attribute mapping extracted from a scanned tag.

use std::collections::BTreeMap;

use crate::error::MarkupError;

/// Attributes of one tag instance, entity-decoded at extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagAttributes(BTreeMap<String, String>);

impl TagAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.as_str())
    }

    pub fn require(&self, tag: &'static str, attribute: &'static str) -> Result<&str, MarkupError> {
        self.get(attribute)
            .ok_or(MarkupError::MissingAttribute { tag, attribute })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for TagAttributes {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_missing_attribute() {
        let attributes = TagAttributes::new();
        assert_eq!(
            attributes.require("include", "src"),
            Err(MarkupError::MissingAttribute {
                tag: "include",
                attribute: "src"
            })
        );
    }

    #[test]
    fn test_require_present_attribute() {
        let mut attributes = TagAttributes::new();
        attributes.insert("src", "http://host/fragment");
        assert_eq!(
            attributes.require("include", "src"),
            Ok("http://host/fragment")
        );
    }
}
