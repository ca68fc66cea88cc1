//! Owned tree used as the archive interchange format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A child of an element: either a nested element or character data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArchiveNode {
    Text(String),
    Element(ArchiveElement),
}

impl ArchiveNode {
    pub fn as_element(&self) -> Option<&ArchiveElement> {
        match self {
            ArchiveNode::Element(element) => Some(element),
            ArchiveNode::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<ArchiveNode>,
}

impl ArchiveElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attaches a fully built child element.
    pub fn push_element(&mut self, element: ArchiveElement) {
        self.children.push(ArchiveNode::Element(element));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(ArchiveNode::Text(text.into()));
    }

    /// Direct child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &ArchiveElement> {
        self.children.iter().filter_map(ArchiveNode::as_element)
    }

    /// Concatenated character data of the direct children, or `None` when
    /// the element has no text node at all.
    pub fn text(&self) -> Option<String> {
        let mut texts = self
            .children
            .iter()
            .filter_map(|node| match node {
                ArchiveNode::Text(text) => Some(text.as_str()),
                ArchiveNode::Element(_) => None,
            })
            .peekable();
        texts.peek()?;
        Some(texts.collect())
    }

    /// Every descendant element named `tag`, depth-first in document order.
    /// The element itself is not included.
    pub fn descendants_named<'a>(&'a self, tag: &str) -> Vec<&'a ArchiveElement> {
        let mut found = Vec::new();
        collect_named(self, tag, &mut found);
        found
    }
}

fn collect_named<'a>(element: &'a ArchiveElement, tag: &str, found: &mut Vec<&'a ArchiveElement>) {
    for child in element.elements() {
        if child.tag == tag {
            found.push(child);
        }
        collect_named(child, tag, found);
    }
}
