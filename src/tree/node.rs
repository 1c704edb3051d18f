//! Retained node definitions.
//!
//! A retained subtree is a plain owned tree: [`Element`] owns its children
//! in document order. Text leaves are a separate [`Node::Text`] variant and
//! only ever hold trimmed, non-blank character data.

use super::{Attribute, Name};
use crate::namespace::Namespaces;

/// A node inside a retained subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element with its attributes and children.
    Element(Element),
    /// Trimmed, non-blank character data.
    Text(String),
}

impl Node {
    /// Returns the element if this is an element node.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            Self::Text(_) => None,
        }
    }

    /// Returns the text if this is a text node.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Element(_) => None,
            Self::Text(t) => Some(t),
        }
    }
}

impl From<Element> for Node {
    fn from(e: Element) -> Self {
        Self::Element(e)
    }
}

/// An element node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// The element name.
    pub name: Name,
    /// Attributes in source order, without namespace declarations.
    pub attributes: Vec<Attribute>,
    /// Prefix bindings declared on this element itself.
    ///
    /// Only populated under the `Prefix` policy, and only for elements that
    /// declare something; lookups for other prefixes fall through to the
    /// enclosing elements.
    pub namespaces: Option<Namespaces>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element with no attributes or children.
    #[must_use]
    pub fn new(name: Name) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Returns the value of the first attribute with the given local name.
    #[must_use]
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Iterates over the element children, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Concatenates the text leaves directly below this element.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(Node::as_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
