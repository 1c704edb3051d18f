//! Reference-counted spine links.

use std::rc::Rc;

use super::{Attribute, Element, Name};
use crate::namespace::Namespaces;

/// An open element on the path from the document root to a match.
///
/// Each link holds its own name, attributes, and declared bindings plus a
/// shared pointer to its parent. Links are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    /// The element name.
    pub name: Name,
    /// Attributes in source order, without namespace declarations.
    pub attributes: Vec<Attribute>,
    /// Prefix bindings declared on this element itself (`Prefix` policy only).
    pub namespaces: Option<Namespaces>,
    parent: Option<Rc<Ancestor>>,
    depth: usize,
}

impl Ancestor {
    /// Creates a link below `parent`. A link without a parent is the
    /// document element and has depth 1.
    #[must_use]
    pub fn new(
        name: Name,
        attributes: Vec<Attribute>,
        namespaces: Option<Namespaces>,
        parent: Option<Rc<Ancestor>>,
    ) -> Self {
        let depth = parent.as_ref().map_or(0, |p| p.depth) + 1;
        Self {
            name,
            attributes,
            namespaces,
            parent,
            depth,
        }
    }

    /// Root-counted depth: the document element is at depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The enclosing element, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Ancestor> {
        self.parent.as_deref()
    }

    /// Iterates from this link up to the document element.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Resolves `prefix` by walking from this element towards the root and
    /// returning the first binding found. The empty prefix is the default
    /// namespace.
    #[must_use]
    pub fn lookup_prefix(&self, prefix: &str) -> Option<&str> {
        self.ancestors().find_map(|a| {
            a.namespaces
                .as_ref()
                .and_then(|ns| ns.get(prefix))
                .map(String::as_str)
        })
    }

    /// Slash-separated qualified names from the root down to this element.
    #[must_use]
    pub fn path(&self) -> String {
        let mut names: Vec<String> = self.ancestors().map(|a| a.name.to_string()).collect();
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Detaches this link from its parent and turns it into a retained
    /// element with no children yet.
    #[must_use]
    pub fn into_element(self) -> Element {
        Element {
            name: self.name,
            attributes: self.attributes,
            namespaces: self.namespaces,
            children: Vec::new(),
        }
    }
}

/// Iterator over an [`Ancestor`] and its parents, innermost first.
#[derive(Debug, Clone, Default)]
pub struct Ancestors<'a> {
    next: Option<&'a Ancestor>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Ancestor;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}
