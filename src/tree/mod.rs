//! Node model for extracted sub-documents.
//!
//! Two kinds of nodes exist:
//!
//! - **Retained nodes** ([`Node`], [`Element`]) belong to a match subtree.
//!   They are owned values: a parent owns its children in document order and
//!   children carry no back-pointer. Whoever receives a
//!   [`Match`](crate::parser::Match) owns the whole subtree.
//! - **Spine links** ([`Ancestor`]) describe the open elements above a
//!   match. They are immutable and reference counted, each pointing only at
//!   its parent, so a match can keep its ancestor context alive after the
//!   parser has moved past those elements without any ownership cycle.
//!
//! The meaning of [`Name::space`] depends on the
//! [`NamespacePolicy`](crate::namespace::NamespacePolicy) the stream was
//! parsed with: a resolved namespace URI (`Expand`), the literal source
//! prefix (`Prefix`), or always empty (`Strip`).

mod ancestor;
mod node;

pub use ancestor::{Ancestor, Ancestors};
pub use node::{Element, Node};

use std::fmt;

/// A namespace-qualified element or attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    /// Namespace identifier: URI, source prefix, or empty depending on policy.
    pub space: String,
    /// The local part of the name.
    pub local: String,
}

impl Name {
    /// Creates a name in the given namespace.
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    /// Creates a name with no namespace identifier.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(String::new(), local)
    }

    /// Returns `true` if the name has a namespace identifier.
    #[must_use]
    pub fn has_space(&self) -> bool {
        !self.space.is_empty()
    }
}

/// Formats as `space:local`, or just `local` when there is no namespace.
impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_space() {
            write!(f, "{}:{}", self.space, self.local)
        } else {
            f.write_str(&self.local)
        }
    }
}

/// An attribute on an element.
///
/// Namespace declarations (`xmlns`, `xmlns:p`) are never stored as
/// attributes; see [`Element::namespaces`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name.
    pub name: Name,
    /// The attribute value with entity and character references resolved.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute.
    pub fn new(name: Name, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}
