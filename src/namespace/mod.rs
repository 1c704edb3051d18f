//! Namespace policies and prefix scoping.
//!
//! A stream is parsed under exactly one [`NamespacePolicy`]. The policy
//! decides what ends up in [`Name::space`] and whether an element records
//! its own prefix bindings:
//!
//! | Policy   | `Name::space`       | `namespaces` on nodes           |
//! |----------|---------------------|---------------------------------|
//! | `Expand` | resolved URI        | never                           |
//! | `Strip`  | always empty        | never                           |
//! | `Prefix` | literal prefix      | only the element's own `xmlns*` |
//!
//! Lookups walk outwards from an element through its enclosing elements
//! and stop at the first element that declares the prefix. Two scope
//! structures implement that walk: [`Scope`] over source declarations
//! (retained subtree frames on top of an [`Ancestor`] chain) and
//! [`Bindings`] over declarations already written by the exporter.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::tree::{Ancestor, Attribute, Name};

/// Prefix to URI bindings declared on one element. The empty prefix is the
/// default namespace. Ordered so that emitted declarations are sorted.
pub type Namespaces = BTreeMap<String, String>;

/// The reserved `xml` prefix, bound implicitly in every document.
pub const XML_PREFIX: &str = "xml";

/// The namespace URI bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// How namespaces are represented in extracted nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NamespacePolicy {
    /// Resolve prefixes to namespace URIs while tokenizing.
    Expand,
    /// Drop every namespace identifier and declaration.
    Strip,
    /// Keep literal prefixes and record each element's own declarations.
    #[default]
    Prefix,
}

impl NamespacePolicy {
    /// All policies, in CLI order.
    pub const ALL: [Self; 3] = [Self::Expand, Self::Strip, Self::Prefix];

    /// Returns `true` if the tokenizer must resolve prefixes to URIs.
    #[must_use]
    pub fn resolves_names(self) -> bool {
        self == Self::Expand
    }

    /// Returns `true` if end tags must also match on namespace.
    #[must_use]
    pub fn checks_end_space(self) -> bool {
        self != Self::Strip
    }

    /// Rewrites a freshly tokenized start tag according to this policy and
    /// returns the bindings the element should record.
    ///
    /// `declarations` are the element's `xmlns`/`xmlns:p` attributes as
    /// `(prefix, uri)` pairs; they never remain in `attributes`.
    pub(crate) fn apply(
        self,
        name: &mut Name,
        attributes: &mut [Attribute],
        declarations: Vec<(String, String)>,
    ) -> Option<Namespaces> {
        match self {
            Self::Expand => None,
            Self::Strip => {
                name.space.clear();
                for attr in attributes.iter_mut() {
                    attr.name.space.clear();
                }
                None
            }
            Self::Prefix => {
                if declarations.is_empty() {
                    None
                } else {
                    Some(declarations.into_iter().collect())
                }
            }
        }
    }
}

impl fmt::Display for NamespacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expand => write!(f, "expand"),
            Self::Strip => write!(f, "strip"),
            Self::Prefix => write!(f, "prefix"),
        }
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicy(pub String);

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown namespace policy {:?} (expected expand, strip or prefix)",
            self.0
        )
    }
}

impl std::error::Error for UnknownPolicy {}

impl FromStr for NamespacePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expand" => Ok(Self::Expand),
            "strip" => Ok(Self::Strip),
            "prefix" => Ok(Self::Prefix),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Source-side prefix scope used while walking a retained subtree.
///
/// Frames pushed for retained elements are searched innermost first, then
/// the lookup continues through the ancestor chain the scope was created
/// with.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    base: Option<&'a Ancestor>,
    frames: Vec<Option<&'a Namespaces>>,
}

impl<'a> Scope<'a> {
    /// Creates a scope whose outermost bindings come from `base` and its
    /// ancestors.
    #[must_use]
    pub fn new(base: Option<&'a Ancestor>) -> Self {
        Self {
            base,
            frames: Vec::new(),
        }
    }

    /// Enters an element that declares `namespaces` (or nothing).
    pub fn push(&mut self, namespaces: Option<&'a Namespaces>) {
        self.frames.push(namespaces);
    }

    /// Leaves the innermost element.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolves `prefix` to the URI of its nearest declaration.
    #[must_use]
    pub fn resolve(&self, prefix: &str) -> Option<&'a str> {
        self.frames
            .iter()
            .rev()
            .flatten()
            .copied()
            .find_map(|ns| ns.get(prefix).map(String::as_str))
            .or_else(|| self.base.and_then(|b| b.lookup_prefix(prefix)))
    }

    /// Flattens every binding visible at the innermost frame.
    #[must_use]
    pub fn in_scope(&self) -> Namespaces {
        let mut chain: Vec<&Ancestor> = self.base.map(|b| b.ancestors().collect()).unwrap_or_default();
        chain.reverse();
        let mut merged = Namespaces::new();
        let outer = chain.into_iter().filter_map(|a| a.namespaces.as_ref());
        for ns in outer.chain(self.frames.iter().flatten().copied()) {
            merged.extend(ns.iter().map(|(p, u)| (p.clone(), u.clone())));
        }
        merged
    }
}

/// Output-side bindings: what the exporter has already declared in the
/// fragment it is writing.
#[derive(Debug, Clone, Default)]
pub(crate) struct Bindings {
    /// One frame per open output element, holding `(prefix, uri)` pairs.
    stack: Vec<Vec<(String, String)>>,
}

impl Bindings {
    pub fn push_scope(&mut self) {
        self.stack.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.stack.pop();
    }

    /// Binds `prefix` in the innermost frame.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        if let Some(frame) = self.stack.last_mut() {
            frame.push((prefix.to_string(), uri.to_string()));
        }
    }

    /// Resolves a prefix against the declarations written so far.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Returns a non-empty prefix currently bound to `uri` and not shadowed
    /// by an inner declaration.
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .filter(|(p, u)| !p.is_empty() && u == uri)
            .map(|(p, _)| p.as_str())
            .find(|p| self.resolve(p) == Some(uri))
    }

    /// Invents a prefix for `uri` that is not bound yet.
    ///
    /// The last path segment of the URI is used when it is a usable name
    /// (`http://example.com/x` gives `x`), otherwise `ns`. Clashes get a
    /// numeric suffix: `x_1`, `x_2`, ...
    pub fn fresh_prefix(&self, uri: &str) -> String {
        let base = suggest_prefix(uri);
        if self.resolve(&base).is_none() {
            return base;
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|p| self.resolve(p).is_none())
            .unwrap_or(base)
    }
}

fn suggest_prefix(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let usable = last
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && last
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !last
            .get(..3)
            .is_some_and(|head| head.eq_ignore_ascii_case(XML_PREFIX));
    if usable {
        last.to_string()
    } else {
        "ns".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_policy_round_trips_through_strings() {
        for policy in NamespacePolicy::ALL {
            assert_eq!(policy.to_string().parse::<NamespacePolicy>(), Ok(policy));
        }
        assert_eq!("PREFIX".parse::<NamespacePolicy>(), Ok(NamespacePolicy::Prefix));
        assert!("resolve".parse::<NamespacePolicy>().is_err());
        assert_eq!(NamespacePolicy::default(), NamespacePolicy::Prefix);
    }

    #[test]
    fn test_strip_clears_every_space() {
        let mut name = Name::new("x", "a");
        let mut attrs = vec![Attribute::new(Name::new("y", "b"), "1")];
        let ns = NamespacePolicy::Strip.apply(
            &mut name,
            &mut attrs,
            vec![("x".to_string(), "urn:x".to_string())],
        );
        assert_eq!(ns, None);
        assert_eq!(name, Name::local("a"));
        assert_eq!(attrs[0].name, Name::local("b"));
    }

    #[test]
    fn test_prefix_records_only_own_declarations() {
        let mut name = Name::new("x", "a");
        let none = NamespacePolicy::Prefix.apply(&mut name, &mut [], Vec::new());
        assert_eq!(none, None);
        let some = NamespacePolicy::Prefix.apply(
            &mut name,
            &mut [],
            vec![
                ("x".to_string(), "urn:x".to_string()),
                (String::new(), "urn:d".to_string()),
            ],
        );
        let some = some.unwrap_or_default();
        assert_eq!(some.get("x").map(String::as_str), Some("urn:x"));
        assert_eq!(some.get("").map(String::as_str), Some("urn:d"));
        assert_eq!(name, Name::new("x", "a"));
    }

    #[test]
    fn test_scope_frames_shadow_ancestors() {
        let outer: Namespaces = [("x".to_string(), "urn:outer".to_string())].into();
        let root = Rc::new(Ancestor::new(Name::local("a"), Vec::new(), Some(outer), None));
        let inner: Namespaces = [("x".to_string(), "urn:inner".to_string())].into();

        let mut scope = Scope::new(Some(&root));
        assert_eq!(scope.resolve("x"), Some("urn:outer"));
        scope.push(Some(&inner));
        scope.push(None);
        assert_eq!(scope.resolve("x"), Some("urn:inner"));
        assert_eq!(scope.in_scope().get("x").map(String::as_str), Some("urn:inner"));
        scope.pop();
        scope.pop();
        assert_eq!(scope.resolve("x"), Some("urn:outer"));
        assert_eq!(scope.resolve("y"), None);
    }

    #[test]
    fn test_bindings_resolve_and_shadow() {
        let mut b = Bindings::default();
        b.push_scope();
        b.bind("", "urn:d");
        b.bind("ns1", "urn:x");
        assert_eq!(b.resolve(""), Some("urn:d"));
        assert_eq!(b.prefix_for("urn:x"), Some("ns1"));
        assert_eq!(b.fresh_prefix("urn:y"), "ns");

        b.push_scope();
        b.bind("ns1", "urn:other");
        assert_eq!(b.prefix_for("urn:x"), None);
        b.pop_scope();
        assert_eq!(b.prefix_for("urn:x"), Some("ns1"));
        b.pop_scope();
        assert_eq!(b.resolve(""), None);
    }

    #[test]
    fn test_fresh_prefix_follows_uri() {
        let mut b = Bindings::default();
        b.push_scope();
        assert_eq!(b.fresh_prefix("http://example.com/x"), "x");
        assert_eq!(b.fresh_prefix("http://www.w3.org"), "www.w3.org");
        assert_eq!(b.fresh_prefix("urn:ISBN:0-395-36341-6"), "ns");
        assert_eq!(b.fresh_prefix("http://example.com/xmlstuff/"), "ns");
        assert_eq!(b.fresh_prefix("a"), "a");
        b.bind("x", "urn:taken");
        b.bind("x_1", "urn:taken-too");
        assert_eq!(b.fresh_prefix("http://example.com/x"), "x_2");
    }
}
