//! Path selectors.
//!
//! A selector decides which elements start a retained subtree. It is asked
//! once per element whose parent is not already retained, and sees the
//! candidate together with its chain of open ancestors.
//!
//! [`PathSelector`] implements the fixed-depth path syntax:
//!
//! - segments are separated by `/`; a leading `/` is optional;
//! - `*` or an empty segment matches any element name at that depth;
//! - a trailing `/` adds one more wildcard level;
//! - every other segment must equal the element's local name (namespaces
//!   are ignored);
//! - the empty pattern and `/` select the document element.
//!
//! Depth is always counted from the document root, so `/a/b` and `a/b`
//! only match `b` elements that are direct children of the root `a`.
//!
//! # Examples
//!
//! ```
//! use xmlpluck::selector::PathSelector;
//!
//! assert_eq!(PathSelector::new("/").depth(), 1);
//! assert_eq!(PathSelector::new("/feed/entry").depth(), 2);
//! assert_eq!(PathSelector::new("/feed/").depth(), 2);
//! assert_eq!(PathSelector::new("/feed/").to_string(), "/feed/*");
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::tree::Ancestor;

/// Decides whether an element begins a retained subtree.
pub trait Selector {
    /// Returns `true` if `candidate` is a retention root. The candidate's
    /// parent chain is available through [`Ancestor::parent`].
    fn matches(&self, candidate: &Ancestor) -> bool;
}

impl<F> Selector for F
where
    F: Fn(&Ancestor) -> bool,
{
    fn matches(&self, candidate: &Ancestor) -> bool {
        self(candidate)
    }
}

/// One step of a [`PathSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Any,
    Local(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "*" => Self::Any,
            local => Self::Local(local.to_string()),
        }
    }

    fn accepts(&self, local: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Local(expected) => expected == local,
        }
    }
}

/// A compiled `/`-separated path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSelector {
    /// Segments ordered from the document element downwards.
    segments: Vec<Segment>,
}

impl PathSelector {
    /// Compiles `pattern`. Compilation cannot fail: every string is a valid
    /// pattern.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let trimmed = pattern.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let segments = body.split('/').map(Segment::parse).collect();
        Self { segments }
    }

    /// The root-counted depth at which this selector matches.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl Default for PathSelector {
    /// Selects the document element.
    fn default() -> Self {
        Self::new("/")
    }
}

impl FromStr for PathSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for PathSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            f.write_str("/")?;
            match segment {
                Segment::Any => f.write_str("*")?,
                Segment::Local(local) => f.write_str(local)?,
            }
        }
        Ok(())
    }
}

impl Selector for PathSelector {
    fn matches(&self, candidate: &Ancestor) -> bool {
        candidate.depth() == self.segments.len()
            && self
                .segments
                .iter()
                .rev()
                .zip(candidate.ancestors())
                .all(|(segment, node)| segment.accepts(&node.name.local))
    }
}
