//! Streaming, selector-driven tree builder.
//!
//! [`Parser`] pulls tokens from an XML byte stream and yields one
//! [`Match`] per element accepted by its [`Selector`]. Elements outside any
//! match are tracked only as long as they are open; nothing below a
//! non-matching element is retained unless a descendant matches.
//!
//! Each open element is in one of two states:
//!
//! - **idle**: not inside a retained subtree. Its start tag was evaluated
//!   against the selector (or it is an ancestor of elements that will be),
//!   and it is dropped as soon as its end tag is read.
//! - **recording**: the retention root itself or one of its descendants.
//!   Everything below a recording element is kept, without consulting the
//!   selector again.
//!
//! A recording element whose parent is idle is complete when its end tag is
//! read, and is handed to the caller together with its ancestor chain.
//!
//! Depth, per-element children, and total token count are capped by
//! [`ParseOptions`]. Exceeding a cap, a malformed document, or a premature
//! end of input puts the parser in a permanent failed state.
//!
//! # Examples
//!
//! ```
//! use xmlpluck::parser::{Parser, ParseOptions};
//! use xmlpluck::selector::PathSelector;
//!
//! let xml = "<a><b>1</b><c/><b>2</b></a>";
//! let mut parser = Parser::new(xml.as_bytes(), PathSelector::new("/a/b"), ParseOptions::default());
//! let mut texts = Vec::new();
//! while let Some(m) = parser.next_match().unwrap() {
//!     texts.push(m.element().text());
//! }
//! assert_eq!(texts, vec!["1", "2"]);
//! ```

mod tokenizer;

use std::io::BufRead;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{PickError, Result};
use crate::namespace::NamespacePolicy;
use crate::selector::{PathSelector, Selector};
use crate::tree::{Ancestor, Ancestors, Element, Name, Node};
use tokenizer::{StartTag, Token, Tokenizer};

/// Default maximum element nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Default maximum number of children of a single retained element.
pub const DEFAULT_MAX_CHILDREN: usize = 1000;

/// Parse options: namespace policy and resource caps.
///
/// ```
/// use xmlpluck::namespace::NamespacePolicy;
/// use xmlpluck::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .namespace(NamespacePolicy::Expand)
///     .max_depth(64)
///     .max_tokens(Some(1_000_000));
/// assert_eq!(opts.max_children, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// How namespaces are represented in extracted nodes (default `Prefix`).
    pub namespace: NamespacePolicy,
    /// Maximum open-element depth, root element counted as 1 (default 1000).
    pub max_depth: usize,
    /// Maximum number of children of one retained element (default 1000).
    pub max_children: usize,
    /// Maximum number of tokens read over the whole stream (default
    /// unlimited).
    pub max_tokens: Option<u64>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            namespace: NamespacePolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_children: DEFAULT_MAX_CHILDREN,
            max_tokens: None,
        }
    }
}

impl ParseOptions {
    /// Sets the namespace policy.
    #[must_use]
    pub fn namespace(mut self, policy: NamespacePolicy) -> Self {
        self.namespace = policy;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum number of children per retained element.
    #[must_use]
    pub fn max_children(mut self, max: usize) -> Self {
        self.max_children = max;
        self
    }

    /// Sets the total token budget; `None` removes the cap.
    #[must_use]
    pub fn max_tokens(mut self, max: Option<u64>) -> Self {
        self.max_tokens = max;
        self
    }
}

/// A completed retained subtree and the context it was found in.
///
/// The match owns its subtree. It also keeps the chain of enclosing
/// elements alive, which the exporter needs to reproduce ancestor context.
#[derive(Debug, Clone)]
pub struct Match {
    element: Element,
    parent: Option<Rc<Ancestor>>,
}

impl Match {
    /// The retained element.
    #[must_use]
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Takes ownership of the retained element, dropping the context.
    #[must_use]
    pub fn into_element(self) -> Element {
        self.element
    }

    /// The element that enclosed the match, if it was not the document
    /// element.
    #[must_use]
    pub fn parent(&self) -> Option<&Ancestor> {
        self.parent.as_deref()
    }

    /// Iterates over the enclosing elements, innermost first.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors<'_> {
        match self.parent.as_deref() {
            Some(parent) => parent.ancestors(),
            None => Ancestors::default(),
        }
    }

    /// Root-counted depth of the matched element.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.depth()) + 1
    }

    /// Resolves `prefix` from the matched element outwards through its
    /// ancestors. Only meaningful under the `Prefix` policy.
    #[must_use]
    pub fn lookup_prefix(&self, prefix: &str) -> Option<&str> {
        self.element
            .namespaces
            .as_ref()
            .and_then(|ns| ns.get(prefix))
            .map(String::as_str)
            .or_else(|| self.parent.as_deref().and_then(|p| p.lookup_prefix(prefix)))
    }

    /// Slash-separated qualified names from the root down to the match.
    #[must_use]
    pub fn path(&self) -> String {
        match self.parent.as_deref() {
            Some(parent) => format!("{}/{}", parent.path(), self.element.name),
            None => format!("/{}", self.element.name),
        }
    }
}

/// One open element.
#[derive(Debug)]
enum Frame {
    /// Outside any retained subtree.
    Idle(Rc<Ancestor>),
    /// The retention root or one of its descendants.
    Recording(Element),
}

impl Frame {
    fn name(&self) -> &Name {
        match self {
            Self::Idle(a) => &a.name,
            Self::Recording(e) => &e.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Reading,
    /// The input ended cleanly.
    Finished,
    /// An error was returned; no further tokens may be read.
    Failed,
}

/// Pull parser yielding one [`Match`] per selected element.
pub struct Parser<R, S = PathSelector> {
    tokens: Tokenizer<R>,
    selector: S,
    options: ParseOptions,
    spine: Vec<Frame>,
    token_count: u64,
    state: State,
}

impl<R: BufRead, S: Selector> Parser<R, S> {
    /// Creates a parser reading from `source`.
    pub fn new(source: R, selector: S, options: ParseOptions) -> Self {
        Self {
            tokens: Tokenizer::new(source, options.namespace.resolves_names()),
            selector,
            options,
            spine: Vec::new(),
            token_count: 0,
            state: State::Reading,
        }
    }

    /// The options this parser was created with.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Number of tokens consumed so far.
    #[must_use]
    pub fn token_count(&self) -> u64 {
        self.token_count
    }

    /// Current open-element depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.spine.len()
    }

    /// Reads until the next match completes.
    ///
    /// Returns `Ok(None)` once the input is exhausted with no element left
    /// open.
    ///
    /// # Errors
    ///
    /// Any error leaves the parser failed, and every later call returns
    /// [`PickError::Poisoned`]. Callers must stop after the first error.
    pub fn next_match(&mut self) -> Result<Option<Match>> {
        match self.state {
            State::Reading => {}
            State::Finished => return Ok(None),
            State::Failed => return Err(PickError::Poisoned),
        }
        match self.advance() {
            Ok(None) => {
                self.state = State::Finished;
                Ok(None)
            }
            Ok(found) => Ok(found),
            Err(e) => {
                debug!(error = %e, depth = self.spine.len(), "extraction failed");
                self.state = State::Failed;
                self.spine.clear();
                Err(e)
            }
        }
    }

    fn recording(&self) -> bool {
        matches!(self.spine.last(), Some(Frame::Recording(_)))
    }

    fn advance(&mut self) -> Result<Option<Match>> {
        loop {
            let keep_text = self.recording();
            let Some(token) = self.tokens.next_token(keep_text)? else {
                if self.spine.is_empty() {
                    return Ok(None);
                }
                return Err(PickError::UnexpectedEof);
            };
            self.token_count += 1;
            if let Some(max) = self.options.max_tokens {
                if self.token_count > max {
                    return Err(PickError::TokenLimit(max));
                }
            }
            match token {
                Token::Start(start) => self.start_element(start)?,
                Token::End(name) => {
                    if let Some(found) = self.end_element(&name)? {
                        return Ok(Some(found));
                    }
                }
                Token::Text(text) => self.text(&text)?,
                Token::Comment | Token::ProcessingInstruction | Token::Directive => {}
            }
        }
    }

    fn start_element(&mut self, start: StartTag) -> Result<()> {
        let depth = self.spine.len() + 1;
        if depth > self.options.max_depth {
            return Err(PickError::DepthLimit(self.options.max_depth));
        }
        let StartTag {
            mut name,
            mut attributes,
            declarations,
        } = start;
        let namespaces = self
            .options
            .namespace
            .apply(&mut name, &mut attributes, declarations);

        let parent = match self.spine.last_mut() {
            Some(Frame::Recording(parent)) => {
                if parent.children.len() >= self.options.max_children {
                    return Err(PickError::ChildLimit(self.options.max_children));
                }
                let mut element = Element::new(name);
                element.attributes = attributes;
                element.namespaces = namespaces;
                self.spine.push(Frame::Recording(element));
                return Ok(());
            }
            Some(Frame::Idle(parent)) => Some(Rc::clone(parent)),
            None => None,
        };

        let candidate = Ancestor::new(name, attributes, namespaces, parent);
        if self.selector.matches(&candidate) {
            debug!(depth, name = %candidate.name, "retention root");
            self.spine.push(Frame::Recording(candidate.into_element()));
        } else {
            trace!(depth, name = %candidate.name, "idle element");
            self.spine.push(Frame::Idle(Rc::new(candidate)));
        }
        Ok(())
    }

    fn end_element(&mut self, end: &Name) -> Result<Option<Match>> {
        let Some(open) = self.spine.last() else {
            return Err(PickError::UnexpectedEndElement {
                name: end.local.clone(),
            });
        };
        let start = open.name();
        if start.local != end.local {
            return Err(PickError::MismatchedEndElement {
                start: start.local.clone(),
                end: end.local.clone(),
            });
        }
        if self.options.namespace.checks_end_space() && start.space != end.space {
            return Err(PickError::MismatchedEndNamespace {
                start: start.local.clone(),
                start_space: start.space.clone(),
                end: end.local.clone(),
                end_space: end.space.clone(),
            });
        }

        let Some(Frame::Recording(element)) = self.spine.pop() else {
            return Ok(None);
        };
        match self.spine.last_mut() {
            Some(Frame::Recording(parent)) => {
                parent.children.push(Node::Element(element));
                Ok(None)
            }
            Some(Frame::Idle(parent)) => {
                let found = Match {
                    element,
                    parent: Some(Rc::clone(parent)),
                };
                debug!(path = %found.path(), "match complete");
                Ok(Some(found))
            }
            None => {
                let found = Match {
                    element,
                    parent: None,
                };
                debug!(path = %found.path(), "match complete");
                Ok(Some(found))
            }
        }
    }

    fn text(&mut self, text: &str) -> Result<()> {
        let Some(Frame::Recording(element)) = self.spine.last_mut() else {
            return Ok(());
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        if element.children.len() >= self.options.max_children {
            return Err(PickError::ChildLimit(self.options.max_children));
        }
        element.children.push(Node::Text(trimmed.to_string()));
        Ok(())
    }
}

impl<R: BufRead, S: Selector> Iterator for Parser<R, S> {
    type Item = Result<Match>;

    /// Yields matches until clean exhaustion. After an error the iterator
    /// keeps yielding [`PickError::Poisoned`].
    fn next(&mut self) -> Option<Self::Item> {
        self.next_match().transpose()
    }
}
