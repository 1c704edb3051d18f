//! XML fragment exporter.
//!
//! Writes each [`Match`] as a standalone, namespace-valid XML fragment.
//! With [`ExportOptions::ancestors`] enabled (the default) the match is
//! wrapped in start and end tags for every enclosing element, from the
//! document root down, so that the fragment carries the same context it had
//! in the source. Otherwise only the match subtree is written.
//!
//! Names and declarations are fixed up per [`NamespacePolicy`]:
//!
//! - `Expand`: names are written unprefixed and `xmlns="..."` is emitted
//!   whenever the default namespace has to change. Namespaced attributes get
//!   a prefix that is already declared in the fragment or a freshly invented
//!   one, declared just before the attribute.
//! - `Strip`: local names only, no declarations.
//! - `Prefix`: names keep their source prefix. Each element re-declares the
//!   bindings it declared in the source (sorted by prefix) unless the same
//!   binding is already in force in the output. Every prefix used is checked
//!   against the source scope first.

use std::io::Write;

use super::ExportOptions;
use crate::error::{PickError, Result};
use crate::namespace::{Bindings, NamespacePolicy, Namespaces, Scope, XML_NAMESPACE, XML_PREFIX};
use crate::parser::Match;
use crate::tree::{Attribute, Element, Name, Node};

/// Writes matches to a byte sink.
///
/// A fragment is rendered completely before anything is written, so a
/// failed export leaves no partial output behind.
///
/// # Examples
///
/// ```
/// use xmlpluck::namespace::NamespacePolicy;
/// use xmlpluck::parser::{Parser, ParseOptions};
/// use xmlpluck::selector::PathSelector;
/// use xmlpluck::serial::{ExportOptions, XmlExporter};
///
/// let options = ParseOptions::default().namespace(NamespacePolicy::Strip);
/// let parser = Parser::new(&b"<a><b/><c/></a>"[..], PathSelector::new("/*/"), options);
/// let mut exporter = XmlExporter::new(Vec::new(), NamespacePolicy::Strip, ExportOptions::default());
/// for found in parser {
///     exporter.export(&found.unwrap()).unwrap();
/// }
/// assert_eq!(exporter.into_inner(), b"<a><b></b></a><a><c></c></a>");
/// ```
#[derive(Debug)]
pub struct XmlExporter<W> {
    sink: W,
    policy: NamespacePolicy,
    options: ExportOptions,
}

impl<W: Write> XmlExporter<W> {
    /// Creates an exporter for matches parsed under `policy`.
    pub fn new(sink: W, policy: NamespacePolicy, options: ExportOptions) -> Self {
        Self {
            sink,
            policy,
            options,
        }
    }

    /// Writes one fragment.
    ///
    /// # Errors
    ///
    /// Returns [`PickError::UndeclaredPrefix`] if a prefix used by the
    /// fragment has no binding in scope (`Prefix` policy), or
    /// [`PickError::Io`] if the sink fails.
    pub fn export(&mut self, found: &Match) -> Result<()> {
        let fragment = render(found, self.policy, &self.options)?;
        self.sink.write_all(fragment.as_bytes())?;
        Ok(())
    }

    /// Returns a reference to the sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Returns a mutable reference to the sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Consumes the exporter and returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Renders one match as an XML string.
///
/// # Errors
///
/// Returns [`PickError::UndeclaredPrefix`] under the `Prefix` policy when a
/// name uses a prefix that is not declared on the element or any enclosing
/// element.
pub fn render(found: &Match, policy: NamespacePolicy, options: &ExportOptions) -> Result<String> {
    let mut chain = Vec::new();
    if options.ancestors {
        chain.extend(found.ancestors());
        chain.reverse();
    }
    let mut out = Fragment::new(policy, options.indent);

    let mut names = Vec::with_capacity(chain.len());
    for (depth, ancestor) in chain.iter().copied().enumerate() {
        let layout = out.indent && depth > 0;
        if layout {
            out.write_indent(depth);
        }
        let scope = Scope::new(Some(ancestor));
        names.push(out.start_tag(
            &ancestor.name,
            &ancestor.attributes,
            ancestor.namespaces.as_ref(),
            &scope,
        )?);
        if out.indent {
            out.buf.push('\n');
        }
    }

    let mut scope = Scope::new(found.parent());
    let isolated = !options.ancestors;
    let layout = out.indent && !chain.is_empty();
    out.element(found.element(), &mut scope, chain.len(), layout, isolated)?;

    for (depth, name) in names.iter().enumerate().rev() {
        if out.indent {
            out.write_indent(depth);
        }
        out.end_tag(name);
        if out.indent && depth > 0 {
            out.buf.push('\n');
        }
    }
    Ok(out.buf)
}

/// Output buffer plus the state needed to keep it namespace-valid.
struct Fragment {
    buf: String,
    policy: NamespacePolicy,
    indent: bool,
    /// Declarations written so far, per open output element.
    bindings: Bindings,
    /// Local names of the open output elements, for error paths.
    path: Vec<String>,
}

impl Fragment {
    fn new(policy: NamespacePolicy, indent: bool) -> Self {
        Self {
            buf: String::new(),
            policy,
            indent,
            bindings: Bindings::default(),
            path: Vec::new(),
        }
    }

    /// Writes a retained element and its subtree.
    ///
    /// `layout` is set when the element sits on its own line; `isolated`
    /// marks the root of a fragment written without ancestors.
    fn element<'a>(
        &mut self,
        element: &'a Element,
        scope: &mut Scope<'a>,
        depth: usize,
        layout: bool,
        isolated: bool,
    ) -> Result<()> {
        scope.push(element.namespaces.as_ref());
        let in_scope;
        let declared = if isolated && self.policy == NamespacePolicy::Prefix {
            in_scope = scope.in_scope();
            Some(&in_scope)
        } else {
            element.namespaces.as_ref()
        };

        if layout {
            self.write_indent(depth);
        }
        let name = self.start_tag(&element.name, &element.attributes, declared, scope)?;
        let element_only = self.indent && is_element_only(element);
        if element_only {
            self.buf.push('\n');
        }
        for child in &element.children {
            match child {
                Node::Element(child) => self.element(child, scope, depth + 1, element_only, false)?,
                Node::Text(text) => write_escaped_text(&mut self.buf, text),
            }
        }
        if element_only {
            self.write_indent(depth);
        }
        self.end_tag(&name);
        if layout {
            self.buf.push('\n');
        }
        scope.pop();
        Ok(())
    }

    /// Writes a start tag and returns the name to close it with.
    fn start_tag(
        &mut self,
        name: &Name,
        attributes: &[Attribute],
        declared: Option<&Namespaces>,
        scope: &Scope<'_>,
    ) -> Result<String> {
        self.path.push(name.local.clone());
        self.bindings.push_scope();
        match self.policy {
            NamespacePolicy::Expand => Ok(self.expanded_start_tag(name, attributes)),
            NamespacePolicy::Strip => {
                self.buf.push('<');
                self.buf.push_str(&name.local);
                for attr in attributes {
                    write_attribute(&mut self.buf, &attr.name.local, &attr.value);
                }
                self.buf.push('>');
                Ok(name.local.clone())
            }
            NamespacePolicy::Prefix => self.prefixed_start_tag(name, attributes, declared, scope),
        }
    }

    fn expanded_start_tag(&mut self, name: &Name, attributes: &[Attribute]) -> String {
        self.buf.push('<');
        self.buf.push_str(&name.local);
        let default_changes = self.bindings.resolve("").unwrap_or_default() != name.space;
        if default_changes {
            self.bindings.bind("", &name.space);
            write_attribute(&mut self.buf, "xmlns", &name.space);
        }
        for attr in attributes {
            if !attr.name.has_space() {
                write_attribute(&mut self.buf, &attr.name.local, &attr.value);
                continue;
            }
            let space = attr.name.space.as_str();
            let bound = self.bindings.prefix_for(space).map(str::to_string);
            let prefix = match bound {
                _ if space == XML_NAMESPACE => XML_PREFIX.to_string(),
                Some(bound) => bound,
                None => {
                    let fresh = self.bindings.fresh_prefix(space);
                    self.bindings.bind(&fresh, space);
                    write_attribute(&mut self.buf, &format!("xmlns:{fresh}"), space);
                    fresh
                }
            };
            write_attribute(&mut self.buf, &format!("{prefix}:{}", attr.name.local), &attr.value);
        }
        self.buf.push('>');
        name.local.clone()
    }

    fn prefixed_start_tag(
        &mut self,
        name: &Name,
        attributes: &[Attribute],
        declared: Option<&Namespaces>,
        scope: &Scope<'_>,
    ) -> Result<String> {
        self.check_prefix(&name.space, scope)?;
        for attr in attributes {
            self.check_prefix(&attr.name.space, scope)?;
        }
        let qualified = name.to_string();
        self.buf.push('<');
        self.buf.push_str(&qualified);
        for attr in attributes {
            write_attribute(&mut self.buf, &attr.name.to_string(), &attr.value);
        }
        for (prefix, uri) in declared.into_iter().flatten() {
            if self.bindings.resolve(prefix) == Some(uri.as_str()) {
                continue;
            }
            self.bindings.bind(prefix, uri);
            if prefix.is_empty() {
                write_attribute(&mut self.buf, "xmlns", uri);
            } else {
                write_attribute(&mut self.buf, &format!("xmlns:{prefix}"), uri);
            }
        }
        self.buf.push('>');
        Ok(qualified)
    }

    fn check_prefix(&self, prefix: &str, scope: &Scope<'_>) -> Result<()> {
        if prefix.is_empty() || prefix == XML_PREFIX || scope.resolve(prefix).is_some() {
            return Ok(());
        }
        Err(PickError::UndeclaredPrefix {
            prefix: prefix.to_string(),
            path: format!("/{}", self.path.join("/")),
        })
    }

    fn end_tag(&mut self, name: &str) {
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
        self.bindings.pop_scope();
        self.path.pop();
    }

    fn write_indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.buf.push_str("  ");
        }
    }
}

/// Returns `true` if the element has element children and no text.
fn is_element_only(element: &Element) -> bool {
    !element.children.is_empty() && element.children.iter().all(|c| matches!(c, Node::Element(_)))
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    write_escaped_attr(out, value);
    out.push('"');
}

/// Writes a hexadecimal character reference (`&#xHH;`).
fn write_hex_char_ref(out: &mut String, ch: char) {
    use std::fmt::Write;
    let _ = write!(out, "&#x{:X};", ch as u32);
}

/// Escapes character data.
///
/// `\n` and `\r` become character references so that re-parsing the
/// fragment yields the exact same text.
fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push(ch),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}

/// Escapes an attribute value for a double-quoted attribute.
fn write_escaped_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}
