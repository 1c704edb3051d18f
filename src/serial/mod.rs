//! Output formats for extracted matches.
//!
//! [`xml`] re-serializes a match as a standalone XML fragment, optionally
//! wrapped in its ancestor context. [`json`] projects a match onto a simple
//! JSON object.

pub mod json;
pub mod xml;

pub use xml::{render, XmlExporter};

/// Options controlling XML export.
///
/// # Examples
///
/// ```
/// use xmlpluck::serial::ExportOptions;
///
/// let opts = ExportOptions::default().ancestors(false).indent(true);
/// assert!(!opts.ancestors);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Wrap each match in start and end tags for its enclosing elements.
    /// Defaults to `true`.
    pub ancestors: bool,
    /// Put element-only content on separate, indented lines.
    /// Defaults to `false`.
    pub indent: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ancestors: true,
            indent: false,
        }
    }
}

impl ExportOptions {
    /// Enables or disables the ancestor context.
    ///
    /// Without it only the match subtree is written. Under the `Prefix`
    /// policy the fragment root then declares every binding in scope at the
    /// match, so the fragment stays namespace-valid on its own.
    #[must_use]
    pub fn ancestors(mut self, ancestors: bool) -> Self {
        self.ancestors = ancestors;
        self
    }

    /// Enables or disables indented output. Mixed-content elements are never
    /// indented.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }
}
