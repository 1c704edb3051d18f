//! # xmlpluck
//!
//! Extracts sub-documents from very large XML streams without building the
//! whole document in memory. A path selector marks the elements to keep;
//! every other element is tracked only while it is open.
//!
//! ## Quick Start
//!
//! ```
//! use xmlpluck::{NamespacePolicy, ParseOptions, Parser, PathSelector};
//! use xmlpluck::serial::{render, ExportOptions};
//!
//! let xml = r#"<feed xmlns:x="urn:x"><x:entry id="1"/><x:entry id="2"/></feed>"#;
//! let parser = Parser::new(xml.as_bytes(), PathSelector::new("/feed/entry"), ParseOptions::default());
//!
//! let fragments: Vec<String> = parser
//!     .map(|found| render(&found.unwrap(), NamespacePolicy::Prefix, &ExportOptions::default()).unwrap())
//!     .collect();
//! assert_eq!(
//!     fragments[0],
//!     r#"<feed xmlns:x="urn:x"><x:entry id="1"></x:entry></feed>"#
//! );
//! ```

pub mod error;
pub mod input;
pub mod namespace;
pub mod parser;
pub mod selector;
pub mod serial;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use error::{PickError, Result};
pub use namespace::NamespacePolicy;
pub use parser::{Match, ParseOptions, Parser};
pub use selector::{PathSelector, Selector};
pub use tree::{Element, Node};
