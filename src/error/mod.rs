//! Error types for extraction and export.
//!
//! Every error is fatal to the operation that raised it. Errors produced
//! while reading the stream poison the [`Parser`](crate::parser::Parser):
//! any later call returns [`PickError::Poisoned`] instead of consuming more
//! input. Errors produced by the exporter only abort that one export call.

use std::fmt;
use std::io;

/// Broad classification of a [`PickError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed markup reported by the tokenizer.
    Syntax,
    /// Structural validation performed by the tree builder.
    Structure,
    /// A configured resource cap was exceeded.
    Limit,
    /// An undeclared prefix was found while exporting.
    Namespace,
    /// The caller kept using a parser after it failed.
    Contract,
    /// Reading the source or writing the sink failed.
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax error"),
            Self::Structure => write!(f, "structure error"),
            Self::Limit => write!(f, "limit error"),
            Self::Namespace => write!(f, "namespace error"),
            Self::Contract => write!(f, "contract violation"),
            Self::Io => write!(f, "i/o error"),
        }
    }
}

/// The error type for every fallible operation in this crate.
#[derive(Debug)]
pub enum PickError {
    /// The tokenizer rejected the input.
    Xml(quick_xml::Error),
    /// A general entity other than the five predefined ones was referenced
    /// inside a retained subtree.
    UnknownEntity(String),
    /// Reading the source or writing the sink failed.
    Io(io::Error),
    /// An end tag was seen while no element was open.
    UnexpectedEndElement {
        /// Local name of the stray end tag.
        name: String,
    },
    /// An end tag's local name does not match the open element.
    MismatchedEndElement {
        /// Local name of the open element.
        start: String,
        /// Local name of the end tag.
        end: String,
    },
    /// An end tag's namespace does not match the open element.
    MismatchedEndNamespace {
        /// Local name of the open element.
        start: String,
        /// Namespace identifier of the open element.
        start_space: String,
        /// Local name of the end tag.
        end: String,
        /// Namespace identifier of the end tag.
        end_space: String,
    },
    /// The input ended while elements were still open.
    UnexpectedEof,
    /// The open-element depth exceeded the configured maximum.
    DepthLimit(usize),
    /// A single element received more children than the configured maximum.
    ChildLimit(usize),
    /// More tokens were read than the configured maximum.
    TokenLimit(u64),
    /// A prefix used by an exported element or attribute is not declared
    /// on the element or any of its ancestors.
    UndeclaredPrefix {
        /// The offending prefix.
        prefix: String,
        /// Slash-separated path of the element being exported.
        path: String,
    },
    /// The parser already failed and refuses to read further.
    Poisoned,
}

impl PickError {
    /// Returns the [`ErrorCategory`] this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Xml(_) | Self::UnknownEntity(_) => ErrorCategory::Syntax,
            Self::Io(_) => ErrorCategory::Io,
            Self::UnexpectedEndElement { .. }
            | Self::MismatchedEndElement { .. }
            | Self::MismatchedEndNamespace { .. }
            | Self::UnexpectedEof => ErrorCategory::Structure,
            Self::DepthLimit(_) | Self::ChildLimit(_) | Self::TokenLimit(_) => {
                ErrorCategory::Limit
            }
            Self::UndeclaredPrefix { .. } => ErrorCategory::Namespace,
            Self::Poisoned => ErrorCategory::Contract,
        }
    }

    /// Returns `true` if this error ends the whole stream rather than a
    /// single export call.
    #[must_use]
    pub fn is_fatal_for_stream(&self) -> bool {
        !matches!(self, Self::UndeclaredPrefix { .. })
    }
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml(e) => write!(f, "xml syntax error: {e}"),
            Self::UnknownEntity(name) => write!(f, "unknown entity &{name};"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::UnexpectedEndElement { name } => {
                write!(f, "unexpected end element </{name}>")
            }
            Self::MismatchedEndElement { start, end } => {
                write!(f, "element <{start}> closed by </{end}>")
            }
            Self::MismatchedEndNamespace {
                start,
                start_space,
                end,
                end_space,
            } => write!(
                f,
                "element <{start}> in space {start_space} closed by </{end}> in space {end_space}"
            ),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::DepthLimit(max) => write!(f, "depth limit reached {max}"),
            Self::ChildLimit(max) => write!(f, "maximum node child limit reached {max}"),
            Self::TokenLimit(max) => write!(f, "token limit reached {max}"),
            Self::UndeclaredPrefix { prefix, path } => {
                write!(f, "undeclared prefix {prefix} at {path}")
            }
            Self::Poisoned => write!(
                f,
                "parser will no longer consume tokens: called again after an error"
            ),
        }
    }
}

impl std::error::Error for PickError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Xml(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for PickError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e)
    }
}

impl From<quick_xml::events::attributes::AttrError> for PickError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(quick_xml::Error::from(e))
    }
}

impl From<quick_xml::encoding::EncodingError> for PickError {
    fn from(e: quick_xml::encoding::EncodingError) -> Self {
        Self::Xml(quick_xml::Error::from(e))
    }
}

impl From<io::Error> for PickError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shorthand for results produced by this crate.
pub type Result<T> = std::result::Result<T, PickError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_display() {
        let err = PickError::MismatchedEndNamespace {
            start: "a".to_string(),
            start_space: "x".to_string(),
            end: "a".to_string(),
            end_space: "y".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "element <a> in space x closed by </a> in space y"
        );
        assert_eq!(
            PickError::UnexpectedEndElement {
                name: "a".to_string()
            }
            .to_string(),
            "unexpected end element </a>"
        );
    }

    #[test]
    fn test_limit_errors_carry_limit() {
        assert_eq!(PickError::DepthLimit(3).to_string(), "depth limit reached 3");
        assert_eq!(
            PickError::ChildLimit(2).to_string(),
            "maximum node child limit reached 2"
        );
        assert_eq!(PickError::TokenLimit(9).to_string(), "token limit reached 9");
    }

    #[test]
    fn test_categories() {
        assert_eq!(PickError::UnexpectedEof.category(), ErrorCategory::Structure);
        assert_eq!(PickError::TokenLimit(1).category(), ErrorCategory::Limit);
        assert_eq!(PickError::Poisoned.category(), ErrorCategory::Contract);
        let undeclared = PickError::UndeclaredPrefix {
            prefix: "a".to_string(),
            path: "/a/b".to_string(),
        };
        assert_eq!(undeclared.category(), ErrorCategory::Namespace);
        assert!(!undeclared.is_fatal_for_stream());
        assert!(PickError::UnexpectedEof.is_fatal_for_stream());
    }

    #[test]
    fn test_io_error_has_source() {
        let err = PickError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.category(), ErrorCategory::Io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
