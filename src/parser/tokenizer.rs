//! Token stream over `quick-xml`.
//!
//! Wraps an [`NsReader`] and reduces its events to the handful of token
//! kinds the tree builder cares about. Character data, CDATA sections, and
//! references that follow each other are merged into a single
//! [`Token::Text`], so one run of text is one token no matter how it was
//! spelled in the source.

use std::collections::VecDeque;
use std::io::BufRead;

use quick_xml::encoding::Decoder;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, QName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::{PickError, Result};
use crate::tree::{Attribute, Name};

/// A start tag with declarations separated from ordinary attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTag {
    pub name: Name,
    pub attributes: Vec<Attribute>,
    /// `(prefix, uri)` for every `xmlns` / `xmlns:p` attribute.
    pub declarations: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Start(StartTag),
    End(Name),
    /// A merged run of character data. Empty when text was not requested.
    Text(String),
    Comment,
    ProcessingInstruction,
    Directive,
}

pub(crate) struct Tokenizer<R> {
    reader: NsReader<R>,
    /// Resolve prefixes to URIs (`true`) or keep them literally.
    resolve: bool,
    buf: Vec<u8>,
    /// Tokens read ahead while finishing a text run.
    queued: VecDeque<Token>,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(source: R, resolve: bool) -> Self {
        let mut reader = NsReader::from_reader(source);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        Self {
            reader,
            resolve,
            buf: Vec::new(),
            queued: VecDeque::new(),
        }
    }

    /// Returns the next token, or `None` at the end of the input.
    ///
    /// With `keep_text == false` text runs are still reported, but their
    /// content is neither decoded nor buffered.
    pub fn next_token(&mut self, keep_text: bool) -> Result<Option<Token>> {
        if let Some(token) = self.queued.pop_front() {
            return Ok(Some(token));
        }
        let mut text: Option<String> = None;
        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;
            let decoder = self.reader.decoder();
            let token = match event {
                Event::Text(t) => {
                    let run = text.get_or_insert_with(String::new);
                    if keep_text {
                        run.push_str(&t.decode().map_err(quick_xml::Error::from)?);
                    }
                    continue;
                }
                Event::CData(c) => {
                    let run = text.get_or_insert_with(String::new);
                    if keep_text {
                        run.push_str(&c.decode().map_err(quick_xml::Error::from)?);
                    }
                    continue;
                }
                Event::GeneralRef(r) => {
                    let run = text.get_or_insert_with(String::new);
                    if keep_text {
                        push_reference(run, &r)?;
                    }
                    continue;
                }
                Event::Start(e) => Token::Start(start_tag(&self.reader, decoder, self.resolve, &e)?),
                // not emitted while `expand_empty_elements` is set
                Event::Empty(e) => {
                    let start = start_tag(&self.reader, decoder, self.resolve, &e)?;
                    self.queued.push_back(Token::End(start.name.clone()));
                    Token::Start(start)
                }
                Event::End(e) => Token::End(element_name(&self.reader, decoder, self.resolve, e.name())?),
                Event::Comment(_) => Token::Comment,
                Event::PI(_) | Event::Decl(_) => Token::ProcessingInstruction,
                Event::DocType(_) => Token::Directive,
                Event::Eof => return Ok(text.map(Token::Text)),
            };
            return Ok(Some(match text {
                Some(run) => {
                    self.queued.push_front(token);
                    Token::Text(run)
                }
                None => token,
            }));
        }
    }
}

/// Appends the replacement text of a character or predefined entity
/// reference.
fn push_reference(run: &mut String, r: &BytesRef<'_>) -> Result<()> {
    if let Some(ch) = r.resolve_char_ref()? {
        run.push(ch);
        return Ok(());
    }
    let name = r.decode().map_err(quick_xml::Error::from)?;
    match resolve_predefined_entity(&name) {
        Some(replacement) => {
            run.push_str(replacement);
            Ok(())
        }
        None => Err(PickError::UnknownEntity(name.into_owned())),
    }
}

fn decode(decoder: Decoder, bytes: &[u8]) -> Result<String> {
    Ok(decoder
        .decode(bytes)
        .map_err(quick_xml::Error::from)?
        .into_owned())
}

fn start_tag<R>(
    reader: &NsReader<R>,
    decoder: Decoder,
    resolve: bool,
    e: &BytesStart<'_>,
) -> Result<StartTag> {
    let name = element_name(reader, decoder, resolve, e.name())?;
    let mut attributes = Vec::new();
    let mut declarations = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.decode_and_unescape_value(decoder)?.into_owned();
        if let Some(binding) = attr.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => String::new(),
                PrefixDeclaration::Named(p) => decode(decoder, p)?,
            };
            declarations.push((prefix, value));
            continue;
        }
        let name = if resolve {
            let (result, local) = reader.resolve_attribute(attr.key);
            Name::new(namespace_of(decoder, result)?, decode(decoder, local.into_inner())?)
        } else {
            raw_name(decoder, attr.key)?
        };
        attributes.push(Attribute { name, value });
    }
    Ok(StartTag {
        name,
        attributes,
        declarations,
    })
}

fn element_name<R>(
    reader: &NsReader<R>,
    decoder: Decoder,
    resolve: bool,
    qname: QName<'_>,
) -> Result<Name> {
    if !resolve {
        return raw_name(decoder, qname);
    }
    let (result, local) = reader.resolve_element(qname);
    Ok(Name::new(
        namespace_of(decoder, result)?,
        decode(decoder, local.into_inner())?,
    ))
}

/// Splits `prefix:local` without resolving the prefix.
fn raw_name(decoder: Decoder, qname: QName<'_>) -> Result<Name> {
    let space = match qname.prefix() {
        Some(prefix) => decode(decoder, prefix.into_inner())?,
        None => String::new(),
    };
    Ok(Name::new(space, decode(decoder, qname.local_name().into_inner())?))
}

/// Unbound prefixes keep their literal text as namespace identifier.
fn namespace_of(decoder: Decoder, result: ResolveResult<'_>) -> Result<String> {
    match result {
        ResolveResult::Bound(ns) => decode(decoder, ns.into_inner()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => decode(decoder, &prefix),
    }
}
