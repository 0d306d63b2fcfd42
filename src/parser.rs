//! Builds a document from a stream of tokens.
//!
//! ```
//! let package = domtree::parse("<hello planet='Earth'>world</hello>").expect("well-formed");
//! let doc = package.as_document();
//!
//! let hello = doc.root().expect("has a root");
//! assert_eq!(hello.attribute_value("planet"), Some("Earth"));
//! assert_eq!(hello.text(), "world");
//! ```

use std::io::{BufReader, Read};

use super::dom::{Document, Element, ParentOfChild};
use super::error::{Error, Malformed, ParseError};
use super::token::{Token, Tokenizer};
use super::{Package, QName};

/// Tracks the open element while tokens are attached to the tree.
struct TreeBuilder<'d> {
    document: Document<'d>,
    /// Closing this element (or the document, when `None`) is not allowed.
    floor: Option<Element<'d>>,
    cursor: Option<Element<'d>>,
}

impl<'d> TreeBuilder<'d> {
    fn new(document: Document<'d>) -> TreeBuilder<'d> {
        TreeBuilder {
            document,
            floor: None,
            cursor: None,
        }
    }

    /// Builds inside `element`, which stays open throughout.
    fn within(element: Element<'d>) -> TreeBuilder<'d> {
        TreeBuilder {
            document: element.document(),
            floor: Some(element),
            cursor: Some(element),
        }
    }

    fn consume<I>(&mut self, tokens: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Result<Token, Error>>,
    {
        for token in tokens {
            self.push(token?)?;
        }
        self.finish()
    }

    fn parent(&self) -> ParentOfChild<'d> {
        match self.cursor {
            Some(element) => ParentOfChild::Element(element),
            None => ParentOfChild::Document(self.document),
        }
    }

    fn push(&mut self, token: Token) -> Result<(), Error> {
        let doc = self.document;

        match token {
            Token::StartTag { name, attributes } => {
                if self.cursor.is_none() && doc.root().is_some() {
                    return Err(Error::MultipleRootElements);
                }

                let element = doc.create_element(QName::from_raw(&name));
                for (name, value) in &attributes {
                    element.set_attribute_value(QName::from_raw(name), value);
                }
                doc.attach(self.parent(), element.into());
                self.cursor = Some(element);
            }
            Token::EndTag { name } => {
                let open = match self.cursor {
                    Some(open) if self.cursor != self.floor => open,
                    _ => return Err(Malformed::UnexpectedEndTag(name).into()),
                };
                if open.name() != QName::from_raw(&name) {
                    return Err(Malformed::MismatchedEndTag {
                        expected: open.name().to_string(),
                        found: name,
                    }
                    .into());
                }
                self.cursor = open.parent().and_then(ParentOfChild::element);
            }
            Token::Text(text) => {
                doc.attach(self.parent(), doc.create_text(&text).into());
            }
            Token::Comment(text) => {
                doc.attach(self.parent(), doc.create_comment(&text).into());
            }
            Token::ProcessingInstruction { target, instruction } => {
                let pi = doc.create_processing_instruction(&target, &instruction);
                doc.attach(self.parent(), pi.into());
            }
            Token::Directive(text) => {
                doc.attach(self.parent(), doc.create_directive(&text).into());
            }
        }

        Ok(())
    }

    fn finish(&self) -> Result<(), Error> {
        match self.cursor {
            Some(open) if self.cursor != self.floor => {
                Err(Malformed::UnclosedElement(open.name().to_string()).into())
            }
            _ => Ok(()),
        }
    }
}

/// Builds a new document from `tokens`. On failure the document built
/// so far is returned alongside the error.
pub fn parse_tokens<I>(tokens: I) -> Result<Package, ParseError>
where
    I: IntoIterator<Item = Result<Token, Error>>,
{
    let package = Package::new();
    let result = TreeBuilder::new(package.as_document()).consume(tokens);

    match result {
        Ok(()) => Ok(package),
        Err(error) => Err(ParseError { error, partial: package }),
    }
}

pub fn parse(xml: &str) -> Result<Package, ParseError> {
    parse_bytes(xml.as_bytes())
}

pub fn parse_bytes(xml: &[u8]) -> Result<Package, ParseError> {
    parse_tokens(Tokenizer::new(xml))
}

pub fn parse_reader<R: Read>(reader: R) -> Result<Package, ParseError> {
    parse_tokens(Tokenizer::new(BufReader::new(reader)))
}

/// Parses element content. The returned document's root is a holder
/// element whose children are the parsed nodes.
pub(crate) fn parse_fragment(xml: &[u8]) -> Result<Package, ParseError> {
    let package = Package::with_root("fragment");
    let result = match package.as_document().root() {
        Some(holder) => TreeBuilder::within(holder).consume(Tokenizer::new(xml)),
        None => Ok(()),
    };

    match result {
        Ok(()) => Ok(package),
        Err(error) => Err(ParseError { error, partial: package }),
    }
}
