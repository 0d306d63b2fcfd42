//! Errors raised while building or editing a document.

use std::{error, fmt};

use super::Package;

/// Input that could not be turned into a tree.
#[derive(Debug)]
pub enum Malformed {
    /// The tokenizer rejected the input.
    Syntax(quick_xml::Error),
    /// A closing tag appeared with no element open.
    UnexpectedEndTag(String),
    MismatchedEndTag { expected: String, found: String },
    /// The input ended while this element was still open.
    UnclosedElement(String),
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Malformed::Syntax(ref e) => write!(f, "{}", e),
            Malformed::UnexpectedEndTag(ref name) => {
                write!(f, "closing tag </{}> has no matching opening tag", name)
            }
            Malformed::MismatchedEndTag { ref expected, ref found } => {
                write!(f, "expected closing tag </{}>, found </{}>", expected, found)
            }
            Malformed::UnclosedElement(ref name) => {
                write!(f, "input ended before <{}> was closed", name)
            }
        }
    }
}

#[derive(Debug)]
pub enum Error {
    MalformedInput(Malformed),
    /// A document may hold only one element at its top level.
    MultipleRootElements,
    /// The value cannot be placed in a list of children.
    InvalidNodeKind,
    /// The container does not accept this kind of child here.
    KindNotAllowed,
    /// The reference node is not a child of the container it was used with.
    ReferenceNotAChild,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MalformedInput(ref e) => write!(f, "malformed input: {}", e),
            Error::MultipleRootElements => f.write_str("document already has a root element"),
            Error::InvalidNodeKind => f.write_str("node cannot be a child"),
            Error::KindNotAllowed => f.write_str("node kind is not allowed in this position"),
            Error::ReferenceNotAChild => f.write_str("reference node is not a child of this container"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::MalformedInput(Malformed::Syntax(ref e)) => Some(e),
            _ => None,
        }
    }
}

impl From<Malformed> for Error {
    fn from(e: Malformed) -> Error {
        Error::MalformedInput(e)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Error {
        Error::MalformedInput(Malformed::Syntax(e))
    }
}

/// A failed parse, along with everything that was built before the
/// failure.
pub struct ParseError {
    pub error: Error,
    pub partial: Package,
}

impl ParseError {
    pub fn into_inner(self) -> (Error, Package) {
        (self.error, self.partial)
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ParseError")
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl error::Error for ParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        error::Error::source(&self.error)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Error {
        e.error
    }
}

#[cfg(test)]
mod test {
    use super::{Error, Malformed};

    #[test]
    fn messages_name_the_offending_tags() {
        let e = Error::from(Malformed::MismatchedEndTag {
            expected: "a".to_owned(),
            found: "b".to_owned(),
        });

        assert_eq!(e.to_string(), "malformed input: expected closing tag </a>, found </b>");
    }

    #[test]
    fn structural_errors_have_no_source() {
        use std::error::Error as _;

        assert!(Error::MultipleRootElements.source().is_none());
        assert!(Error::from(Malformed::UnclosedElement("a".to_owned())).source().is_none());
    }
}
