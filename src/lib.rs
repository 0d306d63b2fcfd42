//! A mutable XML document tree that round-trips through text.
//!
//! ```
//! use domtree::Package;
//!
//! let package = Package::with_root("hello");
//! let doc = package.as_document();
//! let hello = doc.root().expect("created with a root");
//!
//! hello.set_attribute_value("planet", "Earth");
//! hello.append_child(doc.create_comment("What about other planets?")).unwrap();
//! hello.append_text("Greetings, ");
//! hello.append_text("Earthlings!");
//!
//! assert_eq!(
//!     domtree::writer::to_string(doc),
//!     r#"<hello planet="Earth"><!--What about other planets?-->Greetings, Earthlings!</hello>"#
//! );
//! ```
//!
//! ### Design decisions
//!
//! Every node lives in arena storage owned by a `Package`; the handles
//! returned by a `Document` are small `Copy` values that borrow the
//! package, so they can never outlive it. Detaching a node only unlinks
//! it: its storage is reclaimed when the package is dropped.
//!
//! Nodes are never shared between two parents. Adding a node anywhere
//! inserts a deep copy and returns a handle to what was actually
//! attached. Adjacent text is always merged into a single text node.

use std::fmt;

mod raw;
mod sibling_list;
mod string_pool;

pub mod dom;
pub mod error;
pub mod parser;
pub mod pretty;
pub mod token;
pub mod writer;

pub use crate::error::{Error, Malformed, ParseError};
pub use crate::parser::{parse, parse_bytes, parse_reader};

/// A raw qualified name: a prefix (the "space") and a local part.
///
/// Prefixes are never resolved to namespace URIs; two names are equal
/// exactly when both parts are equal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QName<'s> {
    space: &'s str,
    local_part: &'s str,
}

impl<'s> QName<'s> {
    pub fn new(local_part: &'s str) -> QName<'s> {
        QName::with_space("", local_part)
    }

    pub fn with_space(space: &'s str, local_part: &'s str) -> QName<'s> {
        QName { space, local_part }
    }

    /// Splits a name as written in markup. `a:b` has the space `a`; a
    /// colon at either end is kept as part of the local name.
    pub fn from_raw(raw: &'s str) -> QName<'s> {
        match raw.find(':') {
            Some(i) if i > 0 && i + 1 < raw.len() => QName::with_space(&raw[..i], &raw[i + 1..]),
            _ => QName::new(raw),
        }
    }

    /// The prefix, empty when the name is unprefixed.
    pub fn space(&self) -> &'s str {
        self.space
    }

    pub fn local_part(&self) -> &'s str {
        self.local_part
    }
}

impl<'s> From<&'s str> for QName<'s> {
    fn from(local_part: &'s str) -> QName<'s> {
        QName::new(local_part)
    }
}

impl<'s> From<(&'s str, &'s str)> for QName<'s> {
    fn from(v: (&'s str, &'s str)) -> QName<'s> {
        QName::with_space(v.0, v.1)
    }
}

impl<'s> fmt::Display for QName<'s> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.space.is_empty() {
            write!(f, "{}:", self.space)?;
        }
        f.write_str(self.local_part)
    }
}

/// Owns the storage for one document and every node created for it.
pub struct Package {
    storage: raw::Storage,
    connections: raw::Connections,
}

impl Package {
    /// An empty document with no root element.
    pub fn new() -> Package {
        let storage = raw::Storage::new();
        let document = storage.create_document();
        Package {
            storage,
            connections: raw::Connections::new(document),
        }
    }

    /// A document holding a single, empty root element.
    pub fn with_root<'n, N>(name: N) -> Package
    where
        N: Into<QName<'n>>,
    {
        let package = Package::new();
        {
            let doc = package.as_document();
            let root = doc.create_element(name);
            doc.attach(dom::ParentOfChild::Document(doc), root.into());
        }
        package
    }

    pub fn as_document(&self) -> dom::Document<'_> {
        dom::Document::new(&self.storage, &self.connections)
    }
}

impl Default for Package {
    fn default() -> Package {
        Package::new()
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Package) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Package")
    }
}

#[cfg(feature = "__internal_expose_string_pool")]
#[doc(hidden)]
pub mod __internal {
    pub use crate::string_pool::{StringPool, TextBuffer};
}
