//! A traditional DOM tree interface for navigating and manipulating
//! XML documents.
//!
//! Adding a node anywhere inserts a deep copy of it; the returned handle
//! refers to whatever actually ended up in the tree, which for text may
//! be an existing neighbour that absorbed the new content.

use std::convert::TryFrom;
use std::{fmt, hash};

use super::error::Error;
use super::parser;
use super::raw;
use super::sibling_list::Position;
use super::QName;

/// An XML document
#[derive(Copy, Clone)]
pub struct Document<'d> {
    storage: &'d raw::Storage,
    connections: &'d raw::Connections,
}

macro_rules! wrapper(
    ($name:ident, $wrapper:ident, $inner:ty) => (
        fn $name(self, node: *mut $inner) -> $wrapper<'d> {
            $wrapper {
                document: self,
                node,
            }
        }
    )
);

impl<'d> Document<'d> {
    wrapper!(wrap_element, Element, raw::Element);
    wrapper!(wrap_attribute, Attribute, raw::Attribute);
    wrapper!(wrap_text, Text, raw::Text);
    wrapper!(wrap_comment, Comment, raw::Comment);
    wrapper!(wrap_pi, ProcessingInstruction, raw::ProcessingInstruction);
    wrapper!(wrap_directive, Directive, raw::Directive);

    #[doc(hidden)]
    pub fn new(storage: &'d raw::Storage, connections: &'d raw::Connections) -> Document<'d> {
        Document {
            storage,
            connections,
        }
    }

    fn as_raw_parent(self) -> raw::Parent {
        raw::Parent::Document(self.connections.document())
    }

    fn wrap_parent(self, node: raw::Parent) -> ParentOfChild<'d> {
        match node {
            raw::Parent::Document(_) => ParentOfChild::Document(self),
            raw::Parent::Element(n) => ParentOfChild::Element(self.wrap_element(n)),
        }
    }

    fn wrap_child(self, node: raw::Child) -> Child<'d> {
        match node {
            raw::Child::Element(n) => Child::Element(self.wrap_element(n)),
            raw::Child::Text(n) => Child::Text(self.wrap_text(n)),
            raw::Child::Comment(n) => Child::Comment(self.wrap_comment(n)),
            raw::Child::ProcessingInstruction(n) => Child::ProcessingInstruction(self.wrap_pi(n)),
            raw::Child::Directive(n) => Child::Directive(self.wrap_directive(n)),
        }
    }

    fn wrap_children(self, nodes: Vec<raw::Child>) -> Vec<Child<'d>> {
        nodes.into_iter().map(|n| self.wrap_child(n)).collect()
    }

    /// The single top-level element, if there is one.
    pub fn root(self) -> Option<Element<'d>> {
        self.connections.root_element().map(|n| self.wrap_element(n))
    }

    /// Installs a copy of `element` as the root. An existing root is
    /// detached and the copy takes its place among the top-level
    /// children.
    pub fn set_root<'s>(self, element: Element<'s>) -> Element<'d> {
        let copy = self.connections.copy_element(self.storage, element.node);
        self.connections.replace_root_element(copy);
        self.wrap_element(copy)
    }

    pub fn create_element<'n, N>(self, name: N) -> Element<'d>
    where
        N: Into<QName<'n>>,
    {
        self.wrap_element(self.storage.create_element(name))
    }

    pub fn create_text(self, text: &str) -> Text<'d> {
        self.wrap_text(self.storage.create_text(text))
    }

    pub fn create_comment(self, text: &str) -> Comment<'d> {
        self.wrap_comment(self.storage.create_comment(text))
    }

    pub fn create_processing_instruction(self, target: &str, instruction: &str) -> ProcessingInstruction<'d> {
        self.wrap_pi(self.storage.create_processing_instruction(target, instruction))
    }

    pub fn create_directive(self, text: &str) -> Directive<'d> {
        self.wrap_directive(self.storage.create_directive(text))
    }

    /// Appends a copy of `node` at the top level. An element becomes
    /// the root, which fails when there already is one.
    pub fn append_child<'s, N>(self, node: N) -> Result<Child<'d>, Error>
    where
        N: Into<Node<'s>>,
    {
        let child = Child::try_from(node.into())?;
        if child.element().is_some() && self.root().is_some() {
            return Err(Error::MultipleRootElements);
        }
        Ok(self.append_copy(self.as_raw_parent(), child))
    }

    pub fn append_children<'s, I>(self, children: I) -> Result<(), Error>
    where
        I: IntoIterator,
        I::Item: Into<Node<'s>>,
    {
        for c in children {
            self.append_child(c)?;
        }
        Ok(())
    }

    /// Elements can only enter the top level through `set_root` or
    /// `append_child`.
    pub fn insert_before<'s, N, R>(self, node: N, reference: R) -> Result<Child<'d>, Error>
    where
        N: Into<Node<'s>>,
        R: Into<Child<'d>>,
    {
        let child = Child::try_from(node.into())?;
        if child.element().is_some() {
            return Err(Error::KindNotAllowed);
        }
        self.insert_copy(self.as_raw_parent(), child, reference.into(), Side::Before)
    }

    pub fn insert_after<'s, N, R>(self, node: N, reference: R) -> Result<Child<'d>, Error>
    where
        N: Into<Node<'s>>,
        R: Into<Child<'d>>,
    {
        let child = Child::try_from(node.into())?;
        if child.element().is_some() {
            return Err(Error::KindNotAllowed);
        }
        self.insert_copy(self.as_raw_parent(), child, reference.into(), Side::After)
    }

    /// Detaches `child` if it is a top-level node of this document.
    pub fn remove_child<C>(self, child: C)
    where
        C: Into<Child<'d>>,
    {
        self.remove_from(self.as_raw_parent(), child.into());
    }

    pub fn clear_children(self) {
        self.connections.clear_children(self.as_raw_parent());
    }

    pub fn children(self) -> Vec<Child<'d>> {
        self.wrap_children(self.connections.children(self.as_raw_parent()))
    }

    pub fn iter_children(self) -> ChildIter<'d> {
        ChildIter::new(self, self.as_raw_parent())
    }

    pub fn children_of_type<T>(self) -> Vec<T>
    where
        T: ChildKind<'d>,
    {
        self.iter_children().filter_map(T::from_child).collect()
    }

    pub fn remove_children_of_type<T>(self)
    where
        T: ChildKind<'d>,
    {
        remove_matching(self.iter_children(), |c| T::from_child(c).is_some());
    }

    /// The top-level text, concatenated.
    pub fn text(self) -> String {
        joined_text(self.iter_children(), |t| t)
    }

    /// The top-level text with each node trimmed before joining.
    pub fn trimmed_text(self) -> String {
        joined_text(self.iter_children(), str::trim)
    }

    pub(crate) fn attach(self, parent: ParentOfChild<'d>, child: Child<'d>) -> Child<'d> {
        let parent = parent.as_raw();
        self.wrap_child(self.connections.append_child(self.storage, parent, child.as_raw()))
    }

    pub(crate) fn insert_text_before(self, reference: Child<'d>, text: &str) {
        let text = raw::Child::Text(self.storage.create_text(text));
        self.connections.insert_before(self.storage, reference.as_raw(), text);
    }

    fn append_copy(self, parent: raw::Parent, child: Child) -> Child<'d> {
        let copy = self.connections.copy_child(self.storage, child.as_raw());
        self.wrap_child(self.connections.append_child(self.storage, parent, copy))
    }

    fn insert_copy(self, parent: raw::Parent, child: Child, reference: Child<'d>, side: Side) -> Result<Child<'d>, Error> {
        let reference = reference.as_raw();
        if self.connections.parent(reference) != Some(parent) {
            return Err(Error::ReferenceNotAChild);
        }

        let copy = self.connections.copy_child(self.storage, child.as_raw());
        let inserted = match side {
            Side::Before => self.connections.insert_before(self.storage, reference, copy),
            Side::After => self.connections.insert_after(self.storage, reference, copy),
        };
        inserted
            .map(|c| self.wrap_child(c))
            .ok_or(Error::ReferenceNotAChild)
    }

    fn remove_from(self, parent: raw::Parent, child: Child<'d>) {
        let child = child.as_raw();
        if self.connections.parent(child) == Some(parent) {
            self.connections.remove_child(self.storage, child);
        }
    }
}

#[derive(Copy, Clone)]
enum Side {
    Before,
    After,
}

fn remove_matching<'d, F>(children: ChildIter<'d>, matches: F)
where
    F: Fn(Child<'d>) -> bool,
{
    for child in children {
        if matches(child) {
            child.remove_from_parent();
        }
    }
}

fn joined_text<'d, F>(children: ChildIter<'d>, each: F) -> String
where
    F: Fn(&'d str) -> &'d str,
{
    children
        .filter_map(Child::text)
        .map(|t| each(t.text()))
        .collect()
}

impl<'d> PartialEq for Document<'d> {
    fn eq(&self, other: &Document<'d>) -> bool {
        (self.storage as *const raw::Storage, self.connections as *const raw::Connections)
            == (other.storage as *const raw::Storage, other.connections as *const raw::Connections)
    }
}

impl<'d> fmt::Debug for Document<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Document {{ {:?} }}", self.connections.document())
    }
}

macro_rules! node(
    ($name:ident, $raw:ty, $doc:expr) => (
        #[doc = $doc]
        #[derive(Copy, Clone)]
        pub struct $name<'d> {
            document: Document<'d>,
            node: *mut $raw,
        }

        impl<'d> $name<'d> {
            #[allow(dead_code)]
            fn node(&self) -> &'d $raw { unsafe { &*self.node } }

            pub fn document(&self) -> Document<'d> { self.document }
        }

        impl<'d> PartialEq for $name<'d> {
            fn eq(&self, other: &$name<'d>) -> bool {
                self.node == other.node
            }
        }

        impl<'d> Eq for $name<'d> {}

        impl<'d> hash::Hash for $name<'d> {
            fn hash<H>(&self, state: &mut H)
            where
                H: hash::Hasher,
            {
                self.node.hash(state)
            }
        }
    )
);

/// Operations shared by every node that can sit in a list of children.
macro_rules! child_methods(
    ($variant:ident) => (
        fn as_raw_child(&self) -> raw::Child {
            raw::Child::$variant(self.node)
        }

        pub fn parent(&self) -> Option<ParentOfChild<'d>> {
            self.document.connections.parent(self.as_raw_child()).map(|n| {
                self.document.wrap_parent(n)
            })
        }

        pub fn remove_from_parent(&self) {
            self.document.connections.remove_child(self.document.storage, self.as_raw_child());
        }

        /// Earlier siblings, in document order.
        pub fn preceding_siblings(&self) -> Vec<Child<'d>> {
            let siblings = self.document.connections.preceding_siblings(self.as_raw_child());
            self.document.wrap_children(siblings)
        }

        pub fn following_siblings(&self) -> Vec<Child<'d>> {
            let siblings = self.document.connections.following_siblings(self.as_raw_child());
            self.document.wrap_children(siblings)
        }
    )
);

node!(
    Element, raw::Element,
    "Elements are the workhorse of a document and may contain any type of
    node, except for the Document itself"
);

impl<'d> Element<'d> {
    child_methods!(Element);

    fn as_raw_parent(&self) -> raw::Parent {
        raw::Parent::Element(self.node)
    }

    pub fn name(&self) -> QName<'d> {
        self.node().name()
    }

    pub fn set_name<'n, N>(&self, name: N)
    where
        N: Into<QName<'n>>,
    {
        self.document.storage.element_set_name(self.node, name)
    }

    /// A detached deep copy in the same document.
    pub fn copy(&self) -> Element<'d> {
        let copy = self.document.connections.copy_element(self.document.storage, self.node);
        self.document.wrap_element(copy)
    }

    /// Appends a copy of `node`. Text following text is merged into it.
    pub fn append_child<'s, N>(&self, node: N) -> Result<Child<'d>, Error>
    where
        N: Into<Node<'s>>,
    {
        let child = Child::try_from(node.into())?;
        Ok(self.document.append_copy(self.as_raw_parent(), child))
    }

    pub fn append_children<'s, I>(&self, children: I) -> Result<(), Error>
    where
        I: IntoIterator,
        I::Item: Into<Node<'s>>,
    {
        for c in children {
            self.append_child(c)?;
        }
        Ok(())
    }

    pub fn append_text(&self, text: &str) -> Text<'d> {
        let text = self.document.storage.create_text(text);
        let appended = self
            .document
            .connections
            .append_child(self.document.storage, self.as_raw_parent(), raw::Child::Text(text));
        match appended {
            raw::Child::Text(merged) => self.document.wrap_text(merged),
            _ => self.document.wrap_text(text),
        }
    }

    pub fn append_element<'n, N>(&self, name: N) -> Element<'d>
    where
        N: Into<QName<'n>>,
    {
        let element = self.document.storage.create_element(name);
        self.document
            .connections
            .append_child(self.document.storage, self.as_raw_parent(), raw::Child::Element(element));
        self.document.wrap_element(element)
    }

    /// Parses `xml` as element content and appends the resulting nodes.
    /// Nothing is appended when the fragment is malformed.
    pub fn append_unparsed(&self, xml: &str) -> Result<(), Error> {
        self.append_unparsed_bytes(xml.as_bytes())
    }

    pub fn append_unparsed_bytes(&self, xml: &[u8]) -> Result<(), Error> {
        let fragment = parser::parse_fragment(xml)?;
        let doc = fragment.as_document();

        if let Some(holder) = doc.root() {
            for child in holder.iter_children() {
                self.append_child(child)?;
            }
        }
        Ok(())
    }

    pub fn insert_before<'s, N, R>(&self, node: N, reference: R) -> Result<Child<'d>, Error>
    where
        N: Into<Node<'s>>,
        R: Into<Child<'d>>,
    {
        let child = Child::try_from(node.into())?;
        self.document.insert_copy(self.as_raw_parent(), child, reference.into(), Side::Before)
    }

    pub fn insert_after<'s, N, R>(&self, node: N, reference: R) -> Result<Child<'d>, Error>
    where
        N: Into<Node<'s>>,
        R: Into<Child<'d>>,
    {
        let child = Child::try_from(node.into())?;
        self.document.insert_copy(self.as_raw_parent(), child, reference.into(), Side::After)
    }

    /// Detaches `child` if it belongs to this element.
    pub fn remove_child<C>(&self, child: C)
    where
        C: Into<Child<'d>>,
    {
        self.document.remove_from(self.as_raw_parent(), child.into());
    }

    pub fn clear_children(&self) {
        self.document.connections.clear_children(self.as_raw_parent());
    }

    pub fn children(&self) -> Vec<Child<'d>> {
        self.document.wrap_children(self.document.connections.children(self.as_raw_parent()))
    }

    pub fn iter_children(&self) -> ChildIter<'d> {
        ChildIter::new(self.document, self.as_raw_parent())
    }

    pub fn children_of_type<T>(&self) -> Vec<T>
    where
        T: ChildKind<'d>,
    {
        self.iter_children().filter_map(T::from_child).collect()
    }

    /// Child elements with exactly this name.
    pub fn elements_named<'n, N>(&self, name: N) -> Vec<Element<'d>>
    where
        N: Into<QName<'n>>,
    {
        let name = name.into();
        self.iter_children()
            .filter_map(Child::element)
            .filter(|e| e.name() == name)
            .collect()
    }

    pub fn remove_elements_named<'n, N>(&self, name: N)
    where
        N: Into<QName<'n>>,
    {
        let name = name.into();
        remove_matching(self.iter_children(), |c| c.element().map_or(false, |e| e.name() == name));
    }

    pub fn remove_children_of_type<T>(&self)
    where
        T: ChildKind<'d>,
    {
        remove_matching(self.iter_children(), |c| T::from_child(c).is_some());
    }

    /// The direct text children, concatenated.
    pub fn text(&self) -> String {
        joined_text(self.iter_children(), |t| t)
    }

    /// The direct text children, each trimmed, concatenated.
    pub fn trimmed_text(&self) -> String {
        joined_text(self.iter_children(), str::trim)
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&self, text: &str) -> Text<'d> {
        self.clear_children();
        self.append_text(text)
    }

    pub fn attribute<'n, N>(&self, name: N) -> Option<Attribute<'d>>
    where
        N: Into<QName<'n>>,
    {
        self.document.connections.attribute(self.node, name).map(|n| {
            self.document.wrap_attribute(n)
        })
    }

    pub fn attributes(&self) -> Vec<Attribute<'d>> {
        self.document
            .connections
            .attributes(self.node)
            .into_iter()
            .map(|n| self.document.wrap_attribute(n))
            .collect()
    }

    /// Updates the value in place if the attribute exists, otherwise
    /// adds it after the existing attributes.
    pub fn set_attribute_value<'n, N>(&self, name: N, value: &str) -> Attribute<'d>
    where
        N: Into<QName<'n>>,
    {
        let attr = self.document.connections.set_attribute(self.document.storage, self.node, name, value);
        self.document.wrap_attribute(attr)
    }

    pub fn attribute_value<'n, N>(&self, name: N) -> Option<&'d str>
    where
        N: Into<QName<'n>>,
    {
        self.attribute(name).map(|a| a.value())
    }

    /// Removes the attribute with exactly this name, returning its value.
    pub fn remove_attribute<'n, N>(&self, name: N) -> Option<&'d str>
    where
        N: Into<QName<'n>>,
    {
        self.document.connections.remove_attribute(self.node, name).map(|n| {
            self.document.wrap_attribute(n).value()
        })
    }
}

impl<'d> fmt::Debug for Element<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Element {{ name: {:?} }}", self.name())
    }
}

node!(
    Attribute, raw::Attribute,
    "Metadata about the current element"
);

impl<'d> Attribute<'d> {
    pub fn name(&self) -> QName<'d> { self.node().name() }
    pub fn value(&self) -> &'d str { self.node().value() }

    pub fn parent(&self) -> Option<Element<'d>> {
        self.document.connections.attribute_parent(self.node).map(|n| {
            self.document.wrap_element(n)
        })
    }

    pub fn remove_from_parent(&self) {
        self.document.connections.remove_attribute_from_parent(self.node);
    }
}

impl<'d> fmt::Debug for Attribute<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Attribute {{ name: {:?}, value: {:?} }}", self.name(), self.value())
    }
}

node!(
    Text, raw::Text,
    "Textual data"
);

impl<'d> Text<'d> {
    child_methods!(Text);

    pub fn text(&self) -> &'d str { self.node().text() }

    pub fn set_text(&self, text: &str) {
        self.document.storage.text_set_text(self.node, text)
    }

    pub fn copy(&self) -> Text<'d> {
        self.document.create_text(self.text())
    }
}

impl<'d> fmt::Debug for Text<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Text {{ text: {:?} }}", self.text())
    }
}

node!(
    Comment, raw::Comment,
    "Information only relevant to humans"
);

impl<'d> Comment<'d> {
    child_methods!(Comment);

    pub fn text(&self) -> &'d str { self.node().text() }

    pub fn set_text(&self, new_text: &str) {
        self.document.storage.comment_set_text(self.node, new_text)
    }

    pub fn copy(&self) -> Comment<'d> {
        self.document.create_comment(self.text())
    }
}

impl<'d> fmt::Debug for Comment<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Comment {{ text: {:?} }}", self.text())
    }
}

node!(
    ProcessingInstruction, raw::ProcessingInstruction,
    "Metadata relevant to the application, but not the XML processor or humans"
);

impl<'d> ProcessingInstruction<'d> {
    child_methods!(ProcessingInstruction);

    pub fn target(&self) -> &'d str { self.node().target() }
    pub fn instruction(&self) -> &'d str { self.node().instruction() }

    pub fn set_target(&self, new_target: &str) {
        self.document.storage.processing_instruction_set_target(self.node, new_target);
    }

    pub fn set_instruction(&self, new_instruction: &str) {
        self.document.storage.processing_instruction_set_instruction(self.node, new_instruction);
    }

    pub fn copy(&self) -> ProcessingInstruction<'d> {
        self.document.create_processing_instruction(self.target(), self.instruction())
    }
}

impl<'d> fmt::Debug for ProcessingInstruction<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ProcessingInstruction {{ target: {:?}, instruction: {:?} }}", self.target(), self.instruction())
    }
}

node!(
    Directive, raw::Directive,
    "Markup declarations such as a DOCTYPE, kept verbatim"
);

impl<'d> Directive<'d> {
    child_methods!(Directive);

    pub fn text(&self) -> &'d str { self.node().text() }

    pub fn set_text(&self, new_text: &str) {
        self.document.storage.directive_set_text(self.node, new_text)
    }

    pub fn copy(&self) -> Directive<'d> {
        self.document.create_directive(self.text())
    }
}

impl<'d> fmt::Debug for Directive<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Directive {{ text: {:?} }}", self.text())
    }
}

/// Iterates over the children of a document or element.
///
/// The following sibling is looked up before each child is yielded, so
/// the yielded child may be removed during iteration. Iteration stops
/// early if that following sibling is itself removed.
pub struct ChildIter<'d> {
    document: Document<'d>,
    parent: raw::Parent,
    next: Option<Position>,
}

impl<'d> ChildIter<'d> {
    fn new(document: Document<'d>, parent: raw::Parent) -> ChildIter<'d> {
        ChildIter {
            document,
            parent,
            next: document.connections.first_position(parent),
        }
    }
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = Child<'d>;

    fn next(&mut self) -> Option<Child<'d>> {
        let position = self.next.take()?;
        let (child, next) = self.document.connections.child_at(self.parent, position)?;
        self.next = next;
        Some(self.document.wrap_child(child))
    }
}

macro_rules! unpack(
    ($enum_name:ident, $name:ident, $wrapper:ident, $inner:ident) => (
        pub fn $name(self) -> Option<$inner<'d>> {
            match self {
                $enum_name::$wrapper(n) => Some(n),
                _ => None,
            }
        }
    )
);

/// Any node in a document
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Node<'d> {
    Document(Document<'d>),
    Element(Element<'d>),
    Attribute(Attribute<'d>),
    Text(Text<'d>),
    Comment(Comment<'d>),
    ProcessingInstruction(ProcessingInstruction<'d>),
    Directive(Directive<'d>),
}

impl<'d> Node<'d> {
    unpack!(Node, document, Document, Document);
    unpack!(Node, element, Element, Element);
    unpack!(Node, attribute, Attribute, Attribute);
    unpack!(Node, text, Text, Text);
    unpack!(Node, comment, Comment, Comment);
    unpack!(Node, processing_instruction, ProcessingInstruction, ProcessingInstruction);
    unpack!(Node, directive, Directive, Directive);
}

/// Nodes that may occur in a list of children
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Child<'d> {
    Element(Element<'d>),
    Text(Text<'d>),
    Comment(Comment<'d>),
    ProcessingInstruction(ProcessingInstruction<'d>),
    Directive(Directive<'d>),
}

impl<'d> Child<'d> {
    unpack!(Child, element, Element, Element);
    unpack!(Child, text, Text, Text);
    unpack!(Child, comment, Comment, Comment);
    unpack!(Child, processing_instruction, ProcessingInstruction, ProcessingInstruction);
    unpack!(Child, directive, Directive, Directive);

    fn as_raw(&self) -> raw::Child {
        match *self {
            Child::Element(n) => n.as_raw_child(),
            Child::Text(n) => n.as_raw_child(),
            Child::Comment(n) => n.as_raw_child(),
            Child::ProcessingInstruction(n) => n.as_raw_child(),
            Child::Directive(n) => n.as_raw_child(),
        }
    }

    fn document(&self) -> Document<'d> {
        match *self {
            Child::Element(n) => n.document,
            Child::Text(n) => n.document,
            Child::Comment(n) => n.document,
            Child::ProcessingInstruction(n) => n.document,
            Child::Directive(n) => n.document,
        }
    }

    pub fn parent(&self) -> Option<ParentOfChild<'d>> {
        let document = self.document();
        document.connections.parent(self.as_raw()).map(|n| document.wrap_parent(n))
    }

    pub fn remove_from_parent(&self) {
        let document = self.document();
        document.connections.remove_child(document.storage, self.as_raw());
    }

    /// A detached deep copy in the same document.
    pub fn copy(&self) -> Child<'d> {
        let document = self.document();
        document.wrap_child(document.connections.copy_child(document.storage, self.as_raw()))
    }
}

/// Nodes that may be the parent of a child node
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParentOfChild<'d> {
    Document(Document<'d>),
    Element(Element<'d>),
}

impl<'d> ParentOfChild<'d> {
    unpack!(ParentOfChild, document, Document, Document);
    unpack!(ParentOfChild, element, Element, Element);

    fn as_raw(&self) -> raw::Parent {
        match *self {
            ParentOfChild::Document(n) => n.as_raw_parent(),
            ParentOfChild::Element(n) => n.as_raw_parent(),
        }
    }

    pub fn children(&self) -> Vec<Child<'d>> {
        match *self {
            ParentOfChild::Document(n) => n.children(),
            ParentOfChild::Element(n) => n.children(),
        }
    }
}

/// A kind of node that can be picked out of a list of children.
pub trait ChildKind<'d>: Copy {
    fn from_child(child: Child<'d>) -> Option<Self>;
}

impl<'d> ChildKind<'d> for Child<'d> {
    fn from_child(child: Child<'d>) -> Option<Child<'d>> {
        Some(child)
    }
}

macro_rules! child_kind(
    ($($kind:ident),*) => (
        $(impl<'d> ChildKind<'d> for $kind<'d> {
            fn from_child(child: Child<'d>) -> Option<$kind<'d>> {
                match child {
                    Child::$kind(n) => Some(n),
                    _ => None,
                }
            }
        })*
    )
);

child_kind!(Element, Text, Comment, ProcessingInstruction, Directive);

macro_rules! conversion_trait(
    ($res_type:ident, {
        $($leaf_type:ident => $variant:expr),*
    }) => (
        $(impl<'d> From<$leaf_type<'d>> for $res_type<'d> {
            fn from(v: $leaf_type<'d>) -> $res_type<'d> {
                $variant(v)
            }
        })*

        $(impl<'a, 'd> From<&'a $leaf_type<'d>> for $res_type<'d> {
            fn from(v: &'a $leaf_type<'d>) -> $res_type<'d> {
                $variant(*v)
            }
        })*
    )
);

conversion_trait!(
    Node, {
        Document              => Node::Document,
        Element               => Node::Element,
        Attribute             => Node::Attribute,
        Text                  => Node::Text,
        Comment               => Node::Comment,
        ProcessingInstruction => Node::ProcessingInstruction,
        Directive             => Node::Directive
    }
);

conversion_trait!(
    Child, {
        Element               => Child::Element,
        Text                  => Child::Text,
        Comment               => Child::Comment,
        ProcessingInstruction => Child::ProcessingInstruction,
        Directive             => Child::Directive
    }
);

conversion_trait!(
    ParentOfChild, {
        Document => ParentOfChild::Document,
        Element  => ParentOfChild::Element
    }
);

impl<'d> From<Child<'d>> for Node<'d> {
    fn from(v: Child<'d>) -> Node<'d> {
        match v {
            Child::Element(n) => Node::Element(n),
            Child::Text(n) => Node::Text(n),
            Child::Comment(n) => Node::Comment(n),
            Child::ProcessingInstruction(n) => Node::ProcessingInstruction(n),
            Child::Directive(n) => Node::Directive(n),
        }
    }
}

impl<'a, 'd> From<&'a Child<'d>> for Node<'d> {
    fn from(v: &'a Child<'d>) -> Node<'d> {
        (*v).into()
    }
}

impl<'d> From<ParentOfChild<'d>> for Node<'d> {
    fn from(v: ParentOfChild<'d>) -> Node<'d> {
        match v {
            ParentOfChild::Document(n) => Node::Document(n),
            ParentOfChild::Element(n) => Node::Element(n),
        }
    }
}

impl<'d> TryFrom<Node<'d>> for Child<'d> {
    type Error = Error;

    fn try_from(v: Node<'d>) -> Result<Child<'d>, Error> {
        match v {
            Node::Element(n) => Ok(Child::Element(n)),
            Node::Text(n) => Ok(Child::Text(n)),
            Node::Comment(n) => Ok(Child::Comment(n)),
            Node::ProcessingInstruction(n) => Ok(Child::ProcessingInstruction(n)),
            Node::Directive(n) => Ok(Child::Directive(n)),
            Node::Document(_) | Node::Attribute(_) => Err(Error::InvalidNodeKind),
        }
    }
}
