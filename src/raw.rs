//! The storage and linking layer beneath the public handles.
//!
//! `Storage` allocates nodes and interns their strings; `Connections`
//! knows how nodes are linked to each other. Everything here works on raw
//! pointers into the arenas, which stay valid for as long as the
//! `Storage` that allocated them.

use std::collections::HashMap;

use typed_arena::Arena;

use super::sibling_list::{Position, SiblingList};
use super::string_pool::{InternedString, StringPool, TextBuffer};
use super::QName;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct InternedQName {
    space: InternedString,
    local_part: InternedString,
}

impl InternedQName {
    /// A lookup key that borrows `name` instead of interning it.
    fn borrowed(name: QName) -> InternedQName {
        InternedQName {
            space: InternedString::from_str(name.space()),
            local_part: InternedString::from_str(name.local_part()),
        }
    }

    fn as_qname<'s>(&self) -> QName<'s> {
        QName::with_space(self.space.as_slice(), self.local_part.as_slice())
    }
}

/// Where a child currently lives. Both halves are set together when
/// the child is attached and cleared together when it is detached.
#[derive(Debug, Copy, Clone, Default)]
struct Link {
    parent: Option<Parent>,
    position: Option<Position>,
}

impl Link {
    fn attached(parent: Parent, position: Position) -> Link {
        Link {
            parent: Some(parent),
            position: Some(position),
        }
    }
}

pub struct Document {
    children: SiblingList<Child>,
    root: Option<*mut Element>,
}

#[derive(Default)]
struct Attributes {
    order: SiblingList<*mut Attribute>,
    by_name: HashMap<InternedQName, *mut Attribute>,
}

pub struct Element {
    name: InternedQName,
    attributes: Attributes,
    children: SiblingList<Child>,
    link: Link,
}

impl Element {
    pub fn name<'s>(&self) -> QName<'s> {
        self.name.as_qname()
    }
}

pub struct Attribute {
    name: InternedQName,
    value: InternedString,
    parent: Option<*mut Element>,
    position: Option<Position>,
}

impl Attribute {
    pub fn name<'s>(&self) -> QName<'s> {
        self.name.as_qname()
    }

    pub fn value<'s>(&self) -> &'s str {
        self.value.as_slice()
    }
}

pub struct Text {
    text: TextBuffer,
    link: Link,
}

impl Text {
    pub fn text<'s>(&self) -> &'s str {
        self.text.as_str()
    }
}

pub struct Comment {
    text: InternedString,
    link: Link,
}

impl Comment {
    pub fn text<'s>(&self) -> &'s str {
        self.text.as_slice()
    }
}

pub struct ProcessingInstruction {
    target: InternedString,
    instruction: InternedString,
    link: Link,
}

impl ProcessingInstruction {
    pub fn target<'s>(&self) -> &'s str {
        self.target.as_slice()
    }

    pub fn instruction<'s>(&self) -> &'s str {
        self.instruction.as_slice()
    }
}

pub struct Directive {
    text: InternedString,
    link: Link,
}

impl Directive {
    pub fn text<'s>(&self) -> &'s str {
        self.text.as_slice()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Child {
    Element(*mut Element),
    Text(*mut Text),
    Comment(*mut Comment),
    ProcessingInstruction(*mut ProcessingInstruction),
    Directive(*mut Directive),
}

macro_rules! each_child(
    ($child:expr, $n:ident => $body:expr) => (
        match $child {
            Child::Element($n) => $body,
            Child::Text($n) => $body,
            Child::Comment($n) => $body,
            Child::ProcessingInstruction($n) => $body,
            Child::Directive($n) => $body,
        }
    )
);

impl Child {
    fn link(self) -> Link {
        unsafe { each_child!(self, n => (*n).link) }
    }

    fn set_link(self, link: Link) {
        unsafe { each_child!(self, n => (*n).link = link) }
    }

    fn location(self) -> Option<(Parent, Position)> {
        let link = self.link();
        Some((link.parent?, link.position?))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Parent {
    Document(*mut Document),
    Element(*mut Element),
}

impl Parent {
    /// The returned list must be dropped before the parent is touched
    /// again through any other path.
    unsafe fn children<'a>(self) -> &'a mut SiblingList<Child> {
        match self {
            Parent::Document(d) => &mut (*d).children,
            Parent::Element(e) => &mut (*e).children,
        }
    }

    unsafe fn child_list<'a>(self) -> &'a SiblingList<Child> {
        match self {
            Parent::Document(d) => &(*d).children,
            Parent::Element(e) => &(*e).children,
        }
    }
}

fn value_at(list: &SiblingList<Child>, position: Option<Position>) -> Option<Child> {
    position.and_then(|p| list.get(p)).copied()
}

fn note_root(parent: Parent, child: Child) {
    if let (Parent::Document(d), Child::Element(e)) = (parent, child) {
        unsafe { (*d).root = Some(e) }
    }
}

fn push_child(parent: Parent, child: Child) -> Child {
    let position = unsafe { parent.children() }.push_back(child);
    child.set_link(Link::attached(parent, position));
    note_root(parent, child);
    child
}

fn link_attribute(element: *mut Element, attribute: *mut Attribute) {
    let element_r = unsafe { &mut *element };
    let attribute_r = unsafe { &mut *attribute };

    let position = element_r.attributes.order.push_back(attribute);
    element_r.attributes.by_name.insert(attribute_r.name, attribute);
    attribute_r.parent = Some(element);
    attribute_r.position = Some(position);
}

fn unlink_attribute(attribute: *mut Attribute) {
    let attribute_r = unsafe { &mut *attribute };

    if let (Some(element), Some(position)) = (attribute_r.parent, attribute_r.position) {
        let element_r = unsafe { &mut *element };
        element_r.attributes.order.remove(position);
        element_r.attributes.by_name.remove(&attribute_r.name);
    }

    attribute_r.parent = None;
    attribute_r.position = None;
}

pub struct Storage {
    strings: StringPool,
    documents: Arena<Document>,
    elements: Arena<Element>,
    attributes: Arena<Attribute>,
    texts: Arena<Text>,
    comments: Arena<Comment>,
    processing_instructions: Arena<ProcessingInstruction>,
    directives: Arena<Directive>,
}

impl Storage {
    pub fn new() -> Storage {
        Storage {
            strings: StringPool::new(),
            documents: Arena::new(),
            elements: Arena::new(),
            attributes: Arena::new(),
            texts: Arena::new(),
            comments: Arena::new(),
            processing_instructions: Arena::new(),
            directives: Arena::new(),
        }
    }

    fn intern(&self, s: &str) -> InternedString {
        InternedString::from_str(self.strings.intern(s))
    }

    fn intern_qname(&self, name: QName) -> InternedQName {
        InternedQName {
            space: self.intern(name.space()),
            local_part: self.intern(name.local_part()),
        }
    }

    pub fn create_document(&self) -> *mut Document {
        self.documents.alloc(Document {
            children: SiblingList::new(),
            root: None,
        })
    }

    pub fn create_element<'n, N>(&self, name: N) -> *mut Element
    where
        N: Into<QName<'n>>,
    {
        let name = self.intern_qname(name.into());

        self.elements.alloc(Element {
            name,
            attributes: Attributes::default(),
            children: SiblingList::new(),
            link: Link::default(),
        })
    }

    pub fn create_attribute<'n, N>(&self, name: N, value: &str) -> *mut Attribute
    where
        N: Into<QName<'n>>,
    {
        let name = self.intern_qname(name.into());
        let value = self.intern(value);

        self.attributes.alloc(Attribute {
            name,
            value,
            parent: None,
            position: None,
        })
    }

    pub fn create_text(&self, text: &str) -> *mut Text {
        let text = self.strings.text(text);

        self.texts.alloc(Text {
            text,
            link: Link::default(),
        })
    }

    pub fn create_comment(&self, text: &str) -> *mut Comment {
        let text = self.intern(text);

        self.comments.alloc(Comment {
            text,
            link: Link::default(),
        })
    }

    pub fn create_processing_instruction(&self, target: &str, instruction: &str) -> *mut ProcessingInstruction {
        let target = self.intern(target);
        let instruction = self.intern(instruction);

        self.processing_instructions.alloc(ProcessingInstruction {
            target,
            instruction,
            link: Link::default(),
        })
    }

    pub fn create_directive(&self, text: &str) -> *mut Directive {
        let text = self.intern(text);

        self.directives.alloc(Directive {
            text,
            link: Link::default(),
        })
    }

    pub fn element_set_name<'n, N>(&self, element: *mut Element, name: N)
    where
        N: Into<QName<'n>>,
    {
        let name = self.intern_qname(name.into());
        let element_r = unsafe { &mut *element };
        element_r.name = name;
    }

    pub fn attribute_set_value(&self, attribute: *mut Attribute, value: &str) {
        let value = self.intern(value);
        let attribute_r = unsafe { &mut *attribute };
        attribute_r.value = value;
    }

    pub fn text_set_text(&self, text: *mut Text, new_text: &str) {
        let new_text = self.strings.text(new_text);
        let text_r = unsafe { &mut *text };
        text_r.text = new_text;
    }

    pub fn text_append(&self, text: *mut Text, tail: &str) {
        let text_r = unsafe { &mut *text };
        self.strings.text_append(&mut text_r.text, tail);
    }

    pub fn text_prepend(&self, text: *mut Text, head: &str) {
        let text_r = unsafe { &mut *text };
        self.strings.text_prepend(&mut text_r.text, head);
    }

    pub fn comment_set_text(&self, comment: *mut Comment, new_text: &str) {
        let new_text = self.intern(new_text);
        let comment_r = unsafe { &mut *comment };
        comment_r.text = new_text;
    }

    pub fn processing_instruction_set_target(&self, pi: *mut ProcessingInstruction, new_target: &str) {
        let new_target = self.intern(new_target);
        let pi_r = unsafe { &mut *pi };
        pi_r.target = new_target;
    }

    pub fn processing_instruction_set_instruction(&self, pi: *mut ProcessingInstruction, new_instruction: &str) {
        let new_instruction = self.intern(new_instruction);
        let pi_r = unsafe { &mut *pi };
        pi_r.instruction = new_instruction;
    }

    pub fn directive_set_text(&self, directive: *mut Directive, new_text: &str) {
        let new_text = self.intern(new_text);
        let directive_r = unsafe { &mut *directive };
        directive_r.text = new_text;
    }
}

pub struct Connections {
    document: *mut Document,
}

impl Connections {
    pub fn new(document: *mut Document) -> Connections {
        Connections { document }
    }

    pub fn document(&self) -> *mut Document {
        self.document
    }

    pub fn root_element(&self) -> Option<*mut Element> {
        unsafe { (*self.document).root }
    }

    pub fn parent(&self, child: Child) -> Option<Parent> {
        child.link().parent
    }

    pub fn children(&self, parent: Parent) -> Vec<Child> {
        // The copied pointers stay valid; only the list is borrowed.
        unsafe { parent.child_list() }.iter().map(|(_, c)| *c).collect()
    }

    pub fn first_position(&self, parent: Parent) -> Option<Position> {
        unsafe { parent.child_list() }.first()
    }

    /// The child at `position` and the position that follows it.
    pub fn child_at(&self, parent: Parent, position: Position) -> Option<(Child, Option<Position>)> {
        let list = unsafe { parent.child_list() };
        let child = *list.get(position)?;
        Some((child, list.next(position)))
    }

    pub fn preceding_siblings(&self, child: Child) -> Vec<Child> {
        let mut siblings = self.walk_siblings(child, SiblingList::prev);
        siblings.reverse();
        siblings
    }

    pub fn following_siblings(&self, child: Child) -> Vec<Child> {
        self.walk_siblings(child, SiblingList::next)
    }

    fn walk_siblings<F>(&self, child: Child, step: F) -> Vec<Child>
    where
        F: Fn(&SiblingList<Child>, Position) -> Option<Position>,
    {
        let (parent, position) = match child.location() {
            Some(location) => location,
            None => return Vec::new(),
        };
        let list = unsafe { parent.child_list() };

        let mut siblings = Vec::new();
        let mut cursor = step(list, position);
        while let Some(p) = cursor {
            siblings.extend(list.get(p).copied());
            cursor = step(list, p);
        }
        siblings
    }

    /// Appends `child`, or folds it into the last child when both are
    /// text. Returns the node that now holds the content.
    pub fn append_child(&self, storage: &Storage, parent: Parent, child: Child) -> Child {
        if let Child::Text(text) = child {
            let list = unsafe { parent.child_list() };
            if let Some(Child::Text(last)) = value_at(list, list.last()) {
                storage.text_append(last, unsafe { (*text).text() });
                return Child::Text(last);
            }
        }

        push_child(parent, child)
    }

    /// Returns `None` when `reference` is detached.
    pub fn insert_before(&self, storage: &Storage, reference: Child, child: Child) -> Option<Child> {
        let (parent, position) = reference.location()?;
        let list = unsafe { parent.children() };

        if let Child::Text(text) = child {
            let text = unsafe { (*text).text() };

            if let Some(Child::Text(previous)) = value_at(list, list.prev(position)) {
                storage.text_append(previous, text);
                return Some(Child::Text(previous));
            }
            if let Child::Text(reference) = reference {
                storage.text_prepend(reference, text);
                return Some(Child::Text(reference));
            }
        }

        let position = list.insert_before(position, child)?;
        child.set_link(Link::attached(parent, position));
        note_root(parent, child);
        Some(child)
    }

    /// Returns `None` when `reference` is detached.
    pub fn insert_after(&self, storage: &Storage, reference: Child, child: Child) -> Option<Child> {
        let (parent, position) = reference.location()?;
        let list = unsafe { parent.children() };

        if let Child::Text(text) = child {
            let text = unsafe { (*text).text() };

            if let Child::Text(reference) = reference {
                storage.text_append(reference, text);
                return Some(Child::Text(reference));
            }
            if let Some(Child::Text(next)) = value_at(list, list.next(position)) {
                storage.text_prepend(next, text);
                return Some(Child::Text(next));
            }
        }

        let position = list.insert_after(position, child)?;
        child.set_link(Link::attached(parent, position));
        note_root(parent, child);
        Some(child)
    }

    /// Detaches `child`. Text on both sides of the gap is merged into
    /// the later node. Detached children are left alone.
    pub fn remove_child(&self, storage: &Storage, child: Child) {
        let (parent, position) = match child.location() {
            Some(location) => location,
            None => return,
        };
        let list = unsafe { parent.children() };

        let previous = list.prev(position);
        let next = value_at(list, list.next(position));

        list.remove(position);
        child.set_link(Link::default());

        if let (Some(previous), Some(Child::Text(after))) = (previous, next) {
            if let Some(Child::Text(before)) = list.get(previous).copied() {
                storage.text_prepend(after, unsafe { (*before).text() });
                list.remove(previous);
                Child::Text(before).set_link(Link::default());
            }
        }

        if let (Parent::Document(d), Child::Element(e)) = (parent, child) {
            unsafe {
                if (*d).root == Some(e) {
                    (*d).root = None;
                }
            }
        }
    }

    pub fn clear_children(&self, parent: Parent) {
        for child in unsafe { parent.children() }.drain() {
            child.set_link(Link::default());
        }

        if let Parent::Document(d) = parent {
            unsafe { (*d).root = None }
        }
    }

    /// Makes `element` the root, taking the old root's place among the
    /// top-level children or appending when there was none.
    pub fn replace_root_element(&self, element: *mut Element) {
        let parent = Parent::Document(self.document);
        let child = Child::Element(element);
        let old = self
            .root_element()
            .map(Child::Element)
            .and_then(|old| old.location().map(|(_, p)| (old, p)));
        let list = unsafe { parent.children() };

        let replaced = old.and_then(|(old, position)| {
            let new_position = list.insert_after(position, child)?;
            list.remove(position);
            old.set_link(Link::default());
            Some(new_position)
        });
        let position = match replaced {
            Some(position) => position,
            None => list.push_back(child),
        };

        child.set_link(Link::attached(parent, position));
        note_root(parent, child);
    }

    /// A detached deep copy of `child` allocated in `storage`. The source
    /// may belong to a different package.
    pub fn copy_child(&self, storage: &Storage, child: Child) -> Child {
        unsafe {
            match child {
                Child::Element(n) => Child::Element(self.copy_element(storage, n)),
                Child::Text(n) => Child::Text(storage.create_text((*n).text())),
                Child::Comment(n) => Child::Comment(storage.create_comment((*n).text())),
                Child::ProcessingInstruction(n) => Child::ProcessingInstruction(
                    storage.create_processing_instruction((*n).target(), (*n).instruction()),
                ),
                Child::Directive(n) => Child::Directive(storage.create_directive((*n).text())),
            }
        }
    }

    pub fn copy_element(&self, storage: &Storage, source: *mut Element) -> *mut Element {
        let source_r = unsafe { &*source };
        let copy = storage.create_element(source_r.name());

        for (_, &attribute) in source_r.attributes.order.iter() {
            let attribute_r = unsafe { &*attribute };
            let attribute = storage.create_attribute(attribute_r.name(), attribute_r.value());
            link_attribute(copy, attribute);
        }

        for (_, &child) in source_r.children.iter() {
            let child = self.copy_child(storage, child);
            push_child(Parent::Element(copy), child);
        }

        copy
    }

    pub fn attribute_parent(&self, attribute: *mut Attribute) -> Option<*mut Element> {
        unsafe { (*attribute).parent }
    }

    pub fn attributes(&self, element: *mut Element) -> Vec<*mut Attribute> {
        let element_r = unsafe { &*element };
        element_r.attributes.order.iter().map(|(_, a)| *a).collect()
    }

    pub fn attribute<'n, N>(&self, element: *mut Element, name: N) -> Option<*mut Attribute>
    where
        N: Into<QName<'n>>,
    {
        let element_r = unsafe { &*element };
        let key = InternedQName::borrowed(name.into());
        element_r.attributes.by_name.get(&key).copied()
    }

    /// Updates the value in place when the name is present, otherwise
    /// adds a new attribute after the existing ones.
    pub fn set_attribute<'n, N>(&self, storage: &Storage, element: *mut Element, name: N, value: &str) -> *mut Attribute
    where
        N: Into<QName<'n>>,
    {
        let name = name.into();

        match self.attribute(element, name) {
            Some(existing) => {
                storage.attribute_set_value(existing, value);
                existing
            }
            None => {
                let attribute = storage.create_attribute(name, value);
                link_attribute(element, attribute);
                attribute
            }
        }
    }

    pub fn remove_attribute<'n, N>(&self, element: *mut Element, name: N) -> Option<*mut Attribute>
    where
        N: Into<QName<'n>>,
    {
        let attribute = self.attribute(element, name)?;
        unlink_attribute(attribute);
        Some(attribute)
    }

    pub fn remove_attribute_from_parent(&self, attribute: *mut Attribute) {
        unlink_attribute(attribute);
    }
}

#[cfg(test)]
mod test {
    use super::{Child, Connections, Parent, Storage};
    use crate::QName;

    fn setup() -> (Storage, Connections) {
        let storage = Storage::new();
        let document = storage.create_document();
        (storage, Connections::new(document))
    }

    fn text_of(child: Child) -> &'static str {
        match child {
            Child::Text(t) => unsafe { (*t).text() },
            _ => panic!("not text: {:?}", child),
        }
    }

    #[test]
    fn adjacent_text_is_merged_on_append() {
        let (storage, connections) = setup();
        let element = storage.create_element("p");
        let parent = Parent::Element(element);

        let first = connections.append_child(&storage, parent, Child::Text(storage.create_text("foo")));
        let second = connections.append_child(&storage, parent, Child::Text(storage.create_text("bar")));

        assert_eq!(first, second);
        assert_eq!(connections.children(parent).len(), 1);
        assert_eq!(text_of(first), "foobar");
    }

    #[test]
    fn removal_between_text_merges_the_neighbours() {
        let (storage, connections) = setup();
        let parent = Parent::Element(storage.create_element("p"));

        connections.append_child(&storage, parent, Child::Text(storage.create_text("a")));
        let middle = connections.append_child(&storage, parent, Child::Element(storage.create_element("br")));
        let last = connections.append_child(&storage, parent, Child::Text(storage.create_text("b")));

        connections.remove_child(&storage, middle);

        let children = connections.children(parent);
        assert_eq!(children, vec![last]);
        assert_eq!(text_of(last), "ab");
        assert_eq!(connections.parent(middle), None);
    }

    #[test]
    fn removing_a_detached_child_does_nothing() {
        let (storage, connections) = setup();
        let text = Child::Text(storage.create_text("alone"));

        connections.remove_child(&storage, text);
        connections.remove_child(&storage, text);

        assert_eq!(connections.parent(text), None);
    }

    #[test]
    fn inserting_relative_to_a_detached_child_fails() {
        let (storage, connections) = setup();
        let reference = Child::Comment(storage.create_comment("c"));
        let child = Child::Comment(storage.create_comment("d"));

        assert_eq!(connections.insert_before(&storage, reference, child), None);
        assert_eq!(connections.insert_after(&storage, reference, child), None);
    }

    #[test]
    fn replacing_the_root_keeps_its_place() {
        let (storage, connections) = setup();
        let document = Parent::Document(connections.document());

        let before = connections.append_child(&storage, document, Child::Comment(storage.create_comment("before")));
        let old = storage.create_element("old");
        connections.append_child(&storage, document, Child::Element(old));
        let after = connections.append_child(&storage, document, Child::Comment(storage.create_comment("after")));

        let new = storage.create_element("new");
        connections.replace_root_element(new);

        assert_eq!(connections.children(document), vec![before, Child::Element(new), after]);
        assert_eq!(connections.root_element(), Some(new));
        assert_eq!(connections.parent(Child::Element(old)), None);
    }

    #[test]
    fn removing_the_root_clears_it() {
        let (storage, connections) = setup();
        let document = Parent::Document(connections.document());
        let root = connections.append_child(&storage, document, Child::Element(storage.create_element("r")));

        connections.remove_child(&storage, root);

        assert_eq!(connections.root_element(), None);
    }

    #[test]
    fn copies_are_deep_and_detached() {
        let (storage, connections) = setup();
        let original = storage.create_element("a");
        connections.set_attribute(&storage, original, "k", "v");
        let inner = Parent::Element(original);
        connections.append_child(&storage, inner, Child::Text(storage.create_text("hi")));

        let copy = match connections.copy_child(&storage, Child::Element(original)) {
            Child::Element(e) => e,
            other => panic!("copied into {:?}", other),
        };

        assert_ne!(copy, original);
        assert_eq!(connections.parent(Child::Element(copy)), None);
        let copied_children = connections.children(Parent::Element(copy));
        assert_eq!(copied_children.len(), 1);
        assert_ne!(copied_children, connections.children(inner));
        assert_eq!(text_of(copied_children[0]), "hi");

        let attribute = connections.attribute(copy, "k").expect("copied attribute");
        assert_eq!(connections.attribute_parent(attribute), Some(copy));
    }

    #[test]
    fn setting_an_existing_attribute_keeps_its_order() {
        let (storage, connections) = setup();
        let element = storage.create_element("e");

        let a = connections.set_attribute(&storage, element, "a", "1");
        let b = connections.set_attribute(&storage, element, ("x", "b"), "2");
        let again = connections.set_attribute(&storage, element, "a", "3");

        assert_eq!(a, again);
        assert_eq!(connections.attributes(element), vec![a, b]);
        assert_eq!(unsafe { (*a).value() }, "3");
        assert_eq!(unsafe { (*b).name() }, QName::with_space("x", "b"));
    }

    #[test]
    fn removed_attributes_are_unlinked() {
        let (storage, connections) = setup();
        let element = storage.create_element("e");
        connections.set_attribute(&storage, element, "a", "1");
        let b = connections.set_attribute(&storage, element, "b", "2");

        let removed = connections.remove_attribute(element, "a").expect("present");

        assert_eq!(connections.attribute_parent(removed), None);
        assert_eq!(connections.attributes(element), vec![b]);
        assert_eq!(connections.attribute(element, "a"), None);
        assert_eq!(connections.remove_attribute(element, "a"), None);
    }
}
