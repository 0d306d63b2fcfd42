//! Formats a document or any node back into XML text.
//!
//! ```
//! let package = domtree::parse("<a b='c'>1 &lt; 2</a>").expect("well-formed");
//! let doc = package.as_document();
//!
//! assert_eq!(domtree::writer::to_string(doc), r#"<a b="c">1 &lt; 2</a>"#);
//! ```
//!
//! Element children are written exactly as they are stored; no
//! whitespace is added. Only text content is escaped. Attribute values,
//! comments, processing instructions and directives are written
//! verbatim.

use std::io::{self, Write};

use super::dom::{Child, Document, Element, Node, ParentOfChild};

enum Content<'d> {
    Element(Element<'d>),
    ElementEnd(Element<'d>),
    Text(&'d str),
    Comment(&'d str),
    ProcessingInstruction(&'d str, &'d str),
    Directive(&'d str),
}

impl<'d> From<Child<'d>> for Content<'d> {
    fn from(child: Child<'d>) -> Content<'d> {
        match child {
            Child::Element(e) => Content::Element(e),
            Child::Text(t) => Content::Text(t.text()),
            Child::Comment(c) => Content::Comment(c.text()),
            Child::ProcessingInstruction(p) => Content::ProcessingInstruction(p.target(), p.instruction()),
            Child::Directive(d) => Content::Directive(d.text()),
        }
    }
}

/// Queues `children` so they are popped in document order.
fn push_children<'d>(todo: &mut Vec<Content<'d>>, children: Vec<Child<'d>>) {
    todo.extend(children.into_iter().rev().map(Content::from));
}

fn format_element<'d, W>(element: Element<'d>, todo: &mut Vec<Content<'d>>, writer: &mut W) -> io::Result<()>
where
    W: Write + ?Sized,
{
    write!(writer, "<{}", element.name())?;

    for attribute in element.attributes() {
        write!(writer, " {}=\"{}\"", attribute.name(), attribute.value())?;
    }

    let children = element.children();
    if children.is_empty() {
        writer.write_all(b"/>")
    } else {
        writer.write_all(b">")?;
        todo.push(Content::ElementEnd(element));
        push_children(todo, children);
        Ok(())
    }
}

fn format_processing_instruction<W>(target: &str, instruction: &str, writer: &mut W) -> io::Result<()>
where
    W: Write + ?Sized,
{
    if instruction.is_empty() {
        write!(writer, "<?{}?>", target)
    } else {
        write!(writer, "<?{} {}?>", target, instruction)
    }
}

fn format_content<'d, W>(content: Content<'d>, todo: &mut Vec<Content<'d>>, writer: &mut W) -> io::Result<()>
where
    W: Write + ?Sized,
{
    match content {
        Content::Element(e) => format_element(e, todo, writer),
        Content::ElementEnd(e) => write!(writer, "</{}>", e.name()),
        Content::Text(t) => escape_text(t, writer),
        Content::Comment(c) => write!(writer, "<!--{}-->", c),
        Content::ProcessingInstruction(target, instruction) => {
            format_processing_instruction(target, instruction, writer)
        }
        Content::Directive(d) => write!(writer, "<!{}>", d),
    }
}

fn format_all<'d, W>(mut todo: Vec<Content<'d>>, writer: &mut W) -> io::Result<()>
where
    W: Write + ?Sized,
{
    while let Some(content) = todo.pop() {
        format_content(content, &mut todo, writer)?;
    }
    Ok(())
}

/// Writes every top-level node of the document in order.
pub fn format_document<'d, W>(doc: Document<'d>, writer: &mut W) -> io::Result<()>
where
    W: Write + ?Sized,
{
    format_node(doc, writer)
}

/// Writes a single node. A document writes all of its children and an
/// attribute writes itself as `name="value"`.
pub fn format_node<'d, N, W>(node: N, writer: &mut W) -> io::Result<()>
where
    N: Into<Node<'d>>,
    W: Write + ?Sized,
{
    let mut todo = Vec::new();

    match node.into() {
        Node::Document(d) => push_children(&mut todo, ParentOfChild::Document(d).children()),
        Node::Attribute(a) => return write!(writer, "{}=\"{}\"", a.name(), a.value()),
        Node::Element(e) => todo.push(Content::Element(e)),
        Node::Text(t) => todo.push(Content::Text(t.text())),
        Node::Comment(c) => todo.push(Content::Comment(c.text())),
        Node::ProcessingInstruction(p) => {
            todo.push(Content::ProcessingInstruction(p.target(), p.instruction()))
        }
        Node::Directive(d) => todo.push(Content::Directive(d.text())),
    }

    format_all(todo, writer)
}

pub fn to_bytes<'d, N>(node: N) -> Vec<u8>
where
    N: Into<Node<'d>>,
{
    let mut output = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = format_node(node, &mut output);
    output
}

pub fn to_string<'d, N>(node: N) -> String
where
    N: Into<Node<'d>>,
{
    match String::from_utf8(to_bytes(node)) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

const REPLACEMENT: &str = "\u{FFFD}";

fn is_in_character_range(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn escape_for(c: char) -> Option<&'static str> {
    match c {
        '"' => Some("&#34;"),
        '\'' => Some("&#39;"),
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        c if !is_in_character_range(c) => Some(REPLACEMENT),
        _ => None,
    }
}

/// Writes `text` with markup characters replaced by references and
/// characters that cannot appear in XML replaced by U+FFFD.
pub fn escape_text<W>(text: &str, writer: &mut W) -> io::Result<()>
where
    W: Write + ?Sized,
{
    let mut last = 0;
    for (i, c) in text.char_indices() {
        if let Some(escaped) = escape_for(c) {
            writer.write_all(text[last..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            last = i + c.len_utf8();
        }
    }
    writer.write_all(text[last..].as_bytes())
}
