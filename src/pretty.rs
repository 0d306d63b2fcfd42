//! Indents a tree in place by adding whitespace text nodes.
//!
//! ```
//! let package = domtree::parse("<a><b>text</b><c/></a>").expect("well-formed");
//! let doc = package.as_document();
//!
//! doc.pretty_print();
//! assert_eq!(
//!     domtree::writer::to_string(doc),
//!     "<a>\n    <b>text</b>\n    <c/>\n</a>"
//! );
//! ```
//!
//! An element whose only child is text keeps that text, trimmed. In any
//! other element every child starts on its own line, indented one level
//! deeper than the element, and the closing tag lines up with the
//! opening tag. Existing text nodes are trimmed and reused as the
//! whitespace before their following sibling, so applying the printer a
//! second time changes nothing.

use super::dom::{Child, Document, Element};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrettyPrinter {
    indent: usize,
}

impl Default for PrettyPrinter {
    fn default() -> PrettyPrinter {
        PrettyPrinter { indent: 4 }
    }
}

impl PrettyPrinter {
    pub fn new() -> PrettyPrinter {
        PrettyPrinter::default()
    }

    /// Number of spaces added for each level of nesting.
    pub fn indent(mut self, width: usize) -> PrettyPrinter {
        self.indent = width;
        self
    }

    pub fn apply(&self, element: Element) {
        self.format(element, 0);
    }

    /// Indents the root element, if any. Top-level nodes outside the
    /// root are left alone.
    pub fn apply_to_document(&self, doc: Document) {
        if let Some(root) = doc.root() {
            self.apply(root);
        }
    }

    fn format(&self, element: Element, depth: usize) {
        let children = element.children();
        let inner = depth + self.indent;

        if let [Child::Text(only)] = children.as_slice() {
            only.set_text(only.text().trim());
            return;
        }

        let mut i = 0;
        while i < children.len() {
            match children[i] {
                Child::Text(text) => {
                    let last = i + 1 == children.len();
                    let pad = if last { depth } else { inner };
                    text.set_text(&format!("{}{}", text.text().trim(), line(pad)));

                    // The rewritten text already leads into the next sibling.
                    if let Some(&Child::Element(next)) = children.get(i + 1) {
                        self.format(next, inner);
                    }
                    i += 1;
                }
                child => {
                    if let Child::Element(e) = child {
                        self.format(e, inner);
                    }
                    element.document().insert_text_before(child, &line(inner));
                }
            }
            i += 1;
        }

        if let Some(last) = children.last() {
            if last.text().is_none() {
                element.append_text(&line(depth));
            }
        }
    }
}

fn line(width: usize) -> String {
    format!("\n{:width$}", "", width = width)
}

impl<'d> Element<'d> {
    /// Indents this element with [`PrettyPrinter::default`].
    pub fn pretty_print(&self) {
        PrettyPrinter::default().apply(*self);
    }
}

impl<'d> Document<'d> {
    /// Indents the root element with [`PrettyPrinter::default`].
    pub fn pretty_print(self) {
        PrettyPrinter::default().apply_to_document(self);
    }
}

#[cfg(test)]
mod test {
    use super::super::{parse, writer, Package};
    use super::PrettyPrinter;

    fn pretty(xml: &str, printer: PrettyPrinter) -> String {
        let package = parse(xml).expect("well-formed");
        let doc = package.as_document();
        printer.apply_to_document(doc);
        writer::to_string(doc)
    }

    #[test]
    fn nested_elements_are_indented() {
        assert_eq!(
            pretty("<p><a/><b><c></c><d/></b></p>", PrettyPrinter::new()),
            "<p>\n    <a/>\n    <b>\n        <c/>\n        <d/>\n    </b>\n</p>"
        );
    }

    #[test]
    fn indent_width_is_configurable() {
        assert_eq!(
            pretty("<p><a><b/></a></p>", PrettyPrinter::new().indent(2)),
            "<p>\n  <a>\n    <b/>\n  </a>\n</p>"
        );
    }

    #[test]
    fn single_text_children_are_trimmed() {
        assert_eq!(
            pretty("<p><a>  hello  </a></p>", PrettyPrinter::new()),
            "<p>\n    <a>hello</a>\n</p>"
        );
    }

    #[test]
    fn mixed_content_reuses_existing_text() {
        assert_eq!(
            pretty("<a>  hi <b/><!--c--></a>", PrettyPrinter::new()),
            "<a>hi\n    <b/>\n    <!--c-->\n</a>"
        );
    }

    #[test]
    fn trailing_text_aligns_the_closing_tag() {
        assert_eq!(
            pretty("<a><b/>bye  </a>", PrettyPrinter::new()),
            "<a>\n    <b/>bye\n</a>"
        );
    }

    #[test]
    fn applying_twice_changes_nothing() {
        let package = parse("<beans>\n\t<bean><property name='x'/>text</bean>\n<!--c--></beans>")
            .expect("well-formed");
        let doc = package.as_document();

        doc.pretty_print();
        let once = writer::to_string(doc);
        doc.pretty_print();
        let twice = writer::to_string(doc);

        assert_eq!(once, twice);
    }

    #[test]
    fn pretty_output_survives_a_round_trip() {
        let first = pretty("<p><a/><b>x</b></p>", PrettyPrinter::new());
        let again = pretty(&first, PrettyPrinter::new());

        assert_eq!(first, again);
    }

    #[test]
    fn empty_documents_are_left_alone() {
        let package = Package::new();
        let doc = package.as_document();

        doc.pretty_print();
        assert!(doc.children().is_empty());
    }

    #[test]
    fn a_single_element_can_be_indented() {
        let package = Package::with_root("a");
        let doc = package.as_document();
        let a = doc.root().unwrap();
        let b = a.append_element("b");
        b.append_element("c");

        b.pretty_print();
        assert_eq!(writer::to_string(doc), "<a><b>\n    <c/>\n</b></a>");
    }
}
