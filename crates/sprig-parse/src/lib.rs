//! Java syntax helpers shared by the bean scanner.
//!
//! Everything here is best-effort: tree-sitter gives us a tolerant tree even for
//! broken sources, and the helpers degrade to "not found" rather than failing.

mod annotation;
mod imports;
mod types;

use std::cell::RefCell;

use sprig_core::Span;
use tree_sitter::{Node, Parser, Tree};

pub use annotation::{array_elements, collect_annotations, parse_annotation_text, ParsedAnnotation};
pub use imports::ImportScope;
pub use types::{erase_type, simple_type_name};

thread_local! {
    static JAVA_PARSER: RefCell<Result<Parser, String>> = RefCell::new({
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_java::language())
            .map(|()| parser)
            .map_err(|err| format!("tree-sitter-java language load failed: {err:?}"))
    });
}

/// Parse Java source text with `tree-sitter-java`.
///
/// Parsers are reused per thread; a re-entrant call on the same thread returns an
/// error instead of panicking.
pub fn parse_java(source: &str) -> Result<Tree, String> {
    JAVA_PARSER.with(|cell| {
        let mut slot = cell
            .try_borrow_mut()
            .map_err(|_| "tree-sitter parser is already in use".to_string())?;
        let parser = slot.as_mut().map_err(|err| err.clone())?;
        parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a syntax tree".to_string())
    })
}

/// Find the first named child with the given kind.
pub fn find_named_child<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    found
}

/// A declaration's `modifiers` node, whether or not the grammar exposes it as a field.
pub fn modifier_node(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("modifiers")
        .or_else(|| find_named_child(node, "modifiers"))
}

/// The `name` of a declaration, falling back to its first identifier child.
pub fn name_node(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("name")
        .or_else(|| find_named_child(node, "identifier"))
}

/// Return the byte slice for `node` within `source`.
pub fn node_text<'a>(source: &'a str, node: Node<'_>) -> &'a str {
    &source[node.byte_range()]
}

pub fn node_span(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}
