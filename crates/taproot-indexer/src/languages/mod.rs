//! Language extractors for the indexed languages

pub mod c;
pub mod javascript;
pub mod markdown;
pub mod python;
pub mod rust;

use taproot_core::Language;
use tree_sitter::{Node, Point};

use crate::extractor::LanguageExtractor;
use crate::parser_pool::ParserPool;

/// Get the appropriate extractor for a language
pub fn get_extractor(language: Language, parser_pool: &ParserPool) -> Option<Box<dyn LanguageExtractor>> {
    match language {
        Language::Rust => Some(Box::new(rust::RustExtractor::new(parser_pool.clone()))),
        Language::TypeScript | Language::JavaScript => {
            Some(Box::new(javascript::JavaScriptExtractor::new(parser_pool.clone())))
        }
        Language::Python => Some(Box::new(python::PythonExtractor::new(parser_pool.clone()))),
        Language::C | Language::Cpp => Some(Box::new(c::CExtractor)),
        Language::Markdown => Some(Box::new(markdown::MarkdownExtractor)),
        Language::Other => None,
    }
}

pub(crate) fn point_to_u32(point: Point) -> u32 {
    (point.row as u32) + 1
}

/// Every node of the tree, depth-first, without recursion.
pub(crate) fn descendants(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
        out.push(node);
    }
    out
}

pub(crate) fn field_text<'s>(node: Node<'_>, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field)?.utf8_text(source.as_bytes()).ok()
}
