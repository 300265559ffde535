//! Python language extractor using tree-sitter

use std::path::PathBuf;

use anyhow::Result;
use taproot_core::tokenize::tokenize;
use taproot_core::{Dependency, DependencySpec, SymbolDecl, SymbolKind};
use tree_sitter::Node;

use super::{descendants, field_text, point_to_u32};
use crate::extractor::{ExtractionResult, LanguageExtractor};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct PythonExtractor {
    parser_pool: ParserPool,
}

impl PythonExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }

    /// The module path of a `dotted_name` or `aliased_import` node.
    fn imported_name<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
        if node.kind() == "aliased_import" {
            field_text(node, "name", source)
        } else {
            node.utf8_text(source.as_bytes()).ok()
        }
    }

    fn import(node: Node<'_>, source: &str) -> Vec<DependencySpec> {
        let mut cursor = node.walk();
        node.children_by_field_name("name", &mut cursor)
            .filter_map(|child| Self::imported_name(child, source))
            .map(|module| DependencySpec::PythonImport {
                module: module.to_string(),
                names: Vec::new(),
                level: 0,
            })
            .collect()
    }

    fn import_from(node: Node<'_>, source: &str) -> Option<DependencySpec> {
        let module_node = node.child_by_field_name("module_name")?;
        let raw = module_node.utf8_text(source.as_bytes()).ok()?;
        let level = raw.chars().take_while(|&c| c == '.').count() as u32;
        let module = raw.trim_start_matches('.').to_string();

        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|child| Self::imported_name(child, source))
            .map(str::to_string)
            .collect();

        Some(DependencySpec::PythonImport { module, names, level })
    }

    fn symbol(node: Node<'_>, source: &str) -> Option<SymbolDecl> {
        let definition = if node.kind() == "decorated_definition" {
            node.child_by_field_name("definition")?
        } else {
            node
        };
        let kind = match definition.kind() {
            "function_definition" => SymbolKind::Function,
            "class_definition" => SymbolKind::Class,
            _ => return None,
        };
        Some(SymbolDecl {
            name: field_text(definition, "name", source)?.to_string(),
            kind,
            line: point_to_u32(node.start_position()),
        })
    }

    fn module_docstring(root: Node<'_>, source: &str) -> Option<String> {
        let mut cursor = root.walk();
        let first = root.named_children(&mut cursor).next()?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let mut inner = first.walk();
        let string = first.named_children(&mut inner).next()?;
        if string.kind() != "string" {
            return None;
        }
        string.utf8_text(source.as_bytes()).ok().map(str::to_string)
    }
}

impl LanguageExtractor for PythonExtractor {
    fn extract(&self, path: &str, source: &str) -> Result<ExtractionResult> {
        let request = ParseRequest {
            file_type: FileType::Python,
            content: source.to_string(),
            path: PathBuf::from(path),
        };
        let parse_result = self.parser_pool.parse_blocking(request)?;
        let root = parse_result.tree.root_node();

        let mut result = ExtractionResult {
            parse_errors: root.has_error(),
            ..ExtractionResult::default()
        };

        let mut cursor = root.walk();
        result.symbols = root
            .named_children(&mut cursor)
            .filter_map(|node| Self::symbol(node, source))
            .collect();

        for node in descendants(root) {
            let line = point_to_u32(node.start_position());
            let specs = match node.kind() {
                "import_statement" => Self::import(node, source),
                "import_from_statement" => Self::import_from(node, source).into_iter().collect(),
                _ => continue,
            };
            result
                .dependencies
                .extend(specs.into_iter().map(|spec| Dependency { spec, line }));
        }

        if let Some(doc) = Self::module_docstring(root, source) {
            result.doc_terms = tokenize(&doc);
        }

        Ok(result.normalize())
    }
}
