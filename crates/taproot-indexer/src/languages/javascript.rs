//! JavaScript and TypeScript extractor using tree-sitter

use std::path::PathBuf;

use anyhow::Result;
use taproot_core::tokenize::tokenize;
use taproot_core::{Dependency, DependencySpec, SymbolDecl, SymbolKind};
use tree_sitter::Node;

use super::{descendants, field_text, point_to_u32};
use crate::extractor::{ExtractionResult, LanguageExtractor};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct JavaScriptExtractor {
    parser_pool: ParserPool,
}

impl JavaScriptExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }

    /// Top-level declarations, looking through `export` wrappers.
    fn symbols(node: Node<'_>, source: &str, out: &mut Vec<SymbolDecl>) {
        let line = point_to_u32(node.start_position());
        let kind = match node.kind() {
            "export_statement" => {
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    Self::symbols(declaration, source, out);
                }
                return;
            }
            "function_declaration" | "generator_function_declaration" => SymbolKind::Function,
            "class_declaration" | "abstract_class_declaration" => SymbolKind::Class,
            "interface_declaration" => SymbolKind::Interface,
            "type_alias_declaration" => SymbolKind::TypeAlias,
            "enum_declaration" => SymbolKind::Enum,
            "lexical_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(name) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    // destructuring patterns declare nothing nameable
                    if name.kind() != "identifier" {
                        continue;
                    }
                    if let Ok(name) = name.utf8_text(source.as_bytes()) {
                        out.push(SymbolDecl {
                            name: name.to_string(),
                            kind: SymbolKind::Constant,
                            line,
                        });
                    }
                }
                return;
            }
            _ => return,
        };
        if let Some(name) = field_text(node, "name", source) {
            out.push(SymbolDecl { name: name.to_string(), kind, line });
        }
    }

    /// The module specifier of an import-like node, if it has one.
    fn specifier(node: Node<'_>, source: &str) -> Option<String> {
        let string = match node.kind() {
            "import_statement" | "export_statement" | "import_require_clause" => {
                node.child_by_field_name("source")?
            }
            "call_expression" => {
                let function = node.child_by_field_name("function")?;
                let is_loader = match function.kind() {
                    "import" => true,
                    "identifier" => function.utf8_text(source.as_bytes()).ok()? == "require",
                    _ => false,
                };
                if !is_loader {
                    return None;
                }
                let arguments = node.child_by_field_name("arguments")?;
                let mut cursor = arguments.walk();
                let first = arguments.named_children(&mut cursor).next()?;
                first
            }
            _ => return None,
        };
        if string.kind() != "string" {
            return None;
        }
        let text = string.utf8_text(source.as_bytes()).ok()?;
        let specifier = text.trim_matches(|c| c == '"' || c == '\'');
        (!specifier.is_empty()).then(|| specifier.to_string())
    }
}

impl LanguageExtractor for JavaScriptExtractor {
    fn extract(&self, path: &str, source: &str) -> Result<ExtractionResult> {
        let file_type = FileType::from_path(path).unwrap_or(FileType::JavaScript);
        let request = ParseRequest {
            file_type,
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
        for node in root.named_children(&mut cursor) {
            Self::symbols(node, source, &mut result.symbols);
            if node.kind() == "comment" {
                if let Ok(text) = node.utf8_text(source.as_bytes()) {
                    if text.starts_with("/**") {
                        result.doc_terms.extend(tokenize(text));
                    }
                }
            }
        }

        for node in descendants(root) {
            if let Some(specifier) = Self::specifier(node, source) {
                result.dependencies.push(Dependency {
                    spec: DependencySpec::JsImport { specifier },
                    line: point_to_u32(node.start_position()),
                });
            }
        }

        Ok(result.normalize())
    }
}
