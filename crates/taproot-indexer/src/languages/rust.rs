//! Rust language extractor using tree-sitter

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tree_sitter::Node;
use taproot_core::tokenize::tokenize;
use taproot_core::{Dependency, DependencySpec, SymbolDecl, SymbolKind};

use super::{descendants, field_text, point_to_u32};
use crate::extractor::{ExtractionResult, LanguageExtractor};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

static ALIAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+as\s+\w+").expect("valid regex"));

pub struct RustExtractor {
    parser_pool: ParserPool,
}

impl RustExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }
}

fn symbol_kind(node_kind: &str) -> Option<SymbolKind> {
    match node_kind {
        "function_item" => Some(SymbolKind::Function),
        "struct_item" | "union_item" => Some(SymbolKind::Struct),
        "enum_item" => Some(SymbolKind::Enum),
        "trait_item" => Some(SymbolKind::Trait),
        "type_item" => Some(SymbolKind::TypeAlias),
        "const_item" | "static_item" => Some(SymbolKind::Constant),
        "mod_item" => Some(SymbolKind::Module),
        _ => None,
    }
}

impl LanguageExtractor for RustExtractor {
    fn extract(&self, path: &str, source: &str) -> Result<ExtractionResult> {
        let request = ParseRequest {
            file_type: FileType::Rust,
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
        for item in root.named_children(&mut cursor) {
            let line = point_to_u32(item.start_position());
            let Some(kind) = symbol_kind(item.kind()) else {
                continue;
            };
            let Some(name) = field_text(item, "name", source) else {
                continue;
            };
            // `mod foo;` is a dependency on another file, `mod foo { .. }` a symbol
            if kind == SymbolKind::Module && item.child_by_field_name("body").is_none() {
                continue;
            }
            result.symbols.push(SymbolDecl { name: name.to_string(), kind, line });
        }

        for node in descendants(root) {
            let line = point_to_u32(node.start_position());
            match node.kind() {
                "mod_item" if node.child_by_field_name("body").is_none() => {
                    let Some(name) = field_text(node, "name", source) else {
                        continue;
                    };
                    let inline = enclosing_modules(node, source);
                    result.dependencies.push(Dependency {
                        spec: DependencySpec::RustMod { name: name.to_string(), inline },
                        line,
                    });
                }
                "use_declaration" => {
                    let Some(argument) = field_text(node, "argument", source) else {
                        continue;
                    };
                    for segments in expand_use_tree(argument) {
                        result.dependencies.push(Dependency {
                            spec: DependencySpec::RustUse { segments },
                            line,
                        });
                    }
                }
                "extern_crate_declaration" => {
                    if let Some(name) = field_text(node, "name", source) {
                        result.dependencies.push(Dependency {
                            spec: DependencySpec::RustUse { segments: vec![name.to_string()] },
                            line,
                        });
                    }
                }
                _ => {}
            }
        }

        for line in source.lines() {
            if let Some(doc) = line.trim_start().strip_prefix("//!") {
                result.doc_terms.extend(tokenize(doc));
            }
        }

        Ok(result.normalize())
    }
}

/// Names of the inline `mod x { .. }` blocks around `node`, outermost first.
fn enclosing_modules(node: Node<'_>, source: &str) -> Vec<String> {
    let mut modules = Vec::new();
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if ancestor.kind() == "mod_item" {
            if let Some(name) = field_text(ancestor, "name", source) {
                modules.push(name.to_string());
            }
        }
        current = ancestor.parent();
    }
    modules.reverse();
    modules
}

/// Expand a `use` tree into one path per imported item.
///
/// `crate::a::{b, c::{d, self}}` yields `crate::a::b`, `crate::a::c::d` and
/// `crate::a::c`. Aliases and globs are dropped.
pub fn expand_use_tree(tree: &str) -> Vec<Vec<String>> {
    let without_aliases = ALIAS.replace_all(tree, "");
    let compact: String = without_aliases.chars().filter(|c| !c.is_whitespace()).collect();
    let mut out = Vec::new();
    expand(&compact, &[], &mut out);
    out
}

fn expand(tree: &str, prefix: &[String], out: &mut Vec<Vec<String>>) {
    match (tree.find('{'), tree.rfind('}')) {
        (Some(open), Some(close)) if open < close => {
            let mut base = prefix.to_vec();
            base.extend(segments(&tree[..open]));
            for item in split_top_level(&tree[open + 1..close]) {
                if item == "self" {
                    if !base.is_empty() {
                        out.push(base.clone());
                    }
                } else {
                    expand(item, &base, out);
                }
            }
        }
        _ => {
            let mut path = prefix.to_vec();
            path.extend(segments(tree));
            if path.last().is_some_and(|last| last == "self") && path.len() > 1 {
                path.pop();
            }
            if !path.is_empty() {
                out.push(path);
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split("::")
        .filter(|segment| !segment.is_empty() && *segment != "*")
        .map(str::to_string)
}

fn split_top_level(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&list[start..]);
    items.into_iter().filter(|item| !item.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::ParserPool;

    fn paths(tree: &str) -> Vec<String> {
        expand_use_tree(tree).into_iter().map(|p| p.join("::")).collect()
    }

    #[test]
    fn expands_nested_groups() {
        assert_eq!(
            paths("crate::graph::{model::{Node, Link}, store, self}"),
            vec![
                "crate::graph::model::Node",
                "crate::graph::model::Link",
                "crate::graph::store",
                "crate::graph",
            ]
        );
    }

    #[test]
    fn drops_aliases_and_globs() {
        assert_eq!(paths("super::config::Settings as Cfg"), vec!["super::config::Settings"]);
        assert_eq!(paths("crate::prelude::*"), vec!["crate::prelude"]);
        assert_eq!(paths("::serde::Serialize"), vec!["serde::Serialize"]);
    }

    #[test]
    fn extracts_mods_uses_symbols_and_docs() {
        let source = r#"//! Trip planning engine

mod planner;
mod inline { fn hidden() {} }
use crate::store::{Cache, self};
use serde::Serialize;

pub struct Itinerary;
pub fn plan() {}
const LIMIT: u32 = 3;
"#;
        let extractor = RustExtractor::new(ParserPool::new(1));
        let result = extractor.extract("src/lib.rs", source).unwrap();

        assert!(!result.parse_errors);
        assert!(result.dependencies.iter().any(|d| d.spec
            == DependencySpec::RustMod { name: "planner".into(), inline: Vec::new() }
            && d.line == 3));
        let uses: Vec<_> = result
            .dependencies
            .iter()
            .filter_map(|d| match &d.spec {
                DependencySpec::RustUse { segments } => Some(segments.join("::")),
                _ => None,
            })
            .collect();
        assert_eq!(uses, vec!["crate::store::Cache", "crate::store", "serde::Serialize"]);

        let names: Vec<_> = result.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["inline", "Itinerary", "plan", "LIMIT"]);
        assert!(result.doc_terms.contains(&"planning".to_string()));
    }

    #[test]
    fn declarations_inside_inline_modules_keep_their_path() {
        let source = "mod net {\n    pub mod http {\n        mod client;\n    }\n}\nmod store;\n";
        let extractor = RustExtractor::new(ParserPool::new(1));
        let result = extractor.extract("src/lib.rs", source).unwrap();

        let mods: Vec<_> = result
            .dependencies
            .iter()
            .filter_map(|d| match &d.spec {
                DependencySpec::RustMod { name, inline } => Some((inline.join("::"), name.as_str(), d.line)),
                _ => None,
            })
            .collect();
        assert_eq!(mods, vec![("net::http".to_string(), "client", 3), (String::new(), "store", 6)]);
    }
}
