//! C and C++ extractor
//!
//! Only `#include` directives and a few top-level declarations are needed, so
//! this works on the preprocessor text directly.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use taproot_core::{Dependency, DependencySpec, SymbolDecl, SymbolKind};

use crate::extractor::{ExtractionResult, LanguageExtractor, line_of};

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*#[ \t]*include[ \t]*(?:"([^"\n]+)"|<([^>\n]+)>)"#).expect("valid regex")
});

static TYPE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:typedef[ \t]+)?(struct|class|enum|union)[ \t]+([A-Za-z_]\w*)[ \t]*(?:final[ \t]*)?[:{]")
        .expect("valid regex")
});

static FUNCTION_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[A-Za-z_][\w \t\*&:<>,]*?[ \t\*&]([A-Za-z_]\w*)[ \t]*\([^;{}]*\)[ \t]*(?:const[ \t]*)?\{")
        .expect("valid regex")
});

const KEYWORDS: &[&str] = &["if", "for", "while", "switch", "return", "else", "do", "sizeof"];

pub struct CExtractor;

impl LanguageExtractor for CExtractor {
    fn extract(&self, _path: &str, source: &str) -> Result<ExtractionResult> {
        let mut result = ExtractionResult::default();

        for captures in INCLUDE.captures_iter(source) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let (header, system) = match (captures.get(1), captures.get(2)) {
                (Some(quoted), _) => (quoted.as_str(), false),
                (None, Some(angled)) => (angled.as_str(), true),
                (None, None) => continue,
            };
            result.dependencies.push(Dependency {
                spec: DependencySpec::CInclude { header: header.trim().to_string(), system },
                line: line_of(source, whole.start()),
            });
        }

        for captures in TYPE_DECL.captures_iter(source) {
            let (Some(keyword), Some(name)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            let kind = match keyword.as_str() {
                "enum" => SymbolKind::Enum,
                "class" => SymbolKind::Class,
                _ => SymbolKind::Struct,
            };
            result.symbols.push(SymbolDecl {
                name: name.as_str().to_string(),
                kind,
                line: line_of(source, name.start()),
            });
        }

        for captures in FUNCTION_DEF.captures_iter(source) {
            let Some(name) = captures.get(1) else {
                continue;
            };
            if KEYWORDS.contains(&name.as_str()) {
                continue;
            }
            result.symbols.push(SymbolDecl {
                name: name.as_str().to_string(),
                kind: SymbolKind::Function,
                line: line_of(source, name.start()),
            });
        }

        Ok(result.normalize())
    }
}
