//! Language extractor trait definition

use taproot_core::{Dependency, SymbolDecl};

/// What one source file declares: top-level symbols, raw dependencies and
/// free-text documentation terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub symbols: Vec<SymbolDecl>,
    pub dependencies: Vec<Dependency>,
    pub doc_terms: Vec<String>,
    /// The parser recovered from syntax errors.
    pub parse_errors: bool,
}

impl ExtractionResult {
    /// Order dependencies by line and drop exact repeats.
    pub fn normalize(mut self) -> Self {
        self.dependencies.sort_by(|a, b| a.line.cmp(&b.line));
        let mut seen = Vec::with_capacity(self.dependencies.len());
        self.dependencies.retain(|dep| {
            if seen.contains(&dep.spec) {
                false
            } else {
                seen.push(dep.spec.clone());
                true
            }
        });
        self.symbols.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.name.cmp(&b.name)));
        let mut names = std::collections::HashSet::new();
        self.symbols.retain(|symbol| names.insert(symbol.name.clone()));
        self
    }
}

pub trait LanguageExtractor: Send + Sync {
    fn extract(&self, path: &str, source: &str) -> anyhow::Result<ExtractionResult>;
}

/// 1-based line of a byte offset.
pub(crate) fn line_of(source: &str, offset: usize) -> u32 {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() as u32 + 1
}
