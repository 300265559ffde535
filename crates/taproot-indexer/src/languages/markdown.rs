//! Markdown extractor: headings become search terms, relative links become
//! references.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use taproot_core::tokenize::tokenize;
use taproot_core::{Dependency, DependencySpec};

use crate::extractor::{ExtractionResult, LanguageExtractor, line_of};

static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]\n]*\]\(([^)\n]+)\)").expect("valid regex"));

static REFERENCE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}\[[^\]\n]+\]:[ \t]*(\S+)").expect("valid regex"));

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+(.+)$").expect("valid regex"));

static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("valid regex"));

pub struct MarkdownExtractor;

/// The path part of a link destination, or `None` for URLs and pure anchors.
fn link_target(raw: &str) -> Option<String> {
    let destination = raw.trim();
    // `[x](<a b.md> "title")` and `[x](a.md "title")`
    let destination = match destination.strip_prefix('<') {
        Some(rest) => rest.split('>').next().unwrap_or_default(),
        None => destination.split_whitespace().next().unwrap_or_default(),
    };
    if destination.is_empty() || destination.starts_with('#') || SCHEME.is_match(destination) {
        return None;
    }
    let path = destination
        .split(['#', '?'])
        .next()
        .unwrap_or_default();
    (!path.is_empty()).then(|| path.to_string())
}

impl LanguageExtractor for MarkdownExtractor {
    fn extract(&self, _path: &str, source: &str) -> Result<ExtractionResult> {
        let mut result = ExtractionResult::default();

        let links = INLINE_LINK.captures_iter(source).chain(REFERENCE_DEF.captures_iter(source));
        for captures in links {
            let Some(destination) = captures.get(1) else {
                continue;
            };
            if let Some(target) = link_target(destination.as_str()) {
                result.dependencies.push(Dependency {
                    spec: DependencySpec::DocLink { target },
                    line: line_of(source, destination.start()),
                });
            }
        }

        for captures in HEADING.captures_iter(source) {
            if let Some(heading) = captures.get(1) {
                result.doc_terms.extend(tokenize(heading.as_str()));
            }
        }

        Ok(result.normalize())
    }
}
