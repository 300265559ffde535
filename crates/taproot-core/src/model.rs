//! Core data structures for the knowledge graph

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Unique, stable identifier for a node.
///
/// Derived from the node's kind and path, so rebuilding an unchanged tree
/// yields identical ids. Serialized as a 16-digit hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(kind: NodeKind, path: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        path.hash(&mut hasher);
        NodeId(hasher.finish())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    /// Accepts only the wire form: exactly 16 lower-case hex digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::InvalidArgument(format!("malformed node id: {s:?}"));
        if s.len() != 16 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(malformed());
        }
        u64::from_str_radix(s, 16).map(NodeId).map_err(|_| malformed())
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for NodeId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Content fingerprint of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        Fingerprint(hasher.finish())
    }
}

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Symbol,
    /// A dependency outside the indexed tree.
    External,
}

/// Supported languages for dependency extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    C,
    Cpp,
    Markdown,
    Other,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext);
        match ext {
            Some("rs") => Language::Rust,
            Some("ts") | Some("tsx") | Some("mts") | Some("cts") => Language::TypeScript,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            Some("py") | Some("pyi") => Language::Python,
            Some("c") | Some("h") => Language::C,
            Some("cpp") | Some("cc") | Some("cxx") | Some("hpp") | Some("hh") => Language::Cpp,
            Some("md") | Some("mdx") => Language::Markdown,
            _ => Language::Other,
        }
    }

    /// Whether files of this language become graph nodes.
    pub fn is_indexed(self) -> bool {
        self != Language::Other
    }
}

/// Kind of a top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Struct,
    Enum,
    Trait,
    Interface,
    TypeAlias,
    Constant,
    Module,
}

/// Auxiliary node attributes. Informational only; traversal never reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub language: Option<Language>,
    pub size: Option<u64>,
    pub fingerprint: Option<Fingerprint>,
    pub symbol_kind: Option<SymbolKind>,
    pub line: Option<u32>,
    pub parse_errors: bool,
    pub extra: BTreeMap<String, String>,
}

/// A single node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub path: String,
    pub kind: NodeKind,
    /// Search terms with their occurrence counts.
    pub tokens: BTreeMap<String, u32>,
    pub metadata: NodeMetadata,
}

impl Node {
    /// Build a node whose id is derived from `kind` and `path`.
    pub fn new(kind: NodeKind, path: impl Into<String>) -> Self {
        let path = path.into();
        Node {
            id: NodeId::new(kind, &path),
            path,
            kind,
            tokens: BTreeMap::new(),
            metadata: NodeMetadata::default(),
        }
    }

    /// Add every token of `text` to the node's token counts.
    pub fn add_terms(&mut self, text: &str) {
        for term in crate::tokenize::tokenize(text) {
            *self.tokens.entry(term).or_insert(0) += 1;
        }
    }

    pub fn with_terms(mut self, text: &str) -> Self {
        self.add_terms(text);
        self
    }
}

/// What kind of dependency a link represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Module/package import (`use`, `import`, `require`).
    Imports,
    /// Textual inclusion (`#include`).
    Includes,
    /// Module declaration (`mod foo;`).
    Declares,
    /// Documentation-only reference (Markdown link).
    References,
    /// File → top-level symbol it declares.
    Defines,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Imports => "imports",
            Relation::Includes => "includes",
            Relation::Declares => "declares",
            Relation::References => "references",
            Relation::Defines => "defines",
        }
    }
}

impl FromStr for Relation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imports" => Ok(Relation::Imports),
            "includes" => Ok(Relation::Includes),
            "declares" => Ok(Relation::Declares),
            "references" => Ok(Relation::References),
            "defines" => Ok(Relation::Defines),
            other => Err(Error::InvalidArgument(format!("unknown relation: {other:?}"))),
        }
    }
}

/// A directed dependency: `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "from_id")]
    pub from: NodeId,
    #[serde(rename = "to_id")]
    pub to: NodeId,
    pub relation: Relation,
    /// Where in the source this relationship is expressed.
    pub line: Option<u32>,
}

impl Link {
    pub fn new(from: NodeId, to: NodeId, relation: Relation) -> Self {
        Link { from, to, relation, line: None }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// Which way to follow links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    /// "Who depends on this node."
    #[default]
    Incoming,
    Both,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outgoing" => Ok(Direction::Outgoing),
            "incoming" => Ok(Direction::Incoming),
            "both" => Ok(Direction::Both),
            other => Err(Error::InvalidArgument(format!(
                "direction must be incoming, outgoing or both, got {other:?}"
            ))),
        }
    }
}

/// A top-level declaration found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDecl {
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
}

/// A dependency as written in source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencySpec {
    /// `mod name;`, inside the inline modules `inline` (outermost first).
    RustMod { name: String, inline: Vec<String> },
    /// `use a::b::c;` with groups already expanded.
    RustUse { segments: Vec<String> },
    /// `import a.b` (`names` empty) or `from ..a import x, y` (`level` = dots).
    PythonImport { module: String, names: Vec<String>, level: u32 },
    /// `import … from "spec"`, `require("spec")`, `import("spec")`.
    JsImport { specifier: String },
    /// `#include "header"` or `#include <header>`.
    CInclude { header: String, system: bool },
    /// `[text](target)` in documentation.
    DocLink { target: String },
}

impl DependencySpec {
    pub fn relation(&self) -> Relation {
        match self {
            DependencySpec::RustMod { .. } => Relation::Declares,
            DependencySpec::RustUse { .. }
            | DependencySpec::PythonImport { .. }
            | DependencySpec::JsImport { .. } => Relation::Imports,
            DependencySpec::CInclude { .. } => Relation::Includes,
            DependencySpec::DocLink { .. } => Relation::References,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub spec: DependencySpec,
    pub line: u32,
}

/// Everything one build learned about one file.
///
/// Records of unchanged files are shared between consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub language: Language,
    pub size: u64,
    pub fingerprint: Fingerprint,
    pub symbols: Vec<SymbolDecl>,
    pub dependencies: Vec<Dependency>,
    pub doc_terms: Vec<String>,
    pub parse_errors: bool,
}

/// A file that was skipped during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildWarning {
    pub path: String,
    pub message: String,
}

/// Counters describing one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub files_seen: usize,
    pub parsed: usize,
    pub reused: usize,
    pub skipped: usize,
    pub unresolved: usize,
    pub elapsed_ms: u64,
}
