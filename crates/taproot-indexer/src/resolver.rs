//! Dependency resolution against the discovered tree listing
//!
//! Paths here are root-relative strings with `/` separators. The listing is
//! the only source of truth for what exists.

use std::collections::{BTreeMap, BTreeSet};

use taproot_core::DependencySpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A file in the tree.
    Internal(String),
    /// A package, crate or system header outside the tree.
    External(String),
    /// An in-tree reference whose target does not exist.
    Missing,
}

const JS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts", ".js", ".jsx", ".mjs", ".cjs", ".mts", ".cts"];
const JS_TO_TS: &[(&str, &[&str])] = &[
    (".js", &[".ts", ".tsx"]),
    (".jsx", &[".tsx"]),
    (".mjs", &[".mts"]),
    (".cjs", &[".cts"]),
];

/// Directory part of a path, `""` at the root.
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Join `relative` onto `dir`, folding `.` and `..`. `None` when the result
/// would leave the root.
pub fn join(dir: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

fn child(dir: &str, name: &str) -> String {
    if dir.is_empty() { name.to_string() } else { format!("{dir}/{name}") }
}

pub struct Resolver<'a> {
    listing: &'a BTreeSet<String>,
    /// Library crates of the tree: crate name → its `src` directory.
    crates: Option<&'a BTreeMap<String, String>>,
}

impl<'a> Resolver<'a> {
    pub fn new(listing: &'a BTreeSet<String>) -> Self {
        Self { listing, crates: None }
    }

    pub fn with_crates(mut self, crates: &'a BTreeMap<String, String>) -> Self {
        self.crates = Some(crates);
        self
    }

    fn exists(&self, path: &str) -> bool {
        self.listing.contains(path)
    }

    fn first_existing<I>(&self, candidates: I) -> Option<String>
    where
        I: IntoIterator<Item = String>,
    {
        candidates.into_iter().find(|candidate| self.exists(candidate))
    }

    /// Resolve one dependency of the file at `from`. A Python `from . import
    /// a, b` can name several modules, hence the vector.
    pub fn resolve(&self, from: &str, spec: &DependencySpec) -> Vec<Resolution> {
        match spec {
            DependencySpec::RustMod { name, inline } => vec![self.rust_mod(from, inline, name)],
            DependencySpec::RustUse { segments } => vec![self.rust_use(from, segments)],
            DependencySpec::PythonImport { module, names, level } => self.python(from, module, names, *level),
            DependencySpec::JsImport { specifier } => vec![self.javascript(from, specifier)],
            DependencySpec::CInclude { header, system } => vec![self.include(from, header, *system)],
            DependencySpec::DocLink { target } => vec![self.doc_link(from, target)],
        }
    }

    // ── JavaScript / TypeScript ──────────────────────────────

    fn javascript(&self, from: &str, specifier: &str) -> Resolution {
        let base = if let Some(absolute) = specifier.strip_prefix('/') {
            join("", absolute)
        } else if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
            join(parent(from), specifier)
        } else {
            return Resolution::External(package_name(specifier));
        };
        let Some(base) = base else {
            return Resolution::Missing;
        };

        let mut candidates = vec![base.clone()];
        candidates.extend(JS_EXTENSIONS.iter().map(|ext| format!("{base}{ext}")));
        for (js, ts_exts) in JS_TO_TS {
            if let Some(stem) = base.strip_suffix(js) {
                candidates.extend(ts_exts.iter().map(|ts| format!("{stem}{ts}")));
            }
        }
        candidates.extend(JS_EXTENSIONS.iter().map(|ext| child(&base, &format!("index{ext}"))));

        self.first_existing(candidates)
            .map_or(Resolution::Missing, Resolution::Internal)
    }

    // ── Python ───────────────────────────────────────────────

    fn python_module(&self, dir: &str, dotted: &[&str]) -> Option<String> {
        let base = dotted.iter().fold(dir.to_string(), |acc, seg| child(&acc, seg));
        self.first_existing([
            format!("{base}.py"),
            format!("{base}.pyi"),
            child(&base, "__init__.py"),
        ])
    }

    fn python(&self, from: &str, module: &str, names: &[String], level: u32) -> Vec<Resolution> {
        let dotted: Vec<&str> = module.split('.').filter(|s| !s.is_empty()).collect();

        if level > 0 {
            let mut package = parent(from).to_string();
            for _ in 1..level {
                if package.is_empty() {
                    return vec![Resolution::Missing];
                }
                package = parent(&package).to_string();
            }

            if dotted.is_empty() {
                // `from . import a, b`: each name may be a submodule
                let submodules: Vec<Resolution> = names
                    .iter()
                    .filter_map(|name| self.python_module(&package, &[name.as_str()]))
                    .map(Resolution::Internal)
                    .collect();
                if !submodules.is_empty() {
                    return submodules;
                }
                return vec![
                    self.python_module(&package, &[])
                        .map_or(Resolution::Missing, Resolution::Internal),
                ];
            }
            return vec![
                self.python_module(&package, &dotted)
                    .map_or(Resolution::Missing, Resolution::Internal),
            ];
        }

        let Some(top) = dotted.first() else {
            return vec![Resolution::Missing];
        };
        for dir in [parent(from), ""] {
            for len in (1..=dotted.len()).rev() {
                if let Some(found) = self.python_module(dir, &dotted[..len]) {
                    return vec![Resolution::Internal(found)];
                }
            }
        }
        vec![Resolution::External((*top).to_string())]
    }

    // ── Rust ─────────────────────────────────────────────────

    /// The `src` directory of the crate owning `from`, found through the
    /// nearest `Cargo.toml`.
    fn crate_src(&self, from: &str) -> Option<String> {
        let mut dir = parent(from);
        loop {
            if self.exists(&child(dir, "Cargo.toml")) {
                let src = child(dir, "src");
                return from.starts_with(&format!("{src}/")).then_some(src);
            }
            if dir.is_empty() {
                return None;
            }
            dir = parent(dir);
        }
    }

    /// Cargo target roots that are not named `lib.rs` or `main.rs`:
    /// `build.rs`, files directly under `tests/`, `examples/`, `benches/`
    /// and `src/bin/`.
    fn is_target_root(&self, file: &str) -> bool {
        let dir = parent(file);
        if file_name(file) == "build.rs" {
            return self.exists(&child(dir, "Cargo.toml"));
        }
        let package = parent(dir);
        match file_name(dir) {
            "tests" | "examples" | "benches" => self.exists(&child(package, "Cargo.toml")),
            "bin" => file_name(package) == "src" && self.exists(&child(parent(package), "Cargo.toml")),
            _ => false,
        }
    }

    /// Directory holding the child modules of the module defined in `file`.
    fn module_dir(&self, file: &str) -> String {
        match file_name(file) {
            "mod.rs" | "lib.rs" | "main.rs" => parent(file).to_string(),
            _ if self.is_target_root(file) => parent(file).to_string(),
            name => child(parent(file), name.trim_end_matches(".rs")),
        }
    }

    /// Module path of `file` inside the crate rooted at `src`.
    fn module_path(src: &str, file: &str) -> Vec<String> {
        let Some(inner) = file.strip_prefix(&format!("{src}/")) else {
            return Vec::new();
        };
        let mut segments: Vec<String> = inner.trim_end_matches(".rs").split('/').map(str::to_string).collect();
        if segments.len() == 1 && (segments[0] == "lib" || segments[0] == "main") {
            segments.clear();
        } else if segments.last().is_some_and(|last| last == "mod") {
            segments.pop();
        }
        segments
    }

    fn module_file(&self, src: &str, segments: &[String]) -> Option<String> {
        if segments.is_empty() {
            return self.first_existing([child(src, "lib.rs"), child(src, "main.rs")]);
        }
        let base = child(src, &segments.join("/"));
        self.first_existing([format!("{base}.rs"), child(&base, "mod.rs")])
    }

    /// The file of the deepest module along `full` that exists, stopping at
    /// `min` segments.
    fn deepest_module(&self, src: &str, full: &[String], min: usize) -> Resolution {
        (min..=full.len())
            .rev()
            .find_map(|len| self.module_file(src, &full[..len]))
            .map_or(Resolution::Missing, Resolution::Internal)
    }

    fn rust_mod(&self, from: &str, inline: &[String], name: &str) -> Resolution {
        let dir = inline.iter().fold(self.module_dir(from), |dir, module| child(&dir, module));
        let base = child(&dir, name);
        self.first_existing([format!("{base}.rs"), child(&base, "mod.rs")])
            .map_or(Resolution::Missing, Resolution::Internal)
    }

    fn rust_use(&self, from: &str, segments: &[String]) -> Resolution {
        let Some(first) = segments.first() else {
            return Resolution::Missing;
        };
        let src = self.crate_src(from);

        let (base, rest) = match (first.as_str(), src.as_deref()) {
            ("crate", Some(_)) => (Vec::new(), &segments[1..]),
            ("self" | "super", Some(src)) => {
                let mut base = Self::module_path(src, from);
                let supers = segments.iter().take_while(|s| *s == "super").count();
                for _ in 0..supers {
                    if base.pop().is_none() {
                        return Resolution::Missing;
                    }
                }
                let skip = if first == "self" { 1 } else { supers };
                (base, &segments[skip..])
            }
            ("crate" | "self" | "super", None) => return Resolution::Missing,
            (name, Some(src)) if self.module_file(src, &[name.to_string()]).is_some() => {
                (Vec::new(), &segments[..])
            }
            (name, _) => {
                return match self.crates.and_then(|crates| crates.get(name)) {
                    Some(crate_src) => self.deepest_module(crate_src, &segments[1..], 0),
                    None => Resolution::External(name.to_string()),
                };
            }
        };
        let Some(src) = src else {
            return Resolution::Missing;
        };

        let full: Vec<String> = base.iter().chain(rest).cloned().collect();
        self.deepest_module(&src, &full, base.len())
    }

    // ── C / C++ ──────────────────────────────────────────────

    fn include(&self, from: &str, header: &str, system: bool) -> Resolution {
        if system {
            return Resolution::External(header.to_string());
        }
        [join(parent(from), header), join("", header), join("include", header)]
            .into_iter()
            .flatten()
            .find(|candidate| self.exists(candidate))
            .map_or_else(|| Resolution::External(header.to_string()), Resolution::Internal)
    }

    // ── Markdown ─────────────────────────────────────────────

    fn doc_link(&self, from: &str, target: &str) -> Resolution {
        let joined = match target.strip_prefix('/') {
            Some(absolute) => join("", absolute),
            None => join(parent(from), target),
        };
        let Some(path) = joined else {
            return Resolution::Missing;
        };
        let mut candidates = vec![path.clone()];
        if target.ends_with('/') || !file_name(&path).contains('.') {
            candidates.push(child(&path, "README.md"));
            candidates.push(child(&path, "index.md"));
        }
        self.first_existing(candidates)
            .map_or(Resolution::Missing, Resolution::Internal)
    }
}

/// `@scope/pkg/sub` → `@scope/pkg`, `pkg/sub` → `pkg`.
fn package_name(specifier: &str) -> String {
    let mut parts = specifier.split('/');
    match parts.next() {
        Some(scope) if scope.starts_with('@') => match parts.next() {
            Some(name) => format!("{scope}/{name}"),
            None => scope.to_string(),
        },
        Some(name) => name.to_string(),
        None => specifier.to_string(),
    }
}
