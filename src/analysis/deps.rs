//! Project dependency graph and one-hop import queries.
//!
//! [`ImportGraphBuilder`] loads every source file under a project root,
//! extracts relative import specifiers lexically and resolves them to
//! files inside the project. Package imports (`react`, `os`, crates) never
//! become edges. [`CachingGraphBuilder`] can be layered on top to reuse a
//! graph while the project contents are unchanged.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use regex::Regex;
use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

use crate::config::AnalysisConfig;
use crate::diff::{DiffError, load_files};
use crate::models::{DependencyResult, FileRecord};

/// Errors while constructing a dependency graph.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("failed to walk project {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: DiffError,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("graph build task failed: {0}")]
    Task(String),
}

/// Directed import graph over project files.
///
/// Edges point from the importing file to the imported file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: IndexMap<PathBuf, IndexSet<PathBuf>>,
}

impl DependencyGraph {
    pub fn add_node(&mut self, file: PathBuf) {
        self.edges.entry(file).or_default();
    }

    pub fn add_edge(&mut self, from: PathBuf, to: PathBuf) {
        self.add_node(to.clone());
        self.edges.entry(from).or_default().insert(to);
    }

    /// Files `file` imports directly.
    pub fn dependencies(&self, file: &Path) -> IndexSet<PathBuf> {
        self.edges.get(file).cloned().unwrap_or_default()
    }

    /// Files that import `file` directly.
    pub fn dependents(&self, file: &Path) -> IndexSet<PathBuf> {
        self.edges
            .iter()
            .filter(|(_, targets)| targets.contains(file))
            .map(|(source, _)| source.clone())
            .collect()
    }

    /// Number of files in the graph.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of import edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(IndexSet::len).sum()
    }
}

/// Builds a [`DependencyGraph`] for a project root.
///
/// Blocking; async callers go through [`DependencyResolver`].
pub trait GraphBuilder: Send + Sync {
    fn build(&self, root: &Path) -> Result<DependencyGraph, GraphError>;

    /// Build from sources the caller has already read from `root`.
    fn build_from_records(
        &self,
        root: &Path,
        records: &[FileRecord],
    ) -> Result<DependencyGraph, GraphError>;
}

/// Which files make up a project, shared by builders that load it.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
}

impl SourceFilter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            exclude_dirs: config.exclude.clone(),
        }
    }

    fn load(&self, root: &Path) -> Result<Vec<FileRecord>, GraphError> {
        load_files(root, &self.extensions, &self.exclude_dirs).map_err(|source| GraphError::Walk {
            root: root.to_path_buf(),
            source,
        })
    }
}

/// Lexical import-graph builder for JS/TS, Python and Rust sources.
#[derive(Debug, Clone)]
pub struct ImportGraphBuilder {
    filter: SourceFilter,
}

impl ImportGraphBuilder {
    pub fn new(filter: SourceFilter) -> Self {
        Self { filter }
    }

    fn graph_from(records: &[FileRecord]) -> DependencyGraph {
        let known: HashSet<&Path> = records.iter().map(|r| r.path.as_path()).collect();

        let resolved: Vec<(PathBuf, Vec<PathBuf>)> = records
            .par_iter()
            .map(|record| {
                let targets = import_candidates(&record.path, &record.content)
                    .into_iter()
                    .filter_map(|candidates| {
                        candidates
                            .into_iter()
                            .find(|c| c != &record.path && known.contains(c.as_path()))
                    })
                    .collect();
                (record.path.clone(), targets)
            })
            .collect();

        let mut graph = DependencyGraph::default();
        for (file, targets) in resolved {
            graph.add_node(file.clone());
            for target in targets {
                graph.add_edge(file.clone(), target);
            }
        }
        graph
    }
}

impl GraphBuilder for ImportGraphBuilder {
    fn build(&self, root: &Path) -> Result<DependencyGraph, GraphError> {
        let records = self.filter.load(root)?;
        self.build_from_records(root, &records)
    }

    fn build_from_records(
        &self,
        root: &Path,
        records: &[FileRecord],
    ) -> Result<DependencyGraph, GraphError> {
        let graph = Self::graph_from(records);
        tracing::debug!(
            root = %root.display(),
            files = graph.len(),
            edges = graph.edge_count(),
            "built dependency graph"
        );
        Ok(graph)
    }
}

/// Reuses a previously built graph while the project contents are unchanged.
///
/// Keyed by project root and an xxh3 fingerprint of every source file.
pub struct CachingGraphBuilder<B> {
    inner: B,
    filter: SourceFilter,
    cache: Mutex<HashMap<PathBuf, (u64, DependencyGraph)>>,
}

impl<B: GraphBuilder> CachingGraphBuilder<B> {
    pub fn new(inner: B, filter: SourceFilter) -> Self {
        Self {
            inner,
            filter,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<B: GraphBuilder> GraphBuilder for CachingGraphBuilder<B> {
    fn build(&self, root: &Path) -> Result<DependencyGraph, GraphError> {
        let key = root.canonicalize().map_err(|source| GraphError::Read {
            path: root.to_path_buf(),
            source,
        })?;
        let records = self.filter.load(&key)?;
        self.build_from_records(&key, &records)
    }

    fn build_from_records(
        &self,
        root: &Path,
        records: &[FileRecord],
    ) -> Result<DependencyGraph, GraphError> {
        let key = root.to_path_buf();
        let fingerprint = fingerprint(records);

        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((fp, graph)) = cache.get(&key)
                && *fp == fingerprint
            {
                tracing::debug!(root = %key.display(), "dependency graph cache hit");
                return Ok(graph.clone());
            }
        }

        let graph = self.inner.build_from_records(&key, records)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, (fingerprint, graph.clone()));
        Ok(graph)
    }
}

/// Order-independent content fingerprint of a set of files.
fn fingerprint(records: &[FileRecord]) -> u64 {
    let mut sorted: Vec<&FileRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut hasher = Xxh3::new();
    for record in sorted {
        hasher.update(record.path.as_os_str().as_encoded_bytes());
        hasher.update(&[0]);
        hasher.update(record.content.as_bytes());
        hasher.update(&[0]);
    }
    hasher.digest()
}

/// Answers one-hop dependency queries. Never fails.
#[derive(Clone)]
pub struct DependencyResolver {
    builder: Arc<dyn GraphBuilder>,
}

impl DependencyResolver {
    pub fn new(builder: Arc<dyn GraphBuilder>) -> Self {
        Self { builder }
    }

    /// Build the project graph off the async runtime.
    pub async fn graph(&self, root: &Path) -> Result<Arc<DependencyGraph>, GraphError> {
        let builder = Arc::clone(&self.builder);
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || builder.build(&root))
            .await
            .map_err(|e| GraphError::Task(e.to_string()))?
            .map(Arc::new)
    }

    /// Direct imports and importers of `file` within `root`.
    ///
    /// Any failure is logged and yields empty sets.
    pub async fn resolve(&self, file: &Path, root: &Path) -> DependencyResult {
        match self.graph(root).await {
            Ok(graph) => Self::lookup(&graph, file),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "dependency graph unavailable");
                DependencyResult::default()
            }
        }
    }

    /// Query an already built graph.
    pub fn lookup(graph: &DependencyGraph, file: &Path) -> DependencyResult {
        let file = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
        DependencyResult {
            dependencies: graph.dependencies(&file),
            dependents: graph.dependents(&file),
        }
    }
}

// ── Import extraction ───────────────────────────────────────────────

const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs"];

static SCRIPT_IMPORT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // import x from '...', import {a, b} from '...', import '...'
        r#"\bimport\s+(?:[\w*${}\s,]+?\s+from\s+)?["']([^"'\n]+)["']"#,
        r#"\bexport\s+[\w*${}\s,]+?\s+from\s+["']([^"'\n]+)["']"#,
        r#"\brequire\s*\(\s*["']([^"'\n]+)["']\s*\)"#,
        r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid import regex"))
    .collect()
});

static PYTHON_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*from[ \t]+(\.+)([\w.]*)[ \t]+import[ \t]+\(?([\w \t,*]+)")
        .expect("valid import regex")
});

static RUST_MOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?mod[ \t]+(\w+)[ \t]*;")
        .expect("valid import regex")
});

/// For each import in `content`, the paths it may refer to, in
/// resolution order.
fn import_candidates(path: &Path, content: &str) -> Vec<Vec<PathBuf>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let Some(dir) = path.parent() else {
        return Vec::new();
    };

    match ext.as_str() {
        e if SCRIPT_EXTENSIONS.contains(&e) => script_candidates(dir, content),
        "py" => python_candidates(dir, content),
        "rs" => rust_candidates(path, dir, content),
        _ => Vec::new(),
    }
}

fn script_candidates(dir: &Path, content: &str) -> Vec<Vec<PathBuf>> {
    let mut out = Vec::new();
    for re in SCRIPT_IMPORT_RES.iter() {
        for caps in re.captures_iter(content) {
            let spec = &caps[1];
            if !(spec.starts_with("./") || spec.starts_with("../") || spec == "." || spec == "..") {
                continue;
            }
            let base = normalize(&dir.join(spec));
            let mut candidates = vec![base.clone()];
            for ext in SCRIPT_EXTENSIONS {
                candidates.push(append_extension(&base, ext));
            }
            for ext in SCRIPT_EXTENSIONS {
                candidates.push(base.join(format!("index.{ext}")));
            }
            out.push(candidates);
        }
    }
    out
}

fn python_candidates(dir: &Path, content: &str) -> Vec<Vec<PathBuf>> {
    let mut out = Vec::new();
    for caps in PYTHON_IMPORT_RE.captures_iter(content) {
        let mut base = dir.to_path_buf();
        for _ in 1..caps[1].len() {
            base.pop();
        }
        let module = &caps[2];

        if module.is_empty() {
            // from . import a, b
            for name in caps[3].split(',') {
                let name = name.split_whitespace().next().unwrap_or_default();
                if name.is_empty() || name == "*" {
                    continue;
                }
                out.push(python_module_paths(&base.join(name)));
            }
        } else {
            let mut target = base;
            for part in module.split('.').filter(|p| !p.is_empty()) {
                target.push(part);
            }
            out.push(python_module_paths(&target));
        }
    }
    out
}

fn python_module_paths(base: &Path) -> Vec<PathBuf> {
    vec![append_extension(base, "py"), base.join("__init__.py")]
}

fn rust_candidates(path: &Path, dir: &Path, content: &str) -> Vec<Vec<PathBuf>> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let module_dir = if matches!(stem, "mod" | "lib" | "main") {
        dir.to_path_buf()
    } else {
        dir.join(stem)
    };

    RUST_MOD_RE
        .captures_iter(content)
        .map(|caps| {
            let name = &caps[1];
            vec![module_dir.join(format!("{name}.rs")), module_dir.join(name).join("mod.rs")]
        })
        .collect()
}

/// `foo/bar` + `ts` → `foo/bar.ts` (keeps any existing dotted suffix).
fn append_extension(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
