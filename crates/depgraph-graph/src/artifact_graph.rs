use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use depgraph_core::{classify_path, BuildContext, NodeKind, PathResolver};
use regex::Regex;

use crate::error::{GraphError, Result};

pub type NodeIndex = usize;

/// A single artifact node: a concrete filesystem path plus its classification
/// and its edges. Edge sets are `NodeIndex`es into the owning `ArtifactGraph`
/// rather than `Rc<RefCell<..>>` pointers, so traversal never has to fight the
/// borrow checker and the whole graph can be iterated immutably.
#[derive(Debug, Clone)]
pub struct ArtifactNode {
    pub path: PathBuf,
    pub kind: NodeKind,
    pub provenance: String,
    pub deps: HashSet<NodeIndex>,
    pub reverse_deps: HashSet<NodeIndex>,
    /// Populated by `ArtifactGraph::finalize`; `None` until then and for nodes
    /// that never resolve to a target (see the matcher's naming rules).
    pub matched_target: Option<String>,
}

impl ArtifactNode {
    fn new(path: PathBuf, provenance: String) -> Self {
        let kind = classify_path(&path);
        Self {
            path,
            kind,
            provenance,
            deps: HashSet::new(),
            reverse_deps: HashSet::new(),
            matched_target: None,
        }
    }
}

/// The build-artifact dependency graph: nodes keyed by canonical path, with
/// lazily-built secondary indices (basename -> nodes) that are only ever
/// populated after the graph is frozen (post matcher / proto-inference).
pub struct ArtifactGraph<'a> {
    pub ctx: &'a BuildContext,
    nodes: Vec<ArtifactNode>,
    index_by_path: HashMap<PathBuf, NodeIndex>,
    basename_index: RefCell<Option<HashMap<String, Vec<NodeIndex>>>>,
}

impl<'a> ArtifactGraph<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self {
            ctx,
            nodes: Vec::new(),
            index_by_path: HashMap::new(),
            basename_index: RefCell::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, idx: NodeIndex) -> &ArtifactNode {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &ArtifactNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<NodeIndex> {
        self.index_by_path.get(path).copied()
    }

    /// Find (or create) a node for `path`, canonicalizing it first so that
    /// equivalent paths collapse onto one node. `provenance` is a free-form
    /// diagnostic string naming the metadata file that introduced the node;
    /// it is ignored for nodes that already exist.
    pub fn find_or_create(
        &mut self,
        path: &Path,
        provenance: &str,
        resolver: &PathResolver,
    ) -> NodeIndex {
        let canonical = resolver.canonicalize(path);
        if let Some(&idx) = self.index_by_path.get(&canonical) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes
            .push(ArtifactNode::new(canonical.clone(), provenance.to_string()));
        self.index_by_path.insert(canonical, idx);
        self.basename_index.replace(None);
        idx
    }

    /// Add a directed dependency edge `from -> to` (`from` depends on `to`).
    /// Rejects self-edges; does not itself check for cycles (that is the
    /// validator's job, run once after the whole graph is built).
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> Result<()> {
        if from == to {
            return Err(GraphError::SelfEdge(self.nodes[from].path.display().to_string()));
        }
        self.nodes[from].deps.insert(to);
        self.nodes[to].reverse_deps.insert(from);
        Ok(())
    }

    fn basename_of(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Lazily build and query the basename -> nodes index. Any node added
    /// after the first call to this function will not appear in the index --
    /// by design, this is only queried once the graph is frozen.
    pub fn find_by_basename(&self, basename: &str) -> Vec<NodeIndex> {
        if self.basename_index.borrow().is_none() {
            let mut map: HashMap<String, Vec<NodeIndex>> = HashMap::new();
            for (idx, node) in self.nodes.iter().enumerate() {
                map.entry(Self::basename_of(&node.path)).or_default().push(idx);
            }
            self.basename_index.replace(Some(map));
        }
        self.basename_index
            .borrow()
            .as_ref()
            .and_then(|m| m.get(basename).cloned())
            .unwrap_or_default()
    }

    pub fn find_by_regex(&self, re: &Regex) -> Vec<NodeIndex> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| re.is_match(&node.path.to_string_lossy()))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Iterative DFS over forward edges (dependencies), starting from `start`.
    /// Does not include `start` itself unless it is reachable via a cycle
    /// through another start node.
    pub fn forward_closure(&self, start: &HashSet<NodeIndex>) -> HashSet<NodeIndex> {
        self.closure(start, |node| &node.deps)
    }

    /// Iterative DFS over reverse edges, i.e. every node that transitively
    /// depends on something in `start`.
    pub fn reverse_closure(&self, start: &HashSet<NodeIndex>) -> HashSet<NodeIndex> {
        self.closure(start, |node| &node.reverse_deps)
    }

    fn closure(
        &self,
        start: &HashSet<NodeIndex>,
        edges: impl Fn(&ArtifactNode) -> &HashSet<NodeIndex>,
    ) -> HashSet<NodeIndex> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut worklist: VecDeque<NodeIndex> = start.iter().copied().collect();
        let mut result = HashSet::new();

        while let Some(idx) = worklist.pop_front() {
            if !visited.insert(idx) {
                continue;
            }
            for &next in edges(&self.nodes[idx]) {
                if !start.contains(&next) {
                    result.insert(next);
                }
                if !visited.contains(&next) {
                    worklist.push_back(next);
                }
            }
        }
        result
    }

    /// Direct reverse-deps of an object node whose kind is a library,
    /// executable or test. More than one is allowed (and logged); zero is not
    /// an error -- it simply means the object is not (yet) linked anywhere.
    pub fn containing_binaries_of_object(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let node = &self.nodes[idx];
        debug_assert_eq!(node.kind, NodeKind::Object);
        let binaries: Vec<NodeIndex> = node
            .reverse_deps
            .iter()
            .copied()
            .filter(|&r| {
                matches!(
                    self.nodes[r].kind,
                    NodeKind::Library | NodeKind::Executable | NodeKind::Test
                )
            })
            .collect();
        if binaries.len() > 1 {
            tracing::warn!(
                path = %node.path.display(),
                binaries = ?binaries.iter().map(|&b| self.nodes[b].path.display().to_string()).collect::<Vec<_>>(),
                "object is linked into multiple binaries"
            );
        }
        binaries
    }

    /// Containing binaries of a source file, delegated through the unique
    /// object reverse-dep whose path is the source path with `.o` appended.
    pub fn containing_binaries_of_source(&self, idx: NodeIndex) -> Result<Vec<NodeIndex>> {
        let node = &self.nodes[idx];
        debug_assert_eq!(node.kind, NodeKind::Source);
        let object_rev_deps: Vec<NodeIndex> = node
            .reverse_deps
            .iter()
            .copied()
            .filter(|&r| self.nodes[r].path.to_string_lossy().ends_with(".o"))
            .collect();
        if object_rev_deps.len() != 1 {
            return Err(GraphError::AmbiguousReverseDep(
                node.path.display().to_string(),
                object_rev_deps
                    .iter()
                    .map(|&r| self.nodes[r].path.display().to_string())
                    .collect(),
            ));
        }
        Ok(self.containing_binaries_of_object(object_rev_deps[0]))
    }

    pub fn set_matched_target(&mut self, idx: NodeIndex, target: Option<String>) {
        self.nodes[idx].matched_target = target;
    }

    /// Rebuild a graph from persisted `(path, deps)` pairs, where the
    /// position in `entries` is the node's id. Ids must already be dense and
    /// the caller's responsibility (see `persistence::load`); this method
    /// does not re-run classification through `find_or_create` because the
    /// paths are already canonical.
    pub fn from_persisted(ctx: &'a BuildContext, entries: Vec<(PathBuf, HashSet<NodeIndex>)>) -> Self {
        let mut graph = Self::new(ctx);
        for (path, _) in &entries {
            let idx = graph.nodes.len();
            graph
                .nodes
                .push(ArtifactNode::new(path.clone(), "persisted".to_string()));
            graph.index_by_path.insert(path.clone(), idx);
        }
        for (idx, (_, deps)) in entries.into_iter().enumerate() {
            graph.nodes[idx].deps = deps.clone();
            for dep in deps {
                graph.nodes[dep].reverse_deps.insert(idx);
            }
        }
        graph
    }
}
