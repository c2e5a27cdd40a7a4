use std::collections::HashSet;
use std::path::{Path, PathBuf};

use depgraph_core::BuildContext;
use serde::{Deserialize, Serialize};

use crate::artifact_graph::{ArtifactGraph, NodeIndex};
use crate::error::Result;

/// On-disk representation of a single node: a dense integer id (its index in
/// the JSON array), its canonical path, and the ids of the nodes it depends
/// on. This is the cache format written to `dependency_graph.json` so a
/// subsequent run can skip re-ingesting build metadata entirely.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedNode {
    id: usize,
    path: String,
    deps: Vec<usize>,
}

pub fn save(graph: &ArtifactGraph, path: &Path) -> Result<()> {
    let nodes: Vec<PersistedNode> = graph
        .nodes()
        .map(|(idx, node)| PersistedNode {
            id: idx,
            path: node.path.to_string_lossy().to_string(),
            deps: node.deps.iter().copied().collect(),
        })
        .collect();
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &nodes)?;
    Ok(())
}

pub fn load<'a>(ctx: &'a BuildContext, path: &Path) -> Result<ArtifactGraph<'a>> {
    let file = std::fs::File::open(path)?;
    let persisted: Vec<PersistedNode> = serde_json::from_reader(file)?;

    let mut entries: Vec<(PathBuf, HashSet<NodeIndex>)> = Vec::with_capacity(persisted.len());
    for (expected_id, node) in persisted.into_iter().enumerate() {
        debug_assert_eq!(node.id, expected_id, "persisted node ids must be dense");
        entries.push((PathBuf::from(node.path), node.deps.into_iter().collect()));
    }
    Ok(ArtifactGraph::from_persisted(ctx, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::PathResolver;

    fn fixture() -> (tempfile::TempDir, BuildContext) {
        let tmp = tempfile::tempdir().unwrap();
        let build_root = tmp.path().join("build");
        let src_root = tmp.path().join("src");
        std::fs::create_dir_all(&build_root).unwrap();
        std::fs::create_dir_all(&src_root).unwrap();
        let ctx = BuildContext::new(&build_root, &src_root).unwrap();
        (tmp, ctx)
    }

    #[test]
    fn round_trips_nodes_and_edge_sets() {
        let (tmp, ctx) = fixture();
        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        let a = graph.find_or_create(&ctx.build_root.join("a.o"), "t", &resolver);
        let b = graph.find_or_create(&ctx.build_root.join("b.o"), "t", &resolver);
        graph.add_edge(a, b).unwrap();

        let cache_path = tmp.path().join("dependency_graph.json");
        save(&graph, &cache_path).unwrap();
        let reloaded = load(&ctx, &cache_path).unwrap();

        assert_eq!(reloaded.len(), graph.len());
        let reloaded_a = reloaded.find_by_path(&ctx.build_root.join("a.o")).unwrap();
        let reloaded_b = reloaded.find_by_path(&ctx.build_root.join("b.o")).unwrap();
        assert!(reloaded.get(reloaded_a).deps.contains(&reloaded_b));
        assert!(reloaded.get(reloaded_b).reverse_deps.contains(&reloaded_a));
    }
}
