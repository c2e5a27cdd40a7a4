use depgraph_core::{BuildContext, PathResolver};
use depgraph_graph::ArtifactGraph;
use ignore::WalkBuilder;

use crate::error::Result;

/// Walk every configured source root looking for `.proto` files and register
/// a node for each one found. Uses the `ignore` crate's walker (the same
/// traversal machinery build tooling typically already depends on) rather
/// than hand-rolled recursion, so `.gitignore`-style exclusions are honored.
pub fn find_proto_files(graph: &mut ArtifactGraph, ctx: &BuildContext, resolver: &PathResolver) -> Result<()> {
    for root in ctx.source_roots() {
        if !root.is_dir() {
            continue;
        }
        let provenance = format!("proto files in {}", root.display());
        let walker = WalkBuilder::new(root).hidden(false).build();
        for entry in walker {
            let entry = entry.map_err(|e| crate::error::IngestError::Io {
                path: root.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("proto") {
                graph.find_or_create(path, &provenance, resolver);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::BuildContext;

    #[test]
    fn discovers_proto_files_under_every_source_root() {
        let tmp = tempfile::tempdir().unwrap();
        let build_root = tmp.path().join("build");
        let src_root = tmp.path().join("src");
        std::fs::create_dir_all(&build_root).unwrap();
        std::fs::create_dir_all(src_root.join("yb/common")).unwrap();
        std::fs::write(src_root.join("yb/common/wire_protocol.proto"), b"").unwrap();
        std::fs::write(src_root.join("yb/common/not_proto.txt"), b"").unwrap();

        let ctx = BuildContext::new(&build_root, &src_root).unwrap();
        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        find_proto_files(&mut graph, &ctx, &resolver).unwrap();

        assert_eq!(graph.len(), 1);
    }
}
