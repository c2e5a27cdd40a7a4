use std::path::PathBuf;

use depgraph_core::BuildContext;

use crate::artifact_graph::{ArtifactGraph, NodeIndex};
use crate::error::{GraphError, Result};
use crate::matcher::{cmake_target_name, generation_target_name};
use crate::target_graph::TargetGraph;

/// Every node's path must exist on disk, unless the graph was built from an
/// `--incomplete-build` tree (a build that failed partway through, where
/// missing artifacts are expected rather than a graph-construction bug).
pub fn validate_existence(graph: &ArtifactGraph, ctx: &BuildContext) -> Result<()> {
    if ctx.incomplete_build {
        return Ok(());
    }
    for (_, node) in graph.nodes() {
        if !node.path.exists() {
            return Err(GraphError::MissingArtifact(
                node.path.display().to_string(),
                node.provenance.clone(),
            ));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InStack,
    Done,
}

/// Detect circular dependencies with an explicit frame stack (node, its
/// forward-dep list, and a cursor into it) instead of recursion, so graphs
/// with dependency chains far deeper than a handful of call frames don't blow
/// the stack.
pub fn check_acyclic(graph: &ArtifactGraph) -> Result<()> {
    let n = graph.len();
    let mut state = vec![VisitState::Unvisited; n];

    for start in 0..n {
        if state[start] != VisitState::Unvisited {
            continue;
        }
        let mut frames: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
        state[start] = VisitState::InStack;
        frames.push((start, graph.get(start).deps.iter().copied().collect(), 0));

        while let Some((cur, deps, pos)) = frames.last_mut() {
            if *pos < deps.len() {
                let dep = deps[*pos];
                *pos += 1;
                match state[dep] {
                    VisitState::Unvisited => {
                        state[dep] = VisitState::InStack;
                        frames.push((dep, graph.get(dep).deps.iter().copied().collect(), 0));
                    }
                    VisitState::InStack => {
                        let chain: Vec<String> = frames
                            .iter()
                            .map(|(idx, _, _)| graph.get(*idx).path.display().to_string())
                            .collect();
                        return Err(GraphError::Cycle(chain.join(" -> ")));
                    }
                    VisitState::Done => {}
                }
            } else {
                state[*cur] = VisitState::Done;
                frames.pop();
            }
        }
    }
    Ok(())
}

/// Make sure every `.cc.o` that includes a protobuf-generated header also
/// transitively depends, at the target-graph level, on the target that
/// generates that header. Collects every violation before returning a single
/// error, rather than failing on the first one found.
pub fn validate_proto_deps(
    graph: &ArtifactGraph,
    target_graph: &TargetGraph,
    ctx: &BuildContext,
) -> Result<()> {
    let mut errors = Vec::new();

    for (_, node) in graph.nodes() {
        if !node.path.to_string_lossy().ends_with(".pb.cc.o") {
            continue;
        }
        let source_deps: Vec<NodeIndex> = node
            .deps
            .iter()
            .copied()
            .filter(|&d| graph.get(d).path.to_string_lossy().ends_with(".cc"))
            .collect();
        if source_deps.len() != 1 {
            return Err(GraphError::ProtoDependency(format!(
                "could not identify a single source dependency of '{}'; found {}",
                node.path.display(),
                source_deps.len()
            )));
        }

        let source_dep = graph.get(source_deps[0]);
        let source_str = source_dep.path.to_string_lossy();
        let trimmed = source_str.strip_suffix(".cc").unwrap_or(&source_str);
        let pb_h_path = PathBuf::from(format!("{trimmed}.h"));

        let Some(pb_h_idx) = graph.find_by_path(&pb_h_path) else {
            errors.push(format!(
                "no graph node found for generated header '{}'",
                pb_h_path.display()
            ));
            continue;
        };
        let pb_h_node = graph.get(pb_h_idx);
        let rel_to_build_root = pb_h_node
            .path
            .strip_prefix(&ctx.build_root)
            .unwrap_or(&pb_h_node.path)
            .to_path_buf();
        let Some(proto_gen_target) = generation_target_name(&rel_to_build_root) else {
            continue;
        };

        for &rev_dep in &pb_h_node.reverse_deps {
            let rev_node = graph.get(rev_dep);
            if !rev_node.path.to_string_lossy().ends_with(".cc.o") {
                continue;
            }
            for binary_idx in graph.containing_binaries_of_object(rev_dep) {
                let binary = graph.get(binary_idx);
                let Some(binary_target) =
                    cmake_target_name(&binary.path, binary.kind, &ctx.source_root)
                else {
                    continue;
                };
                let recursive = target_graph.recursive_deps(&binary_target);
                if !recursive.contains(&proto_gen_target) {
                    errors.push(format!(
                        "target '{binary_target}' does not depend directly or indirectly on \
                         target '{proto_gen_target}' but uses generated header '{}'",
                        pb_h_node.path.display()
                    ));
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(GraphError::ProtoDependency(errors.join("\n")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::{BuildContext, PathResolver};

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
    fn detects_a_two_node_cycle() {
        let (_tmp, ctx) = fixture();
        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        let a = graph.find_or_create(&ctx.build_root.join("a.o"), "t", &resolver);
        let b = graph.find_or_create(&ctx.build_root.join("b.o"), "t", &resolver);
        graph.add_edge(a, b).unwrap();
        graph.add_edge(b, a).unwrap();
        assert!(check_acyclic(&graph).is_err());
    }

    #[test]
    fn accepts_a_dag() {
        let (_tmp, ctx) = fixture();
        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        let a = graph.find_or_create(&ctx.build_root.join("a.o"), "t", &resolver);
        let b = graph.find_or_create(&ctx.build_root.join("b.o"), "t", &resolver);
        let c = graph.find_or_create(&ctx.build_root.join("c.o"), "t", &resolver);
        graph.add_edge(a, b).unwrap();
        graph.add_edge(b, c).unwrap();
        assert!(check_acyclic(&graph).is_ok());
    }

    #[test]
    fn validate_existence_passes_for_incomplete_build() {
        let (_tmp, mut ctx) = fixture();
        ctx.incomplete_build = true;
        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        graph.find_or_create(&ctx.build_root.join("missing.o"), "t", &resolver);
        assert!(validate_existence(&graph, &ctx).is_ok());
    }

    #[test]
    fn validate_existence_fails_for_missing_artifact_on_complete_build() {
        let (_tmp, ctx) = fixture();
        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        graph.find_or_create(&ctx.build_root.join("missing.o"), "t", &resolver);
        assert!(validate_existence(&graph, &ctx).is_err());
    }
}
