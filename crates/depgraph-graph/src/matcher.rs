use std::collections::HashMap;

use depgraph_core::{BuildContext, NodeKind, ENTERPRISE_SOURCE_PREFIX};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::artifact_graph::{ArtifactGraph, NodeIndex};
use crate::error::{GraphError, Result};
use crate::target_graph::TargetGraph;

static LIBRARY_FILE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^lib(.+)\.(?:so|dylib)$").expect("valid regex"));
static EXECUTABLE_FILE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("valid regex"));
static PROTO_OUTPUT_FILE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z_0-9-]+)\.pb\.(h|cc)$").expect("valid regex"));

/// Derive the synthetic target name CMake generates for a `.proto` file: walk
/// path components from the file up to (not including) the source root,
/// reverse them, prepend `gen`, join with `_`, and fold `@`/`.`/`-` to `_`.
/// Mirrors the `set(TGT_NAME "gen_${PROTO_REL_TO_YB_SRC_ROOT}")` CMake snippet
/// this tool's proto-codegen macros emit.
pub fn schema_target_name(path: &std::path::Path, source_root: &std::path::Path) -> String {
    let mut names = Vec::new();
    let mut cur = path;
    while cur != source_root {
        if let Some(name) = cur.file_name() {
            names.push(name.to_string_lossy().to_string());
        }
        match cur.parent() {
            Some(parent) if parent != cur => cur = parent,
            _ => break,
        }
    }
    names.reverse();
    let joined = format!("gen_{}", names.join("_"));
    joined
        .replace(['@', '.', '-'], "_")
}

/// Derive the CMake target name for a library or executable artifact path, or
/// `None` for artifacts with no one-to-one target (objects, source files,
/// generated headers).
pub fn cmake_target_name(path: &std::path::Path, kind: NodeKind, source_root: &std::path::Path) -> Option<String> {
    if kind == NodeKind::Schema {
        return Some(schema_target_name(path, source_root));
    }
    let basename = path.file_name()?.to_str()?;
    if let Some(caps) = LIBRARY_FILE_NAME_RE.captures(basename) {
        return Some(caps[1].to_string());
    }
    if matches!(kind, NodeKind::Executable | NodeKind::Test) && EXECUTABLE_FILE_NAME_RE.is_match(basename) {
        return Some(basename.to_string());
    }
    None
}

/// For a build-root-relative `.pb.{h,cc}` path, the name of the synthetic
/// proto-generation target, e.g. `gen_src_yb_common_wire_protocol_proto`.
pub fn generation_target_name(build_root_rel_path: &std::path::Path) -> Option<String> {
    let basename = build_root_rel_path.file_name()?.to_str()?;
    let caps = PROTO_OUTPUT_FILE_NAME_RE.captures(basename)?;
    let dir_parts: Vec<String> = build_root_rel_path
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let mut parts = vec!["gen".to_string()];
    parts.extend(dir_parts);
    parts.push(caps[1].to_string());
    parts.push("proto".to_string());
    Some(parts.join("_"))
}

/// Strip the relative-path component used to key a `.proto` file's generated
/// output against its source, normalizing the enterprise source overlay away.
fn strip_enterprise_prefix(rel: &str) -> &str {
    rel.strip_prefix(ENTERPRISE_SOURCE_PREFIX).unwrap_or(rel)
}

/// Matches target-graph nodes onto artifact-graph nodes by name, then replays
/// target-graph edges as artifact-graph edges between the matched nodes.
/// Ambiguous matches (more than one artifact node claiming the same target
/// name) are fatal; targets with no matching artifact are logged and
/// dropped, exactly as the original naming-convention inference tool does.
pub fn match_targets(
    graph: &mut ArtifactGraph,
    target_graph: &TargetGraph,
    ctx: &BuildContext,
) -> Result<()> {
    let mut target_to_nodes: HashMap<String, Vec<NodeIndex>> = HashMap::new();
    for (idx, node) in graph.nodes() {
        if let Some(target) = cmake_target_name(&node.path, node.kind, &ctx.source_root) {
            target_to_nodes.entry(target).or_default().push(idx);
        }
    }

    let mut target_to_node: HashMap<String, NodeIndex> = HashMap::new();
    let mut unmatched = Vec::new();
    for target in target_graph.targets() {
        match target_to_nodes.get(target) {
            None => unmatched.push(target.clone()),
            Some(nodes) if nodes.len() > 1 => {
                return Err(GraphError::AmbiguousTargetMatch {
                    target: target.clone(),
                    candidates: nodes
                        .iter()
                        .map(|&n| graph.get(n).path.display().to_string())
                        .collect(),
                });
            }
            Some(nodes) => {
                target_to_node.insert(target.clone(), nodes[0]);
            }
        }
    }

    if !unmatched.is_empty() {
        unmatched.sort();
        tracing::warn!(targets = ?unmatched, "targets have no associated artifact file");
    }

    for target in target_graph.targets() {
        let Some(&from_idx) = target_to_node.get(target) else {
            continue;
        };
        graph.set_matched_target(from_idx, Some(target.clone()));
        if let Some(deps) = target_graph.deps_of(target) {
            for dep in deps {
                if let Some(&to_idx) = target_to_node.get(dep) {
                    if from_idx != to_idx {
                        graph.add_edge(from_idx, to_idx)?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Add dependencies of `.pb.{h,cc}` artifacts on the `.proto` file they were
/// generated from, matched by source-root-relative path, and feed an inferred
/// target-graph edge from each generated file's containing binary onto its
/// proto-generation target (so [`validators::validate_proto_deps`] has
/// something to check transitively).
pub fn infer_proto_generation_deps(
    graph: &mut ArtifactGraph,
    target_graph: &mut TargetGraph,
    ctx: &BuildContext,
) -> Result<()> {
    let mut proto_by_rel_path: HashMap<String, NodeIndex> = HashMap::new();
    let mut generated_by_rel_path: HashMap<String, Vec<NodeIndex>> = HashMap::new();

    for (idx, node) in graph.nodes() {
        if node.kind == NodeKind::Schema {
            if let Ok(rel) = node.path.strip_prefix(&ctx.source_root) {
                let rel = rel.to_string_lossy();
                let rel = rel.strip_suffix(".proto").unwrap_or(&rel);
                let rel = strip_enterprise_prefix(rel).to_string();
                if let Some(&existing) = proto_by_rel_path.get(&rel) {
                    return Err(GraphError::DuplicateSchemaPath(
                        rel,
                        graph.get(existing).path.display().to_string(),
                        node.path.display().to_string(),
                    ));
                }
                proto_by_rel_path.insert(rel, idx);
            }
            continue;
        }
        let Some(basename) = node.path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(caps) = PROTO_OUTPUT_FILE_NAME_RE.captures(basename) {
            if let Ok(rel) = node.path.strip_prefix(&ctx.build_root) {
                let stem = caps[1].to_string();
                let key = rel
                    .parent()
                    .map(|p| p.join(&stem))
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string();
                generated_by_rel_path.entry(key).or_default().push(idx);
            }
        }
    }

    for rel_path in proto_by_rel_path.keys() {
        if !generated_by_rel_path.contains_key(rel_path) {
            return Err(GraphError::MissingGeneratedPair(rel_path.clone()));
        }
    }
    for rel_path in generated_by_rel_path.keys() {
        if !proto_by_rel_path.contains_key(rel_path) {
            return Err(GraphError::MissingSchemaFile(rel_path.clone()));
        }
    }

    for (rel_path, proto_idx) in &proto_by_rel_path {
        for &generated_idx in &generated_by_rel_path[rel_path] {
            graph.add_edge(generated_idx, *proto_idx)?;

            let node = graph.get(generated_idx);
            if node.path.extension().and_then(|e| e.to_str()) != Some("cc") {
                continue;
            }
            let rel_to_build_root = node
                .path
                .strip_prefix(&ctx.build_root)
                .unwrap_or(&node.path)
                .to_path_buf();
            let Some(gen_target) = generation_target_name(&rel_to_build_root) else {
                continue;
            };
            for binary_idx in graph.containing_binaries_of_object(generated_idx) {
                let binary = graph.get(binary_idx);
                if let Some(binary_target) =
                    cmake_target_name(&binary.path, binary.kind, &ctx.source_root)
                {
                    target_graph.add_dependency(&binary_target, &gen_target);
                }
            }
        }
    }

    Ok(())
}
