use std::path::Path;

use depgraph_core::PathResolver;
use depgraph_graph::ArtifactGraph;

use crate::error::{IngestError, Result};

/// Register a single dependent/dependency pair, resolving both sides through
/// `resolver`. An unresolvable dependency (ambiguous or missing) is silently
/// dropped, matching the ingestor's overall policy of not failing the whole
/// build over one untraceable header.
fn register_dependency(
    dependent: &str,
    dependency: &str,
    provenance: &str,
    graph: &mut ArtifactGraph,
    resolver: &PathResolver,
) -> Result<()> {
    let dependent_path = resolver.resolve_dependent(dependent.trim())?;
    let Some(dependency_path) = resolver.resolve(dependency.trim()) else {
        return Ok(());
    };
    let dependent_idx = graph.find_or_create(&dependent_path, provenance, resolver);
    let dependency_idx = graph.find_or_create(&dependency_path, provenance, resolver);
    if dependent_idx != dependency_idx {
        graph.add_edge(dependent_idx, dependency_idx)?;
    }
    Ok(())
}

/// Parse either a fully-built `depend.make` file (one `dependent: dependency`
/// pair per line) or the output of `ninja -t deps` (a `dependent: #...`
/// header line followed by 4-space-indented prerequisite lines).
pub fn parse_depend_file(path: &Path, graph: &mut ArtifactGraph, resolver: &PathResolver) -> Result<()> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let path_str = path.display().to_string();
    let mut dependent: Option<String> = None;

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((head, _)) = line.split_once(": #") {
            dependent = Some(head.to_string());
        } else if raw_line.starts_with("    ") && !raw_line.starts_with("     ") {
            let Some(dependent_name) = dependent.clone() else {
                return Err(IngestError::OrphanDependency {
                    path: path_str.clone(),
                    text: line.to_string(),
                });
            };
            register_dependency(&dependent_name, line, &path_str, graph, resolver)?;
        } else if let Some((lhs, rhs)) = line.split_once(':') {
            dependent = Some(lhs.trim().to_string());
            register_dependency(lhs, rhs, &path_str, graph, resolver)?;
        } else {
            return Err(IngestError::MalformedDependLine {
                path: path_str.clone(),
                line: line_no + 1,
                text: raw_line.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::BuildContext;

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
    fn parses_ninja_style_deps() {
        let (tmp, ctx) = fixture();
        std::fs::write(ctx.build_root.join("foo.h"), b"").unwrap();
        let deps_path = tmp.path().join("ninja_deps.txt");
        std::fs::write(
            &deps_path,
            "a.cc.o: #deps 1, deps mtime 1 (VALID)\n    foo.h\n",
        )
        .unwrap();

        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        parse_depend_file(&deps_path, &mut graph, &resolver).unwrap();

        let obj = graph.find_by_path(&ctx.build_root.join("a.cc.o")).unwrap();
        let header = graph.find_by_path(&ctx.build_root.join("foo.h")).unwrap();
        assert!(graph.get(obj).deps.contains(&header));
    }

    #[test]
    fn parses_make_style_single_dep_lines() {
        let (tmp, ctx) = fixture();
        std::fs::write(ctx.build_root.join("foo.h"), b"").unwrap();
        let deps_path = tmp.path().join("depend.make");
        std::fs::write(&deps_path, "a.cc.o: foo.h\n").unwrap();

        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        parse_depend_file(&deps_path, &mut graph, &resolver).unwrap();

        let obj = graph.find_by_path(&ctx.build_root.join("a.cc.o")).unwrap();
        let header = graph.find_by_path(&ctx.build_root.join("foo.h")).unwrap();
        assert!(graph.get(obj).deps.contains(&header));
    }
}
