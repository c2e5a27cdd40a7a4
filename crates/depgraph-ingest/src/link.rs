use std::path::{Path, PathBuf};

use depgraph_core::{BuildContext, PathResolver};
use depgraph_graph::ArtifactGraph;

use crate::error::{IngestError, Result};

fn is_object_arg(arg: &str) -> bool {
    arg.ends_with(".o")
}

fn is_library_arg(arg: &str) -> bool {
    (arg.ends_with(".so") || arg.ends_with(".dylib")) && !arg.starts_with('-')
}

fn is_abs(path: &str) -> bool {
    path.starts_with('/')
}

/// Parse every line of a `link.txt` (make backend) or `ninja -t commands`
/// (ninja backend) file as a candidate link command.
pub fn parse_link_txt_file(
    path: &Path,
    graph: &mut ArtifactGraph,
    resolver: &PathResolver,
    ctx: &BuildContext,
    is_ninja: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    for line in text.lines() {
        let line = line.trim();
        if !line.is_empty() {
            parse_link_command(line, path, graph, resolver, ctx, is_ninja)?;
        }
    }
    Ok(())
}

/// Base directory relative link-command arguments are anchored against. For
/// ninja, that is simply the build root (ninja always runs from there); for
/// make, link.txt sits two directories below the build root inside a
/// CMakeFiles target directory, so arguments are anchored two levels above it.
fn base_dir(link_txt_path: &Path, ctx: &BuildContext, is_ninja: bool) -> PathBuf {
    if is_ninja {
        return ctx.build_root.clone();
    }
    link_txt_path
        .parent()
        .and_then(|d| d.parent())
        .and_then(|d| d.parent())
        .unwrap_or(&ctx.build_root)
        .to_path_buf()
}

fn parse_link_command(
    command: &str,
    link_txt_path: &Path,
    graph: &mut ArtifactGraph,
    resolver: &PathResolver,
    ctx: &BuildContext,
    is_ninja: bool,
) -> Result<()> {
    let base = base_dir(link_txt_path, ctx, is_ninja);
    let provenance = link_txt_path.display().to_string();
    let args: Vec<&str> = command.split_whitespace().collect();

    let mut output_path: Option<String> = None;
    let mut inputs: Vec<PathBuf> = Vec::new();
    let mut compilation = false;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i];
        if arg == "-o" {
            let new_output = args.get(i + 1).copied().unwrap_or_default();
            if let Some(existing) = &output_path {
                if !new_output.is_empty() && existing != new_output {
                    return Err(IngestError::ConflictingLinkOutput {
                        first: existing.clone(),
                        second: new_output.to_string(),
                        command: command.to_string(),
                    });
                }
            }
            output_path = Some(new_output.to_string());
            if is_ninja && is_object_arg(new_output) {
                compilation = true;
            }
            i += 1;
        } else if !arg.starts_with("@rpath/") {
            if is_object_arg(arg) {
                let idx = graph.find_or_create(&base.join(arg), &provenance, resolver);
                inputs.push(graph.get(idx).path.clone());
            } else if is_library_arg(arg) {
                let idx = graph.find_or_create(&base.join(arg), &provenance, resolver);
                inputs.push(graph.get(idx).path.clone());
            }
        }
        i += 1;
    }

    if is_ninja && compilation {
        return Ok(());
    }

    let Some(output_path) = output_path else {
        if is_ninja {
            return Ok(());
        }
        return Err(IngestError::MalformedDependLine {
            path: provenance,
            line: 0,
            text: format!("no output path in link command: {command}"),
        });
    };

    let output_abs = if is_abs(&output_path) {
        PathBuf::from(output_path)
    } else {
        base.join(output_path)
    };
    let output_idx = graph.find_or_create(&output_abs, &provenance, resolver);

    for input_path in inputs {
        let input_idx = graph.find_or_create(&input_path, &provenance, resolver);
        graph.add_edge(output_idx, input_idx)?;
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
    fn ninja_link_command_adds_object_dependency() {
        let (tmp, ctx) = fixture();
        let commands_path = tmp.path().join("ninja_commands.txt");
        std::fs::write(&commands_path, "cc -o yb-master a.cc.o b.cc.o\n").unwrap();

        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        parse_link_txt_file(&commands_path, &mut graph, &resolver, &ctx, true).unwrap();

        let out = graph.find_by_path(&ctx.build_root.join("yb-master")).unwrap();
        let a = graph.find_by_path(&ctx.build_root.join("a.cc.o")).unwrap();
        assert!(graph.get(out).deps.contains(&a));
    }

    #[test]
    fn ninja_object_output_commands_are_skipped() {
        let (tmp, ctx) = fixture();
        let commands_path = tmp.path().join("ninja_commands.txt");
        std::fs::write(&commands_path, "cc -c -o a.cc.o a.cc\n").unwrap();

        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        parse_link_txt_file(&commands_path, &mut graph, &resolver, &ctx, true).unwrap();
        assert!(graph.is_empty());
    }
}
