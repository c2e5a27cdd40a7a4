mod config;
mod git;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use regex::Regex;

use depgraph_analysis::{classify, compute_test_selection, find_affected_nodes, FileCategory, ImpactInputs};
use depgraph_core::{BuildContext, NodeKind, NodeKindFilter, PathResolver};
use depgraph_graph::{
    infer_proto_generation_deps, match_targets, persistence, validators, ArtifactGraph, NodeIndex, TargetGraph,
};

/// `yb_cmake_deps.txt` relative to the build root: the flat target-to-target
/// listing CMake emits alongside the rest of the build metadata.
const CMAKE_DEPS_FILE_NAME: &str = "yb_cmake_deps.txt";
const GRAPH_CACHE_FILE_NAME: &str = "dependency_graph.json";

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Command {
    /// Direct build-time dependencies of the matched files.
    Deps,
    /// Direct reverse dependencies (what directly depends on the matched files).
    RevDeps,
    /// Everything transitively affected by a change to the matched files.
    Affected,
    /// Run the graph's internal consistency assertions against a real build tree.
    SelfTest,
    /// Dump every node and its dependency edges, for debugging.
    DebugDump,
}

#[derive(Parser, Debug)]
#[command(
    name = "depgraph",
    version,
    author,
    about = "Native build-artifact dependency graph and change-impact analyzer"
)]
struct Cli {
    /// What to compute.
    #[arg(value_enum)]
    command: Command,

    /// Root of the build tree, e.g. `build/debug-gcc-dynamic-community`.
    #[arg(long)]
    build_root: PathBuf,

    /// Root of the source tree. Falls back to `depgraph.toml`.
    #[arg(long)]
    source_root: Option<PathBuf>,

    /// Root of the enterprise source overlay, if any. Falls back to `depgraph.toml`.
    #[arg(long)]
    enterprise_source_root: Option<PathBuf>,

    /// Rebuild the dependency graph from build metadata instead of using the cache file.
    #[arg(short = 'r', long)]
    rebuild_graph: bool,

    /// Only consider files whose path matches this regular expression.
    #[arg(long, conflicts_with = "file_name_glob")]
    file_regex: Option<String>,

    /// Only consider files whose basename matches this glob.
    #[arg(long, conflicts_with = "file_regex")]
    file_name_glob: Option<String>,

    /// Resolve changed files from a git diff, e.g. `origin/master..HEAD`.
    #[arg(long, conflicts_with = "git_commit")]
    git_diff: Option<String>,

    /// Resolve changed files from a single commit (sugar for `<rev>^..<rev>`).
    #[arg(long)]
    git_commit: Option<String>,

    /// Restrict results to nodes of this kind: test, object, library, source, or any.
    #[arg(long, default_value = "any")]
    node_type: String,

    /// Write a JSON test-selection config to this path. Requires --git-diff or --git-commit.
    #[arg(long)]
    output_test_config: Option<PathBuf>,

    /// Treat a build tree with missing artifacts as expected, not a graph-construction bug.
    #[arg(long)]
    incomplete_build: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.git_diff.is_some() && cli.git_commit.is_some() {
        bail!("--git-diff and --git-commit are mutually exclusive");
    }
    let git_diff = cli
        .git_commit
        .as_ref()
        .map(|commit| format!("{commit}^..{commit}"))
        .or_else(|| cli.git_diff.clone());

    let file_cfg = config::load(&cli.build_root)?;
    let source_root = cli
        .source_root
        .clone()
        .or(file_cfg.source_root)
        .context("no source root configured; pass --source-root or set one in depgraph.toml")?;
    let enterprise_source_root = cli.enterprise_source_root.clone().or(file_cfg.enterprise_source_root);

    let mut ctx = BuildContext::new(&cli.build_root, &source_root)?
        .with_enterprise_source_root(enterprise_source_root)?
        .with_incomplete_build(cli.incomplete_build)
        .with_verbose(cli.verbose);
    if std::env::var("YB_NINJA_PATH").is_err() {
        if let Some(ninja_path) = file_cfg.ninja_path {
            ctx.ninja_path = ninja_path;
        }
    }

    let node_filter: NodeKindFilter = cli.node_type.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let needs_target_set = !matches!(cli.command, Command::SelfTest | Command::DebugDump);
    if needs_target_set
        && cli.file_regex.is_none()
        && cli.file_name_glob.is_none()
        && git_diff.is_none()
        && !cli.rebuild_graph
    {
        bail!(
            "one of --file-regex, --file-name-glob, --git-diff, --git-commit, or --rebuild-graph \
             is required for this command"
        );
    }

    let resolver = PathResolver::new(&ctx);
    let cache_path = ctx.build_root.join(GRAPH_CACHE_FILE_NAME);
    let cmake_deps_path = ctx.build_root.join(CMAKE_DEPS_FILE_NAME);

    let graph = if cli.rebuild_graph || !cache_path.is_file() {
        println!("{}", "rebuilding dependency graph from build metadata".green());
        let mut graph = depgraph_ingest::ingest_build_metadata(&ctx, &resolver)?;
        let mut target_graph = load_target_graph(&cmake_deps_path)?;
        match_targets(&mut graph, &target_graph, &ctx)?;
        infer_proto_generation_deps(&mut graph, &mut target_graph, &ctx)?;
        validators::validate_existence(&graph, &ctx)?;
        validators::check_acyclic(&graph)?;
        validators::validate_proto_deps(&graph, &target_graph, &ctx)?;
        persistence::save(&graph, &cache_path)?;
        tracing::info!(path = %cache_path.display(), nodes = graph.len(), "wrote dependency graph cache");
        graph
    } else {
        let graph = persistence::load(&ctx, &cache_path)?;
        validators::validate_existence(&graph, &ctx)?;
        graph
    };

    match cli.command {
        Command::SelfTest => return run_self_test(&ctx, &graph, &cmake_deps_path),
        Command::DebugDump => return debug_dump(&ctx, &graph),
        _ => {}
    }

    let initial = resolve_initial_nodes(&graph, &ctx, &cli, git_diff.as_deref())?;
    if initial.is_empty() {
        println!("{}", "no files matched; nothing to do".yellow());
        return Ok(());
    }

    let result_indices: HashSet<NodeIndex> = match cli.command {
        Command::Affected => find_affected_nodes(&graph, &initial, node_filter),
        Command::Deps => direct_matching(&graph, &initial, node_filter, false),
        Command::RevDeps => direct_matching(&graph, &initial, node_filter, true),
        Command::SelfTest | Command::DebugDump => unreachable!(),
    };

    print_results(&ctx, &graph, &result_indices);

    if let Some(out_path) = &cli.output_test_config {
        let git_diff = git_diff
            .as_deref()
            .context("--output-test-config requires --git-diff or --git-commit")?;
        write_test_config(&ctx, &graph, &result_indices, git_diff, out_path)?;
    }

    Ok(())
}

fn load_target_graph(path: &Path) -> Result<TargetGraph> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading target dependency listing at {}", path.display()))?;
    Ok(TargetGraph::parse_str(&text)?)
}

/// One-hop (non-transitive) dependency or reverse-dependency lookup -- the
/// `deps`/`rev-deps` commands, as distinct from `affected`'s full reverse
/// transitive closure.
fn direct_matching(
    graph: &ArtifactGraph,
    initial: &HashSet<NodeIndex>,
    filter: NodeKindFilter,
    reverse: bool,
) -> HashSet<NodeIndex> {
    let mut result = HashSet::new();
    for &idx in initial {
        let node = graph.get(idx);
        let edges = if reverse { &node.reverse_deps } else { &node.deps };
        for &edge in edges {
            if filter.matches(graph.get(edge).kind) {
                result.insert(edge);
            }
        }
    }
    result
}

fn resolve_initial_nodes(
    graph: &ArtifactGraph,
    ctx: &BuildContext,
    cli: &Cli,
    git_diff: Option<&str>,
) -> Result<HashSet<NodeIndex>> {
    if let Some(rev_spec) = git_diff {
        let files = git::changed_files(&ctx.source_root, rev_spec)?;
        return Ok(files.into_iter().filter_map(|p| graph.find_by_path(&p)).collect());
    }
    if let Some(pattern) = &cli.file_regex {
        let re = Regex::new(pattern).with_context(|| format!("invalid --file-regex {pattern:?}"))?;
        return Ok(graph.find_by_regex(&re).into_iter().collect());
    }
    if let Some(glob) = &cli.file_name_glob {
        let re = glob_to_regex(glob)?;
        return Ok(graph.find_by_regex(&re).into_iter().collect());
    }
    Ok(HashSet::new())
}

/// Translate a basename glob (`*`/`?`) into a regex anchored so it only
/// matches the final path component, the same semantics as Python's
/// `fnmatch` applied to `os.path.basename`.
fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut pattern = String::from("(?:^|/)");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            other => pattern.push(other),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).with_context(|| format!("invalid --file-name-glob {glob:?}"))
}

fn print_results(ctx: &BuildContext, graph: &ArtifactGraph, indices: &HashSet<NodeIndex>) {
    let mut paths: Vec<String> = indices.iter().map(|&idx| ctx.pretty_path(&graph.get(idx).path)).collect();
    paths.sort();
    for path in paths {
        println!("{path}");
    }
    println!("{}", format!("{} node(s)", indices.len()).cyan());
}

fn run_self_test(ctx: &BuildContext, graph: &ArtifactGraph, cmake_deps_path: &Path) -> Result<()> {
    println!("{}", "running self-test assertions".green());
    validators::check_acyclic(graph)?;
    let target_graph = load_target_graph(cmake_deps_path)?;
    validators::validate_proto_deps(graph, &target_graph, ctx)?;
    println!("{}", "self-test passed".green().bold());
    Ok(())
}

fn debug_dump(ctx: &BuildContext, graph: &ArtifactGraph) -> Result<()> {
    for (idx, node) in graph.nodes() {
        let target_suffix = node
            .matched_target
            .as_ref()
            .map(|t| format!("  [{t}]"))
            .unwrap_or_default();
        println!(
            "{idx:>6}  {:<10}  {}{target_suffix}",
            node.kind.to_string(),
            ctx.pretty_path(&node.path)
        );
        for &dep in &node.deps {
            println!("            -> {}", ctx.pretty_path(&graph.get(dep).path));
        }
    }
    Ok(())
}

fn write_test_config(
    ctx: &BuildContext,
    graph: &ArtifactGraph,
    affected: &HashSet<NodeIndex>,
    git_diff: &str,
    out_path: &Path,
) -> Result<()> {
    let changed_paths = git::changed_files(&ctx.source_root, git_diff)?;
    let mut by_category: BTreeMap<FileCategory, Vec<String>> = BTreeMap::new();
    for path in &changed_paths {
        let rel = path.strip_prefix(&ctx.source_root).unwrap_or(path);
        by_category.entry(classify(rel)).or_default().push(rel.display().to_string());
    }

    let affected_basenames: HashSet<String> = affected
        .iter()
        .map(|&idx| graph.get(idx).path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    let affected_test_basenames: Vec<String> = affected
        .iter()
        .filter(|&&idx| graph.get(idx).kind == NodeKind::Test)
        .map(|&idx| graph.get(idx).path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    let all_test_basename_count = graph.nodes().filter(|(_, n)| n.kind == NodeKind::Test).count();

    let config = compute_test_selection(ImpactInputs {
        file_changes_by_category: &by_category,
        affected_basenames: &affected_basenames,
        affected_test_basenames: &affected_test_basenames,
        all_test_basename_count,
    });

    let file = std::fs::File::create(out_path).with_context(|| format!("creating {}", out_path.display()))?;
    serde_json::to_writer_pretty(file, &config)?;
    println!(
        "{} {}",
        "wrote test-selection config to".green(),
        out_path.display()
    );
    Ok(())
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
    fn glob_to_regex_matches_basename_only() {
        let re = glob_to_regex("*_test").unwrap();
        assert!(re.is_match("build/linked_list_test"));
        assert!(!re.is_match("build/linked_list_test_extra"));
        assert!(!re.is_match("build/other"));
    }

    #[test]
    fn direct_matching_follows_one_hop_only() {
        let (_tmp, ctx) = fixture();
        let resolver = PathResolver::new(&ctx);
        let mut graph = ArtifactGraph::new(&ctx);
        let src = graph.find_or_create(&ctx.build_root.join("a.cc"), "t", &resolver);
        let obj = graph.find_or_create(&ctx.build_root.join("a.cc.o"), "t", &resolver);
        let lib = graph.find_or_create(&ctx.build_root.join("liba.so"), "t", &resolver);
        graph.add_edge(obj, src).unwrap();
        graph.add_edge(lib, obj).unwrap();

        let mut start = HashSet::new();
        start.insert(lib);
        let deps = direct_matching(&graph, &start, NodeKindFilter::Any, false);
        assert!(deps.contains(&obj));
        assert!(!deps.contains(&src));
    }
}
