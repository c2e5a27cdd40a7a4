use std::collections::HashSet;

use depgraph_analysis::find_affected_nodes;
use depgraph_core::{BuildContext, NodeKindFilter, PathResolver};
use depgraph_graph::ArtifactGraph;

fn fixture() -> (tempfile::TempDir, BuildContext) {
    let tmp = tempfile::tempdir().unwrap();
    let build_root = tmp.path().join("build");
    let src_root = tmp.path().join("src");
    std::fs::create_dir_all(&build_root).unwrap();
    std::fs::create_dir_all(&src_root).unwrap();
    let ctx = BuildContext::new(&build_root, &src_root).unwrap();
    (tmp, ctx)
}

fn affected_basenames(graph: &ArtifactGraph, start_basename: &str) -> HashSet<String> {
    let start_idx = graph
        .nodes()
        .find(|(_, node)| node.path.file_name().unwrap().to_string_lossy() == start_basename)
        .map(|(idx, _)| idx)
        .expect("fixture node must exist");
    let mut start = HashSet::new();
    start.insert(start_idx);
    find_affected_nodes(graph, &start, NodeKindFilter::Any)
        .into_iter()
        .map(|idx| graph.get(idx).path.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

/// Wires up a source -> object -> (direct binaries) chain and returns the
/// object's node index so callers can hang further libraries off it.
fn build_chain(
    graph: &mut ArtifactGraph,
    ctx: &BuildContext,
    resolver: &PathResolver,
    src: &str,
    obj: &str,
    direct_binaries: &[&str],
) -> usize {
    let src_idx = graph.find_or_create(&ctx.source_root.join(src), "t", resolver);
    let obj_idx = graph.find_or_create(&ctx.build_root.join(obj), "t", resolver);
    graph.add_edge(obj_idx, src_idx).unwrap();
    for binary in direct_binaries {
        let binary_idx = graph.find_or_create(&ctx.build_root.join(binary), "t", resolver);
        graph.add_edge(binary_idx, obj_idx).unwrap();
    }
    obj_idx
}

/// Builds a small fixture mirroring three source->object->binary chains that
/// share an "integration-tests" library, the shape this tool's self-test
/// exercises against a real build tree.
fn build_fixture<'a>(ctx: &'a BuildContext, resolver: &PathResolver) -> ArtifactGraph<'a> {
    let mut graph = ArtifactGraph::new(ctx);

    // master_main.cc -> master_main.cc.o -> libmaster.so -> yb-master, libintegration-tests.so
    let master_obj = build_chain(&mut graph, ctx, resolver, "master_main.cc", "master_main.cc.o", &[]);
    let libmaster = graph.find_or_create(&ctx.build_root.join("libmaster.so"), "t", resolver);
    graph.add_edge(libmaster, master_obj).unwrap();
    let yb_master = graph.find_or_create(&ctx.build_root.join("yb-master"), "t", resolver);
    graph.add_edge(yb_master, libmaster).unwrap();
    let integration_tests_lib =
        graph.find_or_create(&ctx.build_root.join("libintegration-tests.so"), "t", resolver);
    graph.add_edge(integration_tests_lib, libmaster).unwrap();

    // tablet_server_main.cc -> ...o -> libtserver.so -> linked_list-test, libintegration-tests.so
    let tserver_obj = build_chain(
        &mut graph,
        ctx,
        resolver,
        "tablet_server_main.cc",
        "tablet_server_main.cc.o",
        &[],
    );
    let libtserver = graph.find_or_create(&ctx.build_root.join("libtserver.so"), "t", resolver);
    graph.add_edge(libtserver, tserver_obj).unwrap();
    let linked_list_test = graph.find_or_create(&ctx.build_root.join("linked_list-test"), "t", resolver);
    graph.add_edge(linked_list_test, libtserver).unwrap();
    graph.add_edge(integration_tests_lib, libtserver).unwrap();

    // yb-bulk_load.cc -> yb-bulk_load.cc.o -> yb-bulk_load, yb-bulk_load-test (no shared libs)
    build_chain(
        &mut graph,
        ctx,
        resolver,
        "yb-bulk_load.cc",
        "yb-bulk_load.cc.o",
        &["yb-bulk_load", "yb-bulk_load-test"],
    );

    graph
}

#[test]
fn master_main_affects_its_binary_and_the_integration_tests_lib() {
    let (_tmp, ctx) = fixture();
    let resolver = PathResolver::new(&ctx);
    let graph = build_fixture(&ctx, &resolver);

    let affected = affected_basenames(&graph, "master_main.cc");
    assert!(affected.contains("yb-master"));
    assert!(affected.contains("libintegration-tests.so"));
}

#[test]
fn tablet_server_main_does_not_affect_yb_master() {
    let (_tmp, ctx) = fixture();
    let resolver = PathResolver::new(&ctx);
    let graph = build_fixture(&ctx, &resolver);

    let affected = affected_basenames(&graph, "tablet_server_main.cc");
    assert!(affected.contains("linked_list-test"));
    assert!(affected.contains("libintegration-tests.so"));
    assert!(!affected.contains("yb-master"));
}

#[test]
fn bulk_load_tool_affects_exactly_its_own_chain() {
    let (_tmp, ctx) = fixture();
    let resolver = PathResolver::new(&ctx);
    let graph = build_fixture(&ctx, &resolver);

    let affected = affected_basenames(&graph, "yb-bulk_load.cc");
    let expected: HashSet<String> = ["yb-bulk_load", "yb-bulk_load-test", "yb-bulk_load.cc.o"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(affected, expected);
}
