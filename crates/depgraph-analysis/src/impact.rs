use std::collections::{BTreeMap, HashSet};

use depgraph_core::NodeKindFilter;
use depgraph_graph::{ArtifactGraph, NodeIndex};

use crate::category::FileCategory;
use crate::test_config::TestConfig;

/// Read a boolean-ish environment variable the way the original escalation
/// rules expect: `1`/`true`/`yes` (case-insensitive) is true, anything else
/// (including unset) is false.
pub fn env_bool(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Reverse transitive closure of `initial`, filtered down to nodes matching
/// `filter`. This is the core "what could this change affect" query.
pub fn find_affected_nodes(
    graph: &ArtifactGraph,
    initial: &HashSet<NodeIndex>,
    filter: NodeKindFilter,
) -> HashSet<NodeIndex> {
    graph
        .reverse_closure(initial)
        .into_iter()
        .filter(|&idx| filter.matches(graph.get(idx).kind))
        .collect()
}

/// Everything the escalation rules in [`compute_test_selection`] need,
/// gathered from the impact query so that function stays pure and testable
/// without an `ArtifactGraph` in hand.
pub struct ImpactInputs<'a> {
    pub file_changes_by_category: &'a BTreeMap<FileCategory, Vec<String>>,
    pub affected_basenames: &'a HashSet<String>,
    pub affected_test_basenames: &'a [String],
    pub all_test_basename_count: usize,
}

/// Decide whether to run C++ tests, Java tests, or everything, from the
/// categories of the files that changed plus the impact-query results. This
/// is a deliberately conservative escalation: any change outside C++/Java/
/// Python/no-op categories forces a full run, and a `yb-master`/`yb-tserver`
/// rebuild always drags in the Java tests (the Java layer embeds them).
pub fn compute_test_selection(inputs: ImpactInputs) -> TestConfig {
    let updated_categories: HashSet<FileCategory> =
        inputs.file_changes_by_category.keys().copied().collect();
    let unsafe_categories: Vec<FileCategory> = updated_categories
        .iter()
        .copied()
        .filter(|c| c.causes_rerun_of_all_tests())
        .collect();

    let user_said_all_tests = env_bool("YB_RUN_ALL_TESTS");
    let run_all_tests = !unsafe_categories.is_empty() || user_said_all_tests;

    let user_said_all_cpp_tests = env_bool("YB_RUN_ALL_CPP_TESTS");
    let user_said_all_java_tests = env_bool("YB_RUN_ALL_JAVA_TESTS");
    let cpp_files_changed = updated_categories.contains(&FileCategory::Cpp);
    let java_files_changed = updated_categories.contains(&FileCategory::Java);
    let yb_master_or_tserver_changed = inputs.affected_basenames.contains("yb-master")
        || inputs.affected_basenames.contains("yb-tserver");

    let mut run_cpp_tests = run_all_tests || cpp_files_changed || user_said_all_cpp_tests;
    let run_java_tests = run_all_tests
        || java_files_changed
        || yb_master_or_tserver_changed
        || user_said_all_java_tests;

    if run_all_tests {
        if user_said_all_tests {
            tracing::info!("user explicitly requested that all tests be run");
        } else {
            tracing::info!(
                categories = ?unsafe_categories.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
                "all tests will run due to file changes in these categories"
            );
        }
    } else {
        if run_cpp_tests {
            if user_said_all_cpp_tests {
                tracing::info!("user explicitly requested that all C++ tests be run");
            } else {
                tracing::info!("will run some C++ tests, some C++ files changed");
            }
        }
        if run_java_tests {
            if user_said_all_java_tests {
                tracing::info!("user explicitly requested that all Java tests be run");
            } else {
                tracing::info!(
                    java_files_changed,
                    yb_master_or_tserver_changed,
                    "will run all Java tests"
                );
            }
        }
    }

    let mut test_basename_list: Vec<String> = inputs.affected_test_basenames.to_vec();
    test_basename_list.sort();

    if run_cpp_tests && test_basename_list.is_empty() && !run_all_tests {
        tracing::info!("no C++ test programs are affected by the changes, skipping C++ tests");
        run_cpp_tests = false;
    }

    if !run_all_tests && inputs.all_test_basename_count > 0 {
        tracing::info!(
            selected = test_basename_list.len(),
            total = inputs.all_test_basename_count,
            "C++ test programs selected to run"
        );
    }

    let file_changes_by_category: BTreeMap<String, Vec<String>> = inputs
        .file_changes_by_category
        .iter()
        .map(|(cat, files)| {
            let mut files = files.clone();
            files.sort();
            (cat.to_string(), files)
        })
        .collect();

    TestConfig {
        run_cpp_tests,
        run_java_tests,
        file_changes_by_category,
        cpp_test_programs: if run_all_tests { None } else { Some(test_basename_list) },
    }
}
