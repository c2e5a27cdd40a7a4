use std::collections::BTreeMap;

use serde::Serialize;

/// The `--output-test-config` JSON payload: which test suites to run, the
/// file changes that drove the decision grouped by category, and (unless a
/// full run was already forced) the exact list of C++ test binaries.
#[derive(Debug, Serialize)]
pub struct TestConfig {
    pub run_cpp_tests: bool,
    pub run_java_tests: bool,
    pub file_changes_by_category: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpp_test_programs: Option<Vec<String>>,
}
