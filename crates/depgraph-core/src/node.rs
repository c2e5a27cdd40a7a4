use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hpp", "hxx"];
const LIBRARY_EXTENSIONS: &[&str] = &["so", "dylib"];
const SCHEMA_EXTENSION: &str = "proto";
const OBJECT_EXTENSION: &str = "o";
const TEST_NAME_SUFFIXES: &[&str] = &["_test", "-test", "_itest", "-itest"];
const TEST_DIR_PREFIX: &str = "tests-";

/// The classification of a single artifact node, assigned once from its path
/// and (for the executable case only) the filesystem, then never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Source,
    Library,
    Object,
    Executable,
    Test,
    Schema,
    Other,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Source => "source",
            NodeKind::Library => "library",
            NodeKind::Object => "object",
            NodeKind::Executable => "executable",
            NodeKind::Test => "test",
            NodeKind::Schema => "schema",
            NodeKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// `--node-type` accepts every `NodeKind` plus the `any` wildcard, which is
/// not itself a node kind -- it is a query-time filter that matches everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKindFilter {
    Any,
    Kind(NodeKind),
}

impl std::str::FromStr for NodeKindFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "any" => Ok(NodeKindFilter::Any),
            "source" => Ok(NodeKindFilter::Kind(NodeKind::Source)),
            "library" => Ok(NodeKindFilter::Kind(NodeKind::Library)),
            "object" => Ok(NodeKindFilter::Kind(NodeKind::Object)),
            "test" => Ok(NodeKindFilter::Kind(NodeKind::Test)),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

impl NodeKindFilter {
    pub fn matches(&self, kind: NodeKind) -> bool {
        match self {
            NodeKindFilter::Any => true,
            NodeKindFilter::Kind(k) => *k == kind,
        }
    }
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|want| want.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn is_test_name(path: &Path) -> bool {
    let basename = match path.file_name().and_then(|n| n.to_str()) {
        Some(b) => b,
        None => return false,
    };
    if TEST_NAME_SUFFIXES.iter().any(|suf| basename.ends_with(suf)) {
        return true;
    }
    let parent_starts_with_tests = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(TEST_DIR_PREFIX))
        .unwrap_or(false);
    parent_starts_with_tests && !basename.contains('.')
}

fn is_executable_on_disk(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Classify a path into a `NodeKind`, applying the rules in the fixed order
/// the build-artifact graph relies on: an object file that also happens to
/// look like a test binary is still an object, and a test binary that is not
/// executable on disk (e.g. before the build ran) is still classified `test`.
pub fn classify_path(path: &Path) -> NodeKind {
    if has_extension(path, SOURCE_EXTENSIONS) {
        return NodeKind::Source;
    }
    if has_extension(path, LIBRARY_EXTENSIONS) {
        return NodeKind::Library;
    }
    if has_extension(path, &[SCHEMA_EXTENSION]) {
        return NodeKind::Schema;
    }
    if has_extension(path, &[OBJECT_EXTENSION]) {
        return NodeKind::Object;
    }
    if is_test_name(path) {
        return NodeKind::Test;
    }
    if is_executable_on_disk(path) {
        return NodeKind::Executable;
    }
    NodeKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classifies_source_files() {
        assert_eq!(classify_path(&PathBuf::from("a/b.cc")), NodeKind::Source);
        assert_eq!(classify_path(&PathBuf::from("a/b.hpp")), NodeKind::Source);
    }

    #[test]
    fn classifies_libraries_and_schemas() {
        assert_eq!(
            classify_path(&PathBuf::from("libmaster.so")),
            NodeKind::Library
        );
        assert_eq!(
            classify_path(&PathBuf::from("wire_protocol.proto")),
            NodeKind::Schema
        );
    }

    #[test]
    fn classifies_objects_before_test_suffix_check() {
        // a suffix like "_test.cc.o" still ends in ".o" and must be an object,
        // never a test -- the extension checks run before the test-name check.
        assert_eq!(
            classify_path(&PathBuf::from("foo_test.cc.o")),
            NodeKind::Object
        );
    }

    #[test]
    fn classifies_test_binaries_by_suffix_or_directory() {
        assert_eq!(
            classify_path(&PathBuf::from("build/linked_list-test")),
            NodeKind::Test
        );
        assert_eq!(
            classify_path(&PathBuf::from("tests-integration/some_file")),
            NodeKind::Test
        );
        assert_eq!(
            classify_path(&PathBuf::from("tests-integration/some_file.txt")),
            NodeKind::Other
        );
    }
}
