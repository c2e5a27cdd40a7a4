use std::fmt;
use std::path::Path;

/// Top-level source-tree directories whose contents never affect what tests
/// need to run -- as of this tool's last audit, nothing under them is
/// exercised by any test target.
const DIRECTORIES_DONT_AFFECT_TESTS: &[&str] = &[
    "architecture",
    "bin",
    "cloud",
    "community",
    "docs",
    "managed",
    "sample",
    "www",
];

/// Coarse classification of a changed file, used to decide which test suites
/// a changeset could plausibly affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileCategory {
    DoesNotAffectTests,
    Cmake,
    Postgres,
    Cpp,
    Python,
    Java,
    Thirdparty,
    BuildScripts,
    Other,
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileCategory::DoesNotAffectTests => "does_not_affect_tests",
            FileCategory::Cmake => "cmake",
            FileCategory::Postgres => "postgres",
            FileCategory::Cpp => "c++",
            FileCategory::Python => "python",
            FileCategory::Java => "java",
            FileCategory::Thirdparty => "thirdparty",
            FileCategory::BuildScripts => "build_scripts",
            FileCategory::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl FileCategory {
    /// Categories whose presence alone never forces a full test re-run: C++
    /// and Java changes are covered by targeted impact analysis, Python
    /// tooling is considered separately tested, and changes outside the
    /// source tree altogether are inert.
    pub fn causes_rerun_of_all_tests(self) -> bool {
        !matches!(
            self,
            FileCategory::Cpp | FileCategory::Java | FileCategory::Python | FileCategory::DoesNotAffectTests
        )
    }
}

/// Categorize a single file change, given its path relative to the source
/// root (not the build root).
pub fn classify(rel_path: &Path) -> FileCategory {
    let rel_str = rel_path.to_string_lossy();
    let basename = rel_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if let Some(first) = rel_path.components().next() {
        if DIRECTORIES_DONT_AFFECT_TESTS.contains(&first.as_os_str().to_string_lossy().as_ref()) {
            return FileCategory::DoesNotAffectTests;
        }
    }

    if rel_str == "yb_build.sh" {
        return FileCategory::DoesNotAffectTests;
    }

    if basename == "CMakeLists.txt" || basename.ends_with(".cmake") {
        return FileCategory::Cmake;
    }

    if rel_str.starts_with("src/postgres") {
        return FileCategory::Postgres;
    }

    if rel_str.starts_with("src/") || rel_str.starts_with("ent/src/") {
        return FileCategory::Cpp;
    }

    if rel_str.starts_with("python/") {
        return FileCategory::Python;
    }

    if rel_str.starts_with("java/") {
        return FileCategory::Java;
    }
    if rel_str.starts_with("thirdparty/") {
        return FileCategory::Thirdparty;
    }

    if rel_str.starts_with("build-support/") {
        return FileCategory::BuildScripts;
    }

    FileCategory::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classifies_postgres_sources() {
        assert_eq!(
            classify(&PathBuf::from("src/postgres/src/backend/executor/execScan.c")),
            FileCategory::Postgres
        );
    }

    #[test]
    fn classifies_cpp_and_enterprise_sources() {
        assert_eq!(classify(&PathBuf::from("src/yb/master/master.cc")), FileCategory::Cpp);
        assert_eq!(classify(&PathBuf::from("ent/src/yb/master/master.cc")), FileCategory::Cpp);
    }

    #[test]
    fn classifies_build_script_as_not_affecting_tests() {
        assert_eq!(classify(&PathBuf::from("yb_build.sh")), FileCategory::DoesNotAffectTests);
        assert_eq!(classify(&PathBuf::from("docs/README.md")), FileCategory::DoesNotAffectTests);
    }

    #[test]
    fn classifies_cmake_files() {
        assert_eq!(
            classify(&PathBuf::from("src/yb/master/CMakeLists.txt")),
            FileCategory::Cmake
        );
        assert_eq!(classify(&PathBuf::from("cmake_modules/Foo.cmake")), FileCategory::Cmake);
    }

    #[test]
    fn unsafe_categories_force_full_rerun() {
        assert!(FileCategory::Other.causes_rerun_of_all_tests());
        assert!(FileCategory::Cmake.causes_rerun_of_all_tests());
        assert!(!FileCategory::Cpp.causes_rerun_of_all_tests());
        assert!(!FileCategory::Java.causes_rerun_of_all_tests());
        assert!(!FileCategory::DoesNotAffectTests.causes_rerun_of_all_tests());
    }
}
