use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// The enterprise source-tree prefix stripped when matching a schema file's
/// source-root-relative path against its generated `.pb.{h,cc}` pair's
/// build-root-relative path. This encodes a specific repository convention
/// (an `ent/` overlay tree with no matching `ent/` prefix in the build tree)
/// and is deliberately not inferred -- see SPEC_FULL.md Design Notes.
pub const ENTERPRISE_SOURCE_PREFIX: &str = "ent/";

/// Name of the ninja build marker file used to pick the ingestion back end.
pub const NINJA_MARKER_FILE: &str = "build.ninja";

/// Process-wide configuration threaded explicitly through every operation,
/// mirroring the original tool's `Configuration` object: no singleton, no
/// thread-locals, just a value passed by reference.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub build_root: PathBuf,
    pub source_root: PathBuf,
    pub enterprise_source_root: Option<PathBuf>,
    pub incomplete_build: bool,
    pub verbose: bool,
    /// Path (or bare executable name resolved via `PATH`) to the ninja binary,
    /// overridden by the `YB_NINJA_PATH` environment variable.
    pub ninja_path: String,
}

impl BuildContext {
    pub fn new(build_root: impl AsRef<Path>, source_root: impl AsRef<Path>) -> Result<Self> {
        let build_root = std::fs::canonicalize(build_root.as_ref())?;
        let source_root = std::fs::canonicalize(source_root.as_ref())?;
        if !source_root.is_dir() {
            return Err(CoreError::MissingDirectory(source_root));
        }
        let ninja_path = std::env::var("YB_NINJA_PATH").unwrap_or_else(|_| "ninja".to_string());
        Ok(Self {
            build_root,
            source_root,
            enterprise_source_root: None,
            incomplete_build: false,
            verbose: false,
            ninja_path,
        })
    }

    pub fn with_enterprise_source_root(mut self, path: Option<PathBuf>) -> Result<Self> {
        if let Some(p) = &path {
            if !p.is_dir() {
                return Err(CoreError::MissingDirectory(p.clone()));
            }
        }
        self.enterprise_source_root = path;
        Ok(self)
    }

    pub fn with_incomplete_build(mut self, incomplete: bool) -> Self {
        self.incomplete_build = incomplete;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// All source-tree roots to be walked for schema discovery, in the order
    /// the original walks `src_dir_path` then `ent_src_dir_path`.
    pub fn source_roots(&self) -> Vec<&Path> {
        let mut roots = vec![self.source_root.as_path()];
        if let Some(ent) = &self.enterprise_source_root {
            roots.push(ent.as_path());
        }
        roots
    }

    /// Base directories a bare relative path found in build metadata might be
    /// rooted in: the build root, and every source-tree root.
    pub fn base_dirs(&self) -> Vec<&Path> {
        let mut dirs = vec![self.build_root.as_path()];
        dirs.extend(self.source_roots());
        dirs
    }

    /// `true` if `build.ninja` is present in the build root, selecting the
    /// single-file ninja ingestion back end over the recursive-make one.
    pub fn is_ninja_build_root(&self) -> bool {
        self.build_root.join(NINJA_MARKER_FILE).is_file()
    }

    /// Home-relative and root-relative aliases used only for diagnostics
    /// (log lines, `debug-dump`); never used for machine-readable output.
    pub fn pretty_path(&self, path: &Path) -> String {
        let home = dirs_home();
        for (prefix, alias) in [
            (self.build_root.as_path(), "$BUILD_ROOT"),
            (self.source_root.as_path(), "$SRC_ROOT"),
            (home.as_deref().unwrap_or(Path::new("")), "~"),
        ] {
            if prefix.as_os_str().is_empty() {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(prefix) {
                return format!("{alias}/{}", rel.display());
            }
        }
        path.display().to_string()
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_path_aliases_build_root() {
        let tmp = tempfile::tempdir().unwrap();
        let build_root = tmp.path().join("build");
        let src_root = tmp.path().join("src");
        std::fs::create_dir_all(&build_root).unwrap();
        std::fs::create_dir_all(&src_root).unwrap();
        let ctx = BuildContext::new(&build_root, &src_root).unwrap();
        let p = ctx.build_root.join("libfoo.so");
        assert_eq!(ctx.pretty_path(&p), "$BUILD_ROOT/libfoo.so");
    }

    #[test]
    fn detects_ninja_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let build_root = tmp.path().join("build");
        let src_root = tmp.path().join("src");
        std::fs::create_dir_all(&build_root).unwrap();
        std::fs::create_dir_all(&src_root).unwrap();
        let ctx = BuildContext::new(&build_root, &src_root).unwrap();
        assert!(!ctx.is_ninja_build_root());
        std::fs::write(build_root.join("build.ninja"), "").unwrap();
        assert!(ctx.is_ninja_build_root());
    }
}
