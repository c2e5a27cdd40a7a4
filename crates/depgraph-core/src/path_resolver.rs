use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::context::BuildContext;
use crate::error::{CoreError, Result};

fn is_abs_path(rel_path: &str) -> bool {
    rel_path.starts_with('/')
}

fn is_object_file(path: &str) -> bool {
    path.ends_with(".o")
}

/// Collapse `.`/`..` components lexically, without touching the filesystem.
/// Used to normalize paths that must stay lexically under the build root
/// rather than be resolved through `realpath` (which would follow symlinks).
fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves build-metadata path strings against the build root and source
/// roots. Every memoization table here is a `RefCell`: the resolver is
/// process-local and never shared across threads, matching the single-threaded
/// resource model of the whole pipeline.
pub struct PathResolver<'a> {
    ctx: &'a BuildContext,
    resolved: RefCell<HashMap<String, PathBuf>>,
    unresolvable: RefCell<HashSet<String>>,
    canonical_cache: RefCell<HashMap<PathBuf, PathBuf>>,
}

impl<'a> PathResolver<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self {
            ctx,
            resolved: RefCell::new(HashMap::new()),
            unresolvable: RefCell::new(HashSet::new()),
            canonical_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve a possibly-relative path string against the configured base
    /// directories. An absolute path is returned unchanged. Ambiguous or
    /// nonexistent relative paths are memoized as unresolvable and silently
    /// dropped -- the caller is expected to drop the edge, not fail the build.
    pub fn resolve(&self, rel_path: &str) -> Option<PathBuf> {
        if is_abs_path(rel_path) {
            return Some(PathBuf::from(rel_path));
        }
        if self.unresolvable.borrow().contains(rel_path) {
            return None;
        }
        if let Some(cached) = self.resolved.borrow().get(rel_path) {
            return Some(cached.clone());
        }

        let mut candidates: HashSet<PathBuf> = HashSet::new();
        for base in self.ctx.base_dirs() {
            let candidate = base.join(rel_path);
            if candidate.exists() {
                candidates.insert(candidate);
            }
        }

        match candidates.len() {
            0 => {
                self.unresolvable.borrow_mut().insert(rel_path.to_string());
                None
            }
            1 => {
                let resolved = candidates.into_iter().next().expect("len checked");
                self.resolved
                    .borrow_mut()
                    .insert(rel_path.to_string(), resolved.clone());
                Some(resolved)
            }
            _ => {
                tracing::warn!(
                    path = rel_path,
                    candidates = ?candidates,
                    "ambiguous ways to resolve relative path"
                );
                self.unresolvable.borrow_mut().insert(rel_path.to_string());
                None
            }
        }
    }

    /// Resolve the left-hand side ("dependent") of a dependency edge: an
    /// absolute path is unchanged, an object-file path is always anchored to
    /// the build root (the build system emits such paths relative to it), and
    /// any other relative path is a resolution error.
    pub fn resolve_dependent(&self, rel_path: &str) -> Result<PathBuf> {
        if is_abs_path(rel_path) {
            return Ok(PathBuf::from(rel_path));
        }
        if is_object_file(rel_path) {
            return Ok(self.ctx.build_root.join(rel_path));
        }
        Err(CoreError::UnresolvableDependent(rel_path.to_string()))
    }

    /// Canonicalize a path for storage as a node identity: real-path resolve
    /// it, but if the result would land under the build root, re-anchor it
    /// lexically there instead of following the symlink -- distinct build-tree
    /// symlinks (e.g. two configurations sharing third-party objects) must not
    /// collapse onto a single node.
    pub fn canonicalize(&self, path: &Path) -> PathBuf {
        if let Some(cached) = self.canonical_cache.borrow().get(path) {
            return cached.clone();
        }

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };

        let canonical = if let Ok(rel) = absolute.strip_prefix(&self.ctx.build_root) {
            self.ctx.build_root.join(lexically_normalize(rel))
        } else {
            std::fs::canonicalize(&absolute).unwrap_or(absolute)
        };

        self.canonical_cache
            .borrow_mut()
            .insert(path.to_path_buf(), canonical.clone());
        canonical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(tmp: &std::path::Path) -> BuildContext {
        let build_root = tmp.join("build");
        let src_root = tmp.join("src");
        std::fs::create_dir_all(&build_root).unwrap();
        std::fs::create_dir_all(&src_root).unwrap();
        BuildContext::new(&build_root, &src_root).unwrap()
    }

    #[test]
    fn resolves_unambiguous_relative_path() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ctx(tmp.path());
        std::fs::write(c.build_root.join("foo.o"), b"").unwrap();
        let resolver = PathResolver::new(&c);
        let resolved = resolver.resolve("foo.o").unwrap();
        assert_eq!(resolved, c.build_root.join("foo.o"));
    }

    #[test]
    fn memoizes_unresolvable_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ctx(tmp.path());
        let resolver = PathResolver::new(&c);
        assert!(resolver.resolve("missing.h").is_none());
        assert!(resolver.unresolvable.borrow().contains("missing.h"));
        assert!(resolver.resolve("missing.h").is_none());
    }

    #[test]
    fn ambiguous_candidates_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ctx(tmp.path());
        std::fs::write(c.build_root.join("dup.h"), b"").unwrap();
        std::fs::write(c.source_root.join("dup.h"), b"").unwrap();
        let resolver = PathResolver::new(&c);
        assert!(resolver.resolve("dup.h").is_none());
    }

    #[test]
    fn resolve_dependent_anchors_objects_to_build_root() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ctx(tmp.path());
        let resolver = PathResolver::new(&c);
        let resolved = resolver.resolve_dependent("a/b.cc.o").unwrap();
        assert_eq!(resolved, c.build_root.join("a/b.cc.o"));
    }

    #[test]
    fn resolve_dependent_rejects_non_object_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ctx(tmp.path());
        let resolver = PathResolver::new(&c);
        assert!(resolver.resolve_dependent("a/b.h").is_err());
    }

    #[test]
    fn canonicalize_reanchors_under_build_root() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ctx(tmp.path());
        let resolver = PathResolver::new(&c);
        let p = c.build_root.join("a/../b.o");
        assert_eq!(resolver.canonicalize(&p), c.build_root.join("b.o"));
    }
}
